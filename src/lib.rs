//! projpack stages a filtered copy of a project directory and packs it
//! into a single zip archive, reporting progress over a channel and
//! cleaning up its staging area on every exit path.

pub mod core;
pub mod logging;
pub mod validate;
