//! Exclusion rules deciding which items are staged.
//!
//! Matching is exact and case-insensitive: directory names are compared
//! per path component, file extensions against a fixed list. No globs.

use std::ffi::OsStr;
use std::path::{Component, Path};

/// Directory names excluded wherever they appear in a relative path.
pub const IGNORED_DIRECTORY_NAMES: [&str; 5] = ["bin", "obj", ".vs", "packages", "node_modules"];

/// File extensions excluded everywhere outside ignored directories.
pub const IGNORED_FILE_EXTENSIONS: [&str; 5] = [".suo", ".user", ".cache", ".log", ".tmp"];

/// Immutable exclusion predicates, fixed at engine construction time.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    ignored_directories: Vec<String>,
    ignored_extensions: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            ignored_directories: IGNORED_DIRECTORY_NAMES.iter().map(|s| s.to_string()).collect(),
            ignored_extensions: IGNORED_FILE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExclusionRules {
    /// True if any component of `relative` matches an ignored directory name.
    pub fn ignores_directory(&self, relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(name) => self.is_ignored_name(name),
            _ => false,
        })
    }

    /// True if the file at `relative` should be excluded: either an ancestor
    /// component matches an ignored directory name, or (outside ignored
    /// directories) its extension matches an always-ignored extension.
    pub fn ignores_file(&self, relative: &Path) -> bool {
        if let Some(parent) = relative.parent() {
            if self.ignores_directory(parent) {
                return true;
            }
        }
        self.has_ignored_extension(relative)
    }

    fn is_ignored_name(&self, name: &OsStr) -> bool {
        let Some(name) = name.to_str() else {
            return false;
        };
        self.ignored_directories
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name))
    }

    fn has_ignored_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(OsStr::to_str) else {
            return false;
        };
        self.ignored_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn directory_matches_any_component() {
        let rules = ExclusionRules::default();
        assert!(rules.ignores_directory(Path::new("bin")));
        assert!(rules.ignores_directory(Path::new("src/bin/Debug")));
        assert!(rules.ignores_directory(Path::new("a/b/node_modules")));
        assert!(!rules.ignores_directory(Path::new("src/binary")));
        assert!(!rules.ignores_directory(Path::new("src")));
    }

    #[test]
    fn directory_match_is_case_insensitive() {
        let rules = ExclusionRules::default();
        assert!(rules.ignores_directory(Path::new("Bin")));
        assert!(rules.ignores_directory(Path::new("OBJ/Release")));
        assert!(rules.ignores_directory(Path::new(".VS")));
    }

    #[test]
    fn file_inside_ignored_directory_is_ignored_regardless_of_extension() {
        let rules = ExclusionRules::default();
        assert!(rules.ignores_file(Path::new("bin/app.dll")));
        assert!(rules.ignores_file(Path::new("obj/Debug/project.assets.json")));
        assert!(rules.ignores_file(Path::new("packages/lib/readme.md")));
    }

    #[test]
    fn file_outside_ignored_directory_checked_by_extension_only() {
        let rules = ExclusionRules::default();
        assert!(rules.ignores_file(Path::new("src/debug.log")));
        assert!(rules.ignores_file(Path::new("project.suo")));
        assert!(rules.ignores_file(Path::new("settings.User")));
        assert!(!rules.ignores_file(Path::new("src/main.cs")));
        // A dll outside bin/obj survives
        assert!(!rules.ignores_file(Path::new("libs/helper.dll")));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let rules = ExclusionRules::default();
        assert!(rules.ignores_file(Path::new("trace.LOG")));
        assert!(rules.ignores_file(Path::new("scratch.TMP")));
    }

    #[test]
    fn extensionless_file_is_kept() {
        let rules = ExclusionRules::default();
        assert!(!rules.ignores_file(Path::new("Makefile")));
        assert!(!rules.ignores_file(Path::new("src/LICENSE")));
    }

    #[test]
    fn ignored_looking_filename_is_not_a_directory_match() {
        // Only ancestor components count for the directory rule; a file
        // literally named "bin" is judged by its (absent) extension.
        let rules = ExclusionRules::default();
        assert!(!rules.ignores_file(Path::new("scripts/bin")));
    }

    #[test]
    fn deep_relative_paths() {
        let rules = ExclusionRules::default();
        let p: PathBuf = ["a", "b", "c", ".vs", "d", "e.txt"].iter().collect();
        assert!(rules.ignores_file(&p));
    }
}
