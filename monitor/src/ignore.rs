//! Ignore rules applied to paths reported by the watcher.
//!
//! The defaults skip version-control metadata, bundler directories and the
//! temporary files editors create while saving, so a save in vim does not
//! show up as a burst of unrelated additions and removals.

use std::path::Path;

/// Directory names skipped anywhere below the root.
const DEFAULT_IGNORED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr", ".rbx", ".bundle"];

/// File names skipped exactly.
const DEFAULT_IGNORED_FILES: &[&str] = &[".DS_Store", "4913"];

/// File name suffixes skipped (editor swap and backup files).
const DEFAULT_IGNORED_SUFFIXES: &[&str] = &[".swp", ".swx", ".swpx", "~"];

/// A set of rules deciding whether a path is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    components: Vec<String>,
    file_names: Vec<String>,
    suffixes: Vec<String>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            components: to_owned(DEFAULT_IGNORED_DIRS),
            file_names: to_owned(DEFAULT_IGNORED_FILES),
            suffixes: to_owned(DEFAULT_IGNORED_SUFFIXES),
        }
    }
}

impl IgnoreRules {
    /// Rules that ignore nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            components: Vec::new(),
            file_names: Vec::new(),
            suffixes: Vec::new(),
        }
    }

    /// Adds path component names to skip.
    #[must_use]
    pub fn with_extra<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        for name in names {
            if !self.components.contains(&name) {
                self.components.push(name);
            }
        }
        self
    }

    /// Returns `true` if `path` should not be reported.
    ///
    /// `path` is expected to be relative to the watch root so that the root's
    /// own ancestors never match a rule.
    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        let in_ignored_dir = path.components().any(|component| {
            let name = component.as_os_str().to_string_lossy();
            self.components.iter().any(|ignored| *ignored == name)
        });
        if in_ignored_dir {
            return true;
        }

        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };

        self.file_names.iter().any(|ignored| *ignored == file_name)
            || self
                .suffixes
                .iter()
                .any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_files_are_reported() {
        let rules = IgnoreRules::default();
        assert!(!rules.is_ignored(Path::new("src/main.rs")));
        assert!(!rules.is_ignored(Path::new("new.txt")));
    }

    #[test]
    fn vcs_directories_are_ignored_at_any_depth() {
        let rules = IgnoreRules::default();
        assert!(rules.is_ignored(Path::new(".git/HEAD")));
        assert!(rules.is_ignored(Path::new("vendor/lib/.hg/store/data")));
        assert!(rules.is_ignored(Path::new(".bundle/config")));
    }

    #[test]
    fn editor_files_are_ignored() {
        let rules = IgnoreRules::default();
        assert!(rules.is_ignored(Path::new("notes/.todo.txt.swp")));
        assert!(rules.is_ignored(Path::new("notes/todo.txt~")));
        assert!(rules.is_ignored(Path::new("4913")));
        assert!(rules.is_ignored(Path::new("photos/.DS_Store")));
    }

    #[test]
    fn similar_names_are_not_ignored() {
        let rules = IgnoreRules::default();
        assert!(!rules.is_ignored(Path::new(".github/workflows/ci.yml")));
        assert!(!rules.is_ignored(Path::new("swp.txt")));
        assert!(!rules.is_ignored(Path::new("49130")));
    }

    #[test]
    fn extra_components_are_ignored() {
        let rules = IgnoreRules::default().with_extra(vec!["target".to_string()]);
        assert!(rules.is_ignored(Path::new("target/debug/app")));
        assert!(!rules.is_ignored(Path::new("targets/file")));
    }

    #[test]
    fn extra_components_are_deduplicated() {
        let rules = IgnoreRules::default().with_extra(vec![".git".to_string()]);
        assert_eq!(rules, IgnoreRules::default());
    }

    #[test]
    fn none_ignores_nothing() {
        let rules = IgnoreRules::none();
        assert!(!rules.is_ignored(Path::new(".git/HEAD")));
        assert!(!rules.is_ignored(Path::new("file.swp")));
    }
}
