//! Include/exclude glob sets.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::WatchError;

/// `*` stops at `/`; only `**` crosses directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Globs relative to the project root. A leading `!` marks an exclusion.
#[derive(Debug, Clone)]
pub struct GlobSet {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    roots: Vec<PathBuf>,
}

impl GlobSet {
    /// Parse `globs`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] for the first glob that fails to parse.
    pub fn new(globs: &[String]) -> Result<Self, WatchError> {
        let mut set = Self {
            include: Vec::new(),
            exclude: Vec::new(),
            roots: Vec::new(),
        };

        for glob in globs {
            let (negated, raw) = match glob.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, glob.as_str()),
            };
            let pattern = Pattern::new(raw).map_err(|source| WatchError::Pattern {
                pattern: glob.clone(),
                source,
            })?;

            if negated {
                set.exclude.push(pattern);
            } else {
                set.roots.push(literal_prefix(raw));
                set.include.push(pattern);
            }
        }
        Ok(set)
    }

    /// Whether `relative` matches an include glob and no exclusion.
    pub fn matches(&self, relative: &Path) -> bool {
        let path = relative.to_string_lossy().replace('\\', "/");
        self.include
            .iter()
            .any(|p| p.matches_with(&path, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(&path, MATCH_OPTIONS))
    }

    /// Directories to watch recursively, relative to the project root.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Leading directory of `glob` that contains no wildcard.
fn literal_prefix(glob: &str) -> PathBuf {
    let segments: Vec<&str> = glob.split('/').collect();
    let literal = segments
        .iter()
        .take_while(|s| !s.contains(['*', '?', '[', '{']))
        .count();
    // A fully literal glob names a file; watch its directory
    let end = if literal == segments.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };
    segments[..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(globs: &[&str]) -> GlobSet {
        GlobSet::new(&globs.iter().map(|g| (*g).to_owned()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_recursive_match() {
        let styles = set(&["app/scss/**/*.scss"]);

        assert!(styles.matches(Path::new("app/scss/style.scss")));
        assert!(styles.matches(Path::new("app/scss/blocks/_header.scss")));
        assert!(!styles.matches(Path::new("app/css/style.min.css")));
        assert!(!styles.matches(Path::new("other/app/scss/style.scss")));
    }

    #[test]
    fn test_exclusion_wins() {
        let scripts = set(&["app/js/**/*.js", "!app/js/main.min.js"]);

        assert!(scripts.matches(Path::new("app/js/main.js")));
        assert!(scripts.matches(Path::new("app/js/lib/slider.js")));
        assert!(!scripts.matches(Path::new("app/js/main.min.js")));
    }

    #[test]
    fn test_single_star_stays_in_directory() {
        let pages = set(&["app/*.html"]);

        assert!(pages.matches(Path::new("app/index.html")));
        assert!(!pages.matches(Path::new("app/about/index.html")));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        assert!(!set(&[]).matches(Path::new("app/index.html")));
    }

    #[test]
    fn test_roots() {
        let globs = set(&["app/scss/**/*.scss", "app/**/*.html", "!app/js/main.min.js", "*.js"]);

        assert_eq!(
            globs.roots(),
            &[PathBuf::from("app/scss"), PathBuf::from("app"), PathBuf::new()]
        );
    }

    #[test]
    fn test_literal_prefix_of_plain_file() {
        assert_eq!(literal_prefix("app/index.html"), PathBuf::from("app"));
        assert_eq!(literal_prefix("index.html"), PathBuf::new());
    }

    #[test]
    fn test_invalid_glob() {
        let err = GlobSet::new(&["!app/[js".to_owned()]).unwrap_err();
        assert!(matches!(err, WatchError::Pattern { ref pattern, .. } if pattern == "!app/[js"));
    }
}
