//! Ignore rules compiled from gitignore-style patterns.
//!
//! Only a small subset of gitignore syntax is understood:
//!
//! - `*` matches any run of characters, path separators included.
//! - A trailing separator (`build/`) marks a directory pattern. It matches the
//!   named path and everything beneath it.
//! - A leading separator (`/build`) anchors the pattern to the project root.
//!   Unanchored patterns match any component-suffix of a path, so `tests/`
//!   excludes both `tests` and `pkg/tests/unit/x.py`.
//! - `/` and `\` are interchangeable.
//!
//! Everything else is literal text, including `?`, `[...]`, `**`, `!` and
//! backslash escapes.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// Patterns applied to every run unless configuration replaces them.
pub const DEFAULT_PATTERNS: &[&str] = &["tests/", "backups/", "docs/", "test*", "_*"];

/// Name of the ignore file read from the project root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    /// Fallback for patterns whose regex could not be built.
    Literal(String),
}

/// A single compiled ignore pattern.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: String,
    anchored: bool,
    matcher: Matcher,
}

impl IgnoreRule {
    /// Compile a pattern. Never fails: an uncompilable pattern matches literally.
    pub fn compile(pattern: &str) -> Self {
        let normalized = pattern.trim().replace('\\', "/");
        let anchored = normalized.starts_with('/');
        let body = normalized.trim_start_matches('/');

        let (body, is_dir) = match body.strip_suffix('/') {
            Some(stripped) => (stripped.trim_end_matches('/'), true),
            None => (body, false),
        };

        let expanded = body
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let source = if is_dir {
            format!("^{expanded}(/.*)?$")
        } else {
            format!("^{expanded}$")
        };

        let matcher = match RegexBuilder::new(&source)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(re) => Matcher::Regex(re),
            Err(e) => {
                debug!("pattern {pattern:?} falls back to literal matching: {e}");
                Matcher::Literal(body.to_string())
            }
        };

        Self {
            pattern: pattern.to_string(),
            anchored,
            matcher,
        }
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the rule only applies to the full root-relative path.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    fn key(&self) -> (bool, &str) {
        match &self.matcher {
            Matcher::Regex(re) => (self.anchored, re.as_str()),
            Matcher::Literal(s) => (self.anchored, s.as_str()),
        }
    }

    fn matches_str(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(candidate),
            Matcher::Literal(s) => s == candidate,
        }
    }
}

/// A de-duplicated set of ignore rules for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    /// An empty rule set that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile patterns, skipping blanks and `#` comments and collapsing duplicates.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::empty();
        rules.extend(patterns);
        rules
    }

    /// Build the rule set for `root`: `defaults`, the project's ignore file
    /// (when `read_ignore_file` is set) and `extra`.
    pub fn load(root: &Path, defaults: &[String], extra: &[String], read_ignore_file: bool) -> Self {
        let mut rules = Self::empty();

        if read_ignore_file {
            let ignore_path = root.join(IGNORE_FILE_NAME);
            if ignore_path.is_file() {
                match fs::read_to_string(&ignore_path) {
                    Ok(text) => {
                        debug!("reading ignore patterns from {}", ignore_path.display());
                        rules.extend(text.lines());
                    }
                    Err(e) => warn!("skipping unreadable {}: {}", ignore_path.display(), e),
                }
            }
        }

        rules.extend(defaults);
        rules.extend(extra);
        debug!(
            "compiled {} ignore rules ({} anchored)",
            rules.len(),
            rules.rules().iter().filter(|r| r.is_anchored()).count()
        );
        rules
    }

    /// Add patterns to the set.
    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: HashSet<(bool, String)> = self
            .rules
            .iter()
            .map(|r| {
                let (anchored, key) = r.key();
                (anchored, key.to_string())
            })
            .collect();

        for pattern in patterns {
            let line = pattern.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let rule = IgnoreRule::compile(line);
            let (anchored, key) = rule.key();
            if seen.insert((anchored, key.to_string())) {
                self.rules.push(rule);
            }
        }
    }

    /// Number of distinct rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    /// Check a root-relative path against every rule.
    ///
    /// The path is tested as a whole and through each of its component
    /// suffixes, so a directory name matches at any depth.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let components: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if components.is_empty() {
            return false;
        }

        let suffixes: Vec<String> = (0..components.len())
            .map(|start| components[start..].join("/"))
            .collect();

        self.rules.iter().any(|rule| {
            if rule.anchored {
                rule.matches_str(&suffixes[0])
            } else {
                suffixes.iter().any(|s| rule.matches_str(s))
            }
        })
    }

    /// String form of [`is_excluded`](Self::is_excluded), accepting either separator.
    pub fn is_excluded_str(&self, relative: &str) -> bool {
        let normalized = relative.replace('\\', "/");
        self.is_excluded(Path::new(&normalized))
    }
}
