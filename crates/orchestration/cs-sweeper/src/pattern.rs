//! Bucket and key pattern compilation.
//!
//! Both patterns are compiled once, before any network call, so a typo in
//! either one fails the run up front.

use cs_error::{PatternError, PatternTarget};
use glob::{MatchOptions, Pattern};
use regex::Regex;

/// Match options for key globs.
///
/// Keys are matched flat: `*` also crosses `/`, so `temp/*` matches
/// `temp/a/b.log`. Leading dots are not special.
const KEY_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled bucket regex and key glob.
///
/// # Example
///
/// ```
/// use cs_sweeper::CompiledPatterns;
///
/// let patterns = CompiledPatterns::new("^test-", "logs/*.log").unwrap();
///
/// assert!(patterns.matches_bucket("test-eu"));
/// assert!(!patterns.matches_bucket("prod-test-eu"));
/// assert!(patterns.matches_key("logs/2024/01/app.log"));
/// assert!(!patterns.matches_key("logs/app.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    bucket: Regex,
    key: Pattern,
}

impl CompiledPatterns {
    /// Compile both patterns.
    ///
    /// The bucket pattern is a regular expression searched anywhere in the
    /// name; anchor it with `^...$` for an exact match. The key pattern is a
    /// glob matched against the full key.
    pub fn new(bucket_pattern: &str, key_pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            bucket: compile_bucket_pattern(bucket_pattern)?,
            key: compile_key_pattern(key_pattern)?,
        })
    }

    /// Check a bucket name against the regex.
    pub fn matches_bucket(&self, name: &str) -> bool {
        self.bucket.is_match(name)
    }

    /// Check an object key against the glob.
    pub fn matches_key(&self, key: &str) -> bool {
        self.key.matches_with(key, KEY_MATCH_OPTIONS)
    }

    /// The bucket regex source.
    pub fn bucket_pattern(&self) -> &str {
        self.bucket.as_str()
    }

    /// The key glob source.
    pub fn key_pattern(&self) -> &str {
        self.key.as_str()
    }
}

/// Compile a bucket-name regex.
///
/// An empty regex matches every bucket.
pub fn compile_bucket_pattern(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|e| PatternError::new(PatternTarget::Bucket, pattern, e))
}

/// Compile an object-key glob.
pub fn compile_key_pattern(pattern: &str) -> Result<Pattern, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::new(
            PatternTarget::File,
            pattern,
            "pattern must not be empty",
        ));
    }
    if pattern.starts_with('/') {
        return Err(PatternError::new(
            PatternTarget::File,
            pattern,
            "object keys never start with '/'",
        ));
    }

    Pattern::new(pattern).map_err(|e| PatternError::new(PatternTarget::File, pattern, e.msg))
}
