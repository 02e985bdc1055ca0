//! Domain name matchers.
//!
//! - `DomainMatcher`: FxHashSet for exact and `.suffix` rules (O(1) + O(k))
//! - `WildcardMatcher`: `*` / `?` glob patterns compiled into one `RegexSet`

use regex::RegexSet;
use rustc_hash::FxHashSet;

use crate::error::BypassError;

/// Matcher for exact domains and dot-prefixed suffix rules.
///
/// `example.com` matches only itself. `.example.com` matches `example.com`
/// and every subdomain of it. Lookup tries the exact name first, then strips
/// labels left-to-right looking for a stored suffix.
#[derive(Debug, Default)]
pub struct DomainMatcher {
    exact: FxHashSet<String>,
    suffixes: FxHashSet<String>,
}

impl DomainMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact domain match.
    pub fn add_exact(&mut self, domain: &str) {
        self.exact.insert(normalize(domain));
    }

    /// Add a suffix match covering the domain itself and all subdomains.
    ///
    /// A leading dot is optional: `.example.com` and `example.com` produce
    /// the same rule.
    pub fn add_suffix(&mut self, suffix: &str) {
        let stripped = suffix.strip_prefix('.').unwrap_or(suffix);
        self.suffixes.insert(normalize(stripped));
    }

    /// Check if a domain matches any exact or suffix rule.
    pub fn matches(&self, domain: &str) -> bool {
        let name = normalize(domain);
        if self.exact.contains(name.as_str()) || self.suffixes.contains(name.as_str()) {
            return true;
        }

        let mut rest = name.as_str();
        while let Some((_, parent)) = rest.split_once('.') {
            if self.suffixes.contains(parent) {
                return true;
            }
            rest = parent;
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.suffixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.suffixes.len()
    }
}

/// Lowercase and drop a trailing root dot (`example.com.`).
fn normalize(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

/// Matcher for glob patterns such as `*.example.com` or `10.0.0.*`.
///
/// `*` matches any run of characters (including dots), `?` exactly one.
/// Matching is case-insensitive and anchored at both ends.
pub struct WildcardMatcher {
    set: RegexSet,
    patterns: Vec<String>,
}

impl WildcardMatcher {
    /// Compile the patterns. Returns `Ok(None)` for an empty list.
    pub fn new(patterns: Vec<String>) -> Result<Option<Self>, BypassError> {
        if patterns.is_empty() {
            return Ok(None);
        }
        let regexes: Vec<String> = patterns.iter().map(|p| glob_to_regex(p)).collect();
        let set = RegexSet::new(&regexes)
            .map_err(|e| BypassError::InvalidPattern(format!("{patterns:?}: {e}")))?;
        Ok(Some(Self { set, patterns }))
    }

    pub fn matches(&self, name: &str) -> bool {
        self.set.is_match(name.trim_end_matches('.'))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl std::fmt::Debug for WildcardMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WildcardMatcher")
            .field("patterns", &self.patterns)
            .finish()
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?i)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}
