//! Pattern matching predicate.
//!
//! The replica treats matching as an opaque, fallible predicate
//! ([`PolicyMatcher`]). [`WildcardMatcher`] is the default: a pattern is either
//! an exact string or a prefix followed by a single trailing `*`.

use crate::error::{Error, Result};
use crate::policy::Policy;

/// Decide whether any pattern in `haystack` matches `needle`.
///
/// An error means the policy could not be evaluated; callers must not treat it
/// as "no match".
pub trait PolicyMatcher: Send + Sync {
    fn matches(&self, policy: &Policy, haystack: &[String], needle: &str) -> Result<bool>;
}

/// Compiled wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern<'a> {
    Exact(&'a str),
    Prefix(&'a str),
}

fn compile(pattern: &str) -> Result<Pattern<'_>> {
    if pattern.is_empty() {
        return Err(Error::Match("empty pattern".into()));
    }
    // format: "exact" or "prefix*"; `*` anywhere else is rejected
    match pattern.find('*') {
        None => Ok(Pattern::Exact(pattern)),
        Some(i) if i == pattern.len() - 1 => Ok(Pattern::Prefix(&pattern[..i])),
        Some(_) => Err(Error::Match(format!(
            "invalid pattern: {pattern} (expected exact or prefix*)"
        ))),
    }
}

/// Match one wildcard pattern against a string.
pub fn wildcard_match(pattern: &str, needle: &str) -> Result<bool> {
    Ok(match compile(pattern)? {
        Pattern::Exact(p) => p == needle,
        Pattern::Prefix(p) => needle.starts_with(p),
    })
}

/// Default matcher: exact strings and trailing `*` prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardMatcher;

impl WildcardMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyMatcher for WildcardMatcher {
    fn matches(&self, policy: &Policy, haystack: &[String], needle: &str) -> Result<bool> {
        for pattern in haystack {
            let hit = wildcard_match(pattern, needle)
                .map_err(|e| Error::Match(format!("policy {}: {e}", policy.id())))?;
            if hit {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
