//! Normalized configuration text and content hashing.
//!
//! Save and diff decisions compare configurations by content hash. Both sides
//! go through the same normalization first so that whitespace, comment lines
//! and ignored lines never count as a change.

use crate::config::ValidationError;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Comment marker on IOS-style configurations.
const COMMENT_TOKEN: char = '!';

/// Compiled `diff_ignore_lines` patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreLines {
    patterns: Vec<Regex>,
}

impl IgnoreLines {
    /// Compiles the given regular expressions.
    pub fn compile(patterns: &[String]) -> Result<Self, ValidationError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ValidationError::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if the (trimmed) line matches any pattern.
    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }
}

/// Configuration text after normalization, with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigText {
    text: String,
    sha256: String,
}

impl ConfigText {
    /// Normalizes `contents`, dropping blank, comment and ignored lines.
    ///
    /// Indentation is kept since it carries the block structure.
    pub fn new(contents: &str, ignore: &IgnoreLines) -> Self {
        let text = contents
            .lines()
            .map(str::trim_end)
            .filter(|line| {
                let trimmed = line.trim_start();
                !trimmed.is_empty() && !trimmed.starts_with(COMMENT_TOKEN) && !ignore.matches(trimmed)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let sha256 = hex::encode(hasher.finalize());
        Self { text, sha256 }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hex-encoded SHA-256 of the normalized text.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// True when both texts normalize to the same content.
    pub fn same_content(&self, other: &ConfigText) -> bool {
        self.sha256 == other.sha256
    }
}

/// Renders `lines` nested under `parents` as flat configuration text.
///
/// Each nesting level is indented by one space, parents outermost first.
pub fn render_candidate(lines: &[String], parents: &[String]) -> String {
    let mut rendered = Vec::with_capacity(parents.len() + lines.len());
    for (depth, parent) in parents.iter().enumerate() {
        rendered.push(format!("{}{}", " ".repeat(depth), parent.trim()));
    }
    let indent = " ".repeat(parents.len());
    for line in lines {
        rendered.push(format!("{indent}{}", line.trim()));
    }
    rendered.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignore(patterns: &[&str]) -> IgnoreLines {
        let patterns: Vec<String> = patterns.iter().map(|p| (*p).to_string()).collect();
        IgnoreLines::compile(&patterns).unwrap()
    }

    #[test]
    fn test_whitespace_and_comments_do_not_change_hash() {
        let a = ConfigText::new("hostname r1\n!\ninterface Loopback0\n ip address 10.0.0.1 255.255.255.255\n", &IgnoreLines::default());
        let b = ConfigText::new("!\r\nhostname r1   \r\n\r\ninterface Loopback0\r\n ip address 10.0.0.1 255.255.255.255", &IgnoreLines::default());
        assert!(a.same_content(&b));
        assert_eq!(a.text(), b.text());
    }

    #[test]
    fn test_indentation_changes_hash() {
        let a = ConfigText::new("interface Loopback0\n shutdown", &IgnoreLines::default());
        let b = ConfigText::new("interface Loopback0\nshutdown", &IgnoreLines::default());
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_ignored_lines_dropped_before_hashing() {
        let ignore = ignore(&["^ntp clock-period", "Last configuration change"]);
        let a = ConfigText::new("hostname r1\nntp clock-period 17179\n", &ignore);
        let b = ConfigText::new(
            "! Last configuration change at 10:00\nhostname r1\nntp clock-period 42\n",
            &ignore,
        );
        assert!(a.same_content(&b));
        assert_eq!(a.text(), "hostname r1");
    }

    #[test]
    fn test_ignore_patterns_match_trimmed_lines() {
        let ignore = ignore(&["^description"]);
        let text = ConfigText::new("interface Gi0/1\n description uplink\n shutdown", &ignore);
        assert_eq!(text.text(), "interface Gi0/1\n shutdown");
    }

    #[test]
    fn test_sha256_is_hex() {
        let text = ConfigText::new("hostname r1", &IgnoreLines::default());
        assert_eq!(text.sha256().len(), 64);
        assert!(text.sha256().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_invalid_pattern_reports_pattern() {
        let err = IgnoreLines::compile(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidIgnorePattern { pattern, .. } if pattern == "["));
    }

    #[test]
    fn test_render_candidate_without_parents() {
        let lines = vec!["hostname foo".to_string()];
        assert_eq!(render_candidate(&lines, &[]), "hostname foo");
    }

    #[test]
    fn test_render_candidate_nests_under_parents() {
        let parents = vec![
            "router bgp 65000".to_string(),
            "address-family ipv4".to_string(),
        ];
        let lines = vec![
            "neighbor 192.0.2.2 activate".to_string(),
            "  network 198.51.100.0".to_string(),
        ];
        assert_eq!(
            render_candidate(&lines, &parents),
            "router bgp 65000\n address-family ipv4\n  neighbor 192.0.2.2 activate\n  network 198.51.100.0"
        );
    }
}
