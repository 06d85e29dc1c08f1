//! Crash signatures
//!
//! A signature is a regular expression searched for in an attempt's output.
//! The default one catches Vulkan validation-layer messages.

use regex::Regex;

/// Marker printed by the Vulkan validation layers
pub const DEFAULT_SIGNATURE: &str = "Validation Error";

/// A signature hit in some output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    /// Pattern that matched
    pub pattern: String,
    /// The full line the match was found on
    pub line: String,
}

/// Compiled set of signatures, checked in order
#[derive(Debug, Clone)]
pub struct SignatureSet {
    patterns: Vec<Regex>,
}

impl SignatureSet {
    /// Compiles every pattern
    ///
    /// # Errors
    /// Returns the first pattern that fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns.into_iter().map(|pattern| Regex::new(pattern.as_ref())).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Finds the first signature present in `text`
    pub fn find(&self, text: &str) -> Option<SignatureMatch> {
        self.patterns.iter().find_map(|pattern| {
            let found = pattern.find(text)?;
            let line_start = text[..found.start()].rfind('\n').map_or(0, |i| i + 1);
            let line_end = text[found.end()..].find('\n').map_or(text.len(), |i| found.end() + i);
            Some(SignatureMatch {
                pattern: pattern.as_str().to_string(),
                line: text[line_start..line_end].trim_end_matches('\r').to_string(),
            })
        })
    }
}

impl Default for SignatureSet {
    fn default() -> Self {
        Self {
            patterns: vec![Regex::new(&regex::escape(DEFAULT_SIGNATURE)).expect("escaped literal is a valid pattern")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catches_validation_errors() {
        let stderr = "loading scene\nValidation Error: [ VUID-vkCmdDraw-None-02699 ] image layout mismatch\nexiting\n";
        let found = SignatureSet::default().find(stderr).unwrap();
        assert_eq!(found.pattern, "Validation Error");
        assert_eq!(found.line, "Validation Error: [ VUID-vkCmdDraw-None-02699 ] image layout mismatch");
    }

    #[test]
    fn test_no_match_in_clean_output() {
        assert!(SignatureSet::default().find("frame 1\nframe 2\n").is_none());
        assert!(SignatureSet::default().find("").is_none());
    }

    #[test]
    fn test_patterns_are_checked_in_order() {
        let signatures = SignatureSet::new(["VK_ERROR_DEVICE_LOST", r"panicked at .*"]).unwrap();
        let found = signatures.find("thread 'main' panicked at src/render.rs:10\r\nVK_ERROR_DEVICE_LOST").unwrap();
        assert_eq!(found.pattern, "VK_ERROR_DEVICE_LOST");
        assert_eq!(found.line, "VK_ERROR_DEVICE_LOST");

        let found = signatures.find("thread 'main' panicked at src/render.rs:10\r\n").unwrap();
        assert_eq!(found.line, "thread 'main' panicked at src/render.rs:10");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(SignatureSet::new(["(unclosed"]).is_err());
        assert!(SignatureSet::new(Vec::<String>::new()).unwrap().is_empty());
    }
}
