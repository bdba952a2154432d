//! Vocabulary corrections for transcripts.
//!
//! Speech-to-text output routinely misspells product names and jargon. A
//! [`ReplacementTable`] holds an ordered list of regex rewrites, applied
//! globally and in order to each transcript side-car.

use std::path::Path;

use regex::Regex;
use vf_core::config::Replacement;

/// Compiled, ordered regex rewrites.
#[derive(Debug, Clone, Default)]
pub struct ReplacementTable {
    rules: Vec<(Regex, String)>,
}

impl ReplacementTable {
    /// Compile `replacements`, skipping (with a warning) any invalid pattern.
    pub fn compile(replacements: &[Replacement]) -> Self {
        let rules = replacements
            .iter()
            .filter_map(|r| match Regex::new(&r.pattern) {
                Ok(re) => Some((re, r.replacement.clone())),
                Err(e) => {
                    tracing::warn!("Skipping replacement {:?}: {e}", r.pattern);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Apply every rule to `text`.
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, (re, with)| {
                re.replace_all(&acc, with.as_str()).into_owned()
            })
    }

    /// Rewrite a file in place. Returns `Ok(false)` when the file does not
    /// exist.
    pub async fn apply_to_file(&self, path: &Path) -> vf_core::Result<bool> {
        if !tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
            return Ok(false);
        }
        if self.is_empty() {
            return Ok(true);
        }
        let text = tokio::fs::read_to_string(path).await?;
        tokio::fs::write(path, self.apply(&text)).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(pattern: &str, replacement: &str) -> Replacement {
        Replacement {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    #[test]
    fn applies_in_order_and_globally() {
        let table = ReplacementTable::compile(&[
            rep("(?i)vod forge", "vodforge"),
            rep("vodforge", "VodForge"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.apply("Vod Forge and vod forge"),
            "VodForge and VodForge"
        );
    }

    #[test]
    fn capture_groups_expand() {
        let table = ReplacementTable::compile(&[rep(r"(\d+) percent", "$1%")]);
        assert_eq!(table.apply("about 40 percent"), "about 40%");
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let table = ReplacementTable::compile(&[rep("(unclosed", "x"), rep("a", "b")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.apply("aa"), "bb");
    }

    #[tokio::test]
    async fn rewrites_files_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.srt");
        std::fs::write(&path, "1\n00:00:00,000 --> 00:00:01,000\nteh end\n").unwrap();

        let table = ReplacementTable::compile(&[rep(r"\bteh\b", "the")]);
        assert!(table.apply_to_file(&path).await.unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("the end"));
        assert!(!table.apply_to_file(&dir.path().join("missing.txt")).await.unwrap());
    }
}
