//! Find/replace with a cascade of progressively looser matching strategies.
//!
//! [`TextReplacer`] is pure: content in, content (or an error) out. The
//! caller owns all file I/O.

pub mod strategies;

pub use strategies::{MatchFn, StrategyKind};

use crate::config::MatchingConfig;
use crate::edit::EditOperation;
use crate::error::ErrorKind;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplaceError {
    #[error("old_string and new_string must be different")]
    IdenticalStrings,

    #[error("old_string not found in content")]
    NotFound,

    #[error(
        "old_string found {count} times and requires more code context to uniquely identify the intended match; include more surrounding lines or set replace_all"
    )]
    AmbiguousMatch { count: usize },
}

impl ReplaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReplaceError::IdenticalStrings => ErrorKind::IdenticalStrings,
            ReplaceError::NotFound => ErrorKind::NotFound,
            ReplaceError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
        }
    }
}

/// Result of a successful replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Replacement holds the new content"]
pub struct Replacement {
    /// Content after the replacement
    pub content: String,
    /// Strategy that located the text
    pub strategy: StrategyKind,
    /// Number of occurrences replaced
    pub replacements: usize,
}

/// Applies one [`EditOperation`] to in-memory content.
#[derive(Debug, Clone, Default)]
pub struct TextReplacer {
    config: MatchingConfig,
}

impl TextReplacer {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Enabled strategies in cascade order.
    pub fn strategies(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        StrategyKind::ALL
            .into_iter()
            .filter(|kind| !self.config.disabled_strategies.contains(kind))
    }

    /// Replace `edit.old_string` in `content`.
    ///
    /// Strategies run strictest first and the first strategy that locates
    /// anything decides the outcome. With `replace_all`, every occurrence of
    /// its first candidate is replaced. Otherwise its candidates must all
    /// point at one region of `content`; two or more disjoint occurrences
    /// fail with [`ReplaceError::AmbiguousMatch`] instead of falling through
    /// to looser strategies.
    pub fn replace(&self, content: &str, edit: &EditOperation) -> Result<Replacement, ReplaceError> {
        if edit.old_string == edit.new_string {
            return Err(ReplaceError::IdenticalStrings);
        }
        if edit.old_string.is_empty() {
            return Err(ReplaceError::NotFound);
        }

        for strategy in self.strategies() {
            let candidates: Vec<&str> = (strategy.matcher())(content, &edit.old_string, &self.config)
                .into_iter()
                .filter(|candidate| !candidate.is_empty() && content.contains(*candidate))
                .collect();
            let Some(&first) = candidates.first() else {
                continue;
            };

            if edit.replace_all {
                let replacements = content.matches(first).count();
                debug!(%strategy, replacements, "replaced all occurrences");
                return Ok(Replacement {
                    content: content.replace(first, &edit.new_string),
                    strategy,
                    replacements,
                });
            }

            let count = disjoint_regions(content, &candidates);
            if count > 1 {
                debug!(%strategy, count, "match is ambiguous");
                return Err(ReplaceError::AmbiguousMatch { count });
            }

            let Some(index) = content.find(first) else {
                continue;
            };
            debug!(%strategy, offset = index, "replaced unique occurrence");
            let mut replaced =
                String::with_capacity(content.len() - first.len() + edit.new_string.len());
            replaced.push_str(&content[..index]);
            replaced.push_str(&edit.new_string);
            replaced.push_str(&content[index + first.len()..]);
            return Ok(Replacement {
                content: replaced,
                strategy,
                replacements: 1,
            });
        }

        Err(ReplaceError::NotFound)
    }
}

/// Number of non-overlapping regions covered by every occurrence of every
/// candidate. Candidates nested inside one another count once.
fn disjoint_regions(content: &str, candidates: &[&str]) -> usize {
    let mut spans: Vec<(usize, usize)> = candidates
        .iter()
        .flat_map(|candidate| {
            content
                .match_indices(*candidate)
                .map(|(start, found)| (start, start + found.len()))
        })
        .collect();
    spans.sort_unstable();

    let mut regions = 0;
    let mut region_end = 0;
    for (start, end) in spans {
        if regions == 0 || start >= region_end {
            regions += 1;
            region_end = end;
        } else {
            region_end = region_end.max(end);
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(old: &str, new: &str) -> EditOperation {
        EditOperation::new(old, new)
    }

    #[test]
    fn test_exact_replacement() {
        let replacer = TextReplacer::default();
        let result = replacer.replace("hello world", &op("world", "there")).unwrap();
        assert_eq!(result.content, "hello there");
        assert_eq!(result.strategy, StrategyKind::Exact);
        assert_eq!(result.replacements, 1);
    }

    #[test]
    fn test_identical_strings_rejected() {
        let replacer = TextReplacer::default();
        let err = replacer.replace("abc", &op("a", "a")).unwrap_err();
        assert_eq!(err, ReplaceError::IdenticalStrings);
    }

    #[test]
    fn test_not_found() {
        let replacer = TextReplacer::default();
        let err = replacer.replace("abc", &op("xyz", "q")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_ambiguous_without_replace_all() {
        let replacer = TextReplacer::default();
        let err = replacer.replace("foo bar foo", &op("foo", "baz")).unwrap_err();
        assert_eq!(err, ReplaceError::AmbiguousMatch { count: 2 });
    }

    #[test]
    fn test_ambiguity_is_not_rescued_by_fuzzy_strategies() {
        let replacer = TextReplacer::default();
        let err = replacer.replace("foo\n  foo\n", &op("foo", "bar")).unwrap_err();
        assert_eq!(err, ReplaceError::AmbiguousMatch { count: 2 });
    }

    #[test]
    fn test_fuzzy_candidates_in_two_places_are_ambiguous() {
        let replacer = TextReplacer::default();
        let content = "fn a() {\n    x();\n}\n\nfn a() {\n        x();\n}\n";
        let err = replacer
            .replace(content, &op("fn a() {\n  x();\n}", "fn a() {}"))
            .unwrap_err();
        assert_eq!(err, ReplaceError::AmbiguousMatch { count: 2 });
    }

    #[test]
    fn test_nested_candidates_count_once() {
        assert_eq!(disjoint_regions("  foo bar  ", &["foo bar", "foo", "  foo bar"]), 1);
        assert_eq!(disjoint_regions("foo\nfoo", &["foo"]), 2);
    }

    #[test]
    fn test_replace_all() {
        let replacer = TextReplacer::default();
        let edit = op("foo", "baz").replace_all(true);
        let result = replacer.replace("foo bar foo", &edit).unwrap();
        assert_eq!(result.content, "baz bar baz");
        assert_eq!(result.replacements, 2);
    }

    #[test]
    fn test_falls_back_to_line_trimmed() {
        let replacer = TextReplacer::default();
        let content = "fn main() {\n    println!(\"hi\");\n}\n";
        let result = replacer
            .replace(content, &op("println!(\"hi\");  \n}", "println!(\"bye\");\n}"))
            .unwrap();
        assert_eq!(result.strategy, StrategyKind::LineTrimmed);
        assert_eq!(result.content, "fn main() {\nprintln!(\"bye\");\n}\n");
    }

    #[test]
    fn test_fuzzy_match_replaces_whole_block() {
        let replacer = TextReplacer::default();
        let content = "impl A {\n    fn a() {\n        one();\n    }\n}";
        let find = "fn a() {\n  one();\n}";
        let result = replacer.replace(content, &op(find, "fn a() {}")).unwrap();
        assert_eq!(result.content, "impl A {\nfn a() {}\n}");
    }

    #[test]
    fn test_disabled_strategy_is_skipped() {
        let config = MatchingConfig {
            disabled_strategies: vec![StrategyKind::LineTrimmed, StrategyKind::WhitespaceNormalized],
            ..MatchingConfig::default()
        };
        let replacer = TextReplacer::new(config);
        assert!(!replacer
            .strategies()
            .any(|kind| kind == StrategyKind::LineTrimmed));

        let result = replacer.replace("    indented", &op("indented", "x")).unwrap();
        assert_eq!(result.strategy, StrategyKind::Exact);
    }

    #[test]
    fn test_empty_old_string_not_found() {
        let replacer = TextReplacer::default();
        let err = replacer.replace("abc", &op("", "x")).unwrap_err();
        assert_eq!(err, ReplaceError::NotFound);
    }

    #[test]
    fn test_round_trip_exact() {
        let replacer = TextReplacer::default();
        let original = "alpha beta gamma";
        let forward = replacer.replace(original, &op("beta", "delta")).unwrap();
        let back = replacer
            .replace(&forward.content, &op("delta", "beta"))
            .unwrap();
        assert_eq!(back.content, original);
    }
}
