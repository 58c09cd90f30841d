//! The matching cascade.
//!
//! Every strategy shares one signature: given the file content and the text
//! to find, return the slices of `content` it considers a match. An empty
//! vector means "no match, try the next strategy". Strategies never decide
//! uniqueness; [`TextReplacer`](super::TextReplacer) does.

use crate::config::MatchingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use strsim::normalized_levenshtein;

/// Signature shared by every strategy in the cascade.
pub type MatchFn = for<'a> fn(&'a str, &str, &MatchingConfig) -> Vec<&'a str>;

/// Matching strategies, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Exact substring
    Exact,
    /// Line by line, ignoring leading/trailing whitespace
    LineTrimmed,
    /// First/last line anchors with fuzzy interior lines
    BlockAnchor,
    /// Runs of whitespace collapsed to one space
    WhitespaceNormalized,
    /// Common leading indentation removed
    IndentationFlexible,
    /// Backslash escapes (`\n`, `\t`, `\"`, ...) decoded
    EscapeNormalized,
    /// Surrounding whitespace of the whole search text trimmed
    TrimmedBoundary,
    /// First/last line anchors with mostly identical interior lines
    ContextAware,
    /// Every exact occurrence
    MultiOccurrence,
}

impl StrategyKind {
    /// Cascade order.
    pub const ALL: [StrategyKind; 9] = [
        StrategyKind::Exact,
        StrategyKind::LineTrimmed,
        StrategyKind::BlockAnchor,
        StrategyKind::WhitespaceNormalized,
        StrategyKind::IndentationFlexible,
        StrategyKind::EscapeNormalized,
        StrategyKind::TrimmedBoundary,
        StrategyKind::ContextAware,
        StrategyKind::MultiOccurrence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Exact => "exact",
            StrategyKind::LineTrimmed => "line-trimmed",
            StrategyKind::BlockAnchor => "block-anchor",
            StrategyKind::WhitespaceNormalized => "whitespace-normalized",
            StrategyKind::IndentationFlexible => "indentation-flexible",
            StrategyKind::EscapeNormalized => "escape-normalized",
            StrategyKind::TrimmedBoundary => "trimmed-boundary",
            StrategyKind::ContextAware => "context-aware",
            StrategyKind::MultiOccurrence => "multi-occurrence",
        }
    }

    pub fn matcher(self) -> MatchFn {
        match self {
            StrategyKind::Exact => exact,
            StrategyKind::LineTrimmed => line_trimmed,
            StrategyKind::BlockAnchor => block_anchor,
            StrategyKind::WhitespaceNormalized => whitespace_normalized,
            StrategyKind::IndentationFlexible => indentation_flexible,
            StrategyKind::EscapeNormalized => escape_normalized,
            StrategyKind::TrimmedBoundary => trimmed_boundary,
            StrategyKind::ContextAware => context_aware,
            StrategyKind::MultiOccurrence => multi_occurrence,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Content split on `\n`, keeping byte spans so blocks can be sliced back out.
struct Lines<'a> {
    content: &'a str,
    spans: Vec<(usize, usize)>,
}

impl<'a> Lines<'a> {
    fn new(content: &'a str) -> Self {
        let mut spans = Vec::new();
        let mut start = 0;
        for (idx, _) in content.match_indices('\n') {
            spans.push((start, idx));
            start = idx + 1;
        }
        spans.push((start, content.len()));
        Self { content, spans }
    }

    fn len(&self) -> usize {
        self.spans.len()
    }

    fn line(&self, idx: usize) -> &'a str {
        let (start, end) = self.spans[idx];
        &self.content[start..end]
    }

    /// Lines `first..=last` joined by their original newlines.
    fn block(&self, first: usize, last: usize) -> &'a str {
        &self.content[self.spans[first].0..self.spans[last].1]
    }

    /// Every window of `size` consecutive lines, as `(first, block)`.
    fn windows(&self, size: usize) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        let count = if size == 0 || size > self.len() {
            0
        } else {
            self.len() - size + 1
        };
        (0..count).map(move |first| (first, self.block(first, first + size - 1)))
    }
}

/// Split search text into lines, dropping one trailing empty line.
fn search_lines(find: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = find.split('\n').collect();
    if lines.len() > 1 && lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

fn locate<'a>(content: &'a str, needle: &str) -> Option<&'a str> {
    content
        .find(needle)
        .map(|start| &content[start..start + needle.len()])
}

pub fn exact<'a>(content: &'a str, find: &str, _config: &MatchingConfig) -> Vec<&'a str> {
    if find.is_empty() {
        return Vec::new();
    }
    locate(content, find).into_iter().collect()
}

pub fn line_trimmed<'a>(content: &'a str, find: &str, _config: &MatchingConfig) -> Vec<&'a str> {
    let search = search_lines(find);
    if find.is_empty() {
        return Vec::new();
    }

    let lines = Lines::new(content);
    lines
        .windows(search.len())
        .filter(|(first, _)| {
            search
                .iter()
                .enumerate()
                .all(|(offset, wanted)| lines.line(first + offset).trim() == wanted.trim())
        })
        .map(|(_, block)| block)
        .collect()
}

/// Mean similarity of the interior lines of a candidate block.
fn interior_similarity(lines: &Lines<'_>, start: usize, end: usize, search: &[&str]) -> f64 {
    let actual_size = end - start + 1;
    let to_check = (search.len() - 2).min(actual_size - 2);
    if to_check == 0 {
        return 1.0;
    }

    let upper = (search.len() - 1).min(actual_size - 1);
    let total: f64 = (1..upper)
        .map(|offset| {
            normalized_levenshtein(lines.line(start + offset).trim(), search[offset].trim())
        })
        .sum();
    total / to_check as f64
}

pub fn block_anchor<'a>(content: &'a str, find: &str, config: &MatchingConfig) -> Vec<&'a str> {
    let search = search_lines(find);
    if search.len() < 3 {
        return Vec::new();
    }

    let first_wanted = search[0].trim();
    let last_wanted = search[search.len() - 1].trim();
    let lines = Lines::new(content);

    let mut candidates = Vec::new();
    for start in 0..lines.len() {
        if lines.line(start).trim() != first_wanted {
            continue;
        }
        if let Some(end) =
            (start + 2..lines.len()).find(|&end| lines.line(end).trim() == last_wanted)
        {
            candidates.push((start, end));
        }
    }

    let mut best: Option<((usize, usize), f64)> = None;
    for (start, end) in candidates {
        let score = interior_similarity(&lines, start, end, &search);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some(((start, end), score));
        }
    }

    match best {
        Some(((start, end), score)) if score >= config.block_anchor_threshold => {
            vec![lines.block(start, end)]
        }
        _ => Vec::new(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leftmost span of `line` holding `words` separated by one or more whitespace chars.
fn find_flexible<'a>(line: &'a str, words: &[&str]) -> Option<&'a str> {
    let (head, tail) = words.split_first()?;
    for (start, _) in line.char_indices() {
        if !line[start..].starts_with(head) {
            continue;
        }
        let mut pos = start + head.len();
        let matched = tail.iter().all(|word| {
            let rest = &line[pos..];
            let gap = rest.len() - rest.trim_start().len();
            if gap == 0 || !rest[gap..].starts_with(word) {
                return false;
            }
            pos += gap + word.len();
            true
        });
        if matched {
            return Some(&line[start..pos]);
        }
    }
    None
}

pub fn whitespace_normalized<'a>(
    content: &'a str,
    find: &str,
    _config: &MatchingConfig,
) -> Vec<&'a str> {
    let wanted = collapse_whitespace(find);
    if wanted.is_empty() {
        return Vec::new();
    }

    let lines = Lines::new(content);
    let mut matches = Vec::new();

    for idx in 0..lines.len() {
        let line = lines.line(idx);
        let normalized = collapse_whitespace(line);
        if normalized == wanted {
            matches.push(line);
        } else if normalized.contains(&wanted) {
            let words: Vec<&str> = find.split_whitespace().collect();
            if let Some(found) = find_flexible(line, &words) {
                matches.push(found);
            }
        }
    }

    let find_line_count = find.split('\n').count();
    if find_line_count > 1 {
        matches.extend(
            lines
                .windows(find_line_count)
                .filter(|(_, block)| collapse_whitespace(block) == wanted)
                .map(|(_, block)| block),
        );
    }

    matches
}

fn leading_whitespace_chars(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn strip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((offset, _)) => &line[offset..],
        None => "",
    }
}

fn remove_common_indentation(text: &str) -> String {
    let min_indent = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(leading_whitespace_chars)
        .min();

    let Some(min_indent) = min_indent else {
        return text.to_string();
    };

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line
            } else {
                strip_chars(line, min_indent)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn indentation_flexible<'a>(
    content: &'a str,
    find: &str,
    _config: &MatchingConfig,
) -> Vec<&'a str> {
    if find.trim().is_empty() {
        return Vec::new();
    }

    let wanted = remove_common_indentation(find);
    let lines = Lines::new(content);
    lines
        .windows(find.split('\n').count())
        .filter(|(_, block)| remove_common_indentation(block) == wanted)
        .map(|(_, block)| block)
        .collect()
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.peek().copied() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some(other @ ('\'' | '"' | '`' | '\\' | '$')) => other,
            _ => {
                out.push(c);
                continue;
            }
        };
        chars.next();
        out.push(decoded);
    }
    out
}

pub fn escape_normalized<'a>(
    content: &'a str,
    find: &str,
    _config: &MatchingConfig,
) -> Vec<&'a str> {
    let wanted = unescape(find);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<&str> = locate(content, &wanted).into_iter().collect();

    let lines = Lines::new(content);
    matches.extend(
        lines
            .windows(wanted.split('\n').count())
            .filter(|(_, block)| unescape(block) == wanted)
            .map(|(_, block)| block),
    );

    matches
}

pub fn trimmed_boundary<'a>(
    content: &'a str,
    find: &str,
    _config: &MatchingConfig,
) -> Vec<&'a str> {
    let wanted = find.trim();
    if wanted == find || wanted.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<&str> = locate(content, wanted).into_iter().collect();

    let lines = Lines::new(content);
    matches.extend(
        lines
            .windows(find.split('\n').count())
            .filter(|(_, block)| block.trim() == wanted)
            .map(|(_, block)| block),
    );

    matches
}

pub fn context_aware<'a>(content: &'a str, find: &str, config: &MatchingConfig) -> Vec<&'a str> {
    let search = search_lines(find);
    if search.len() < 3 {
        return Vec::new();
    }

    let first_wanted = search[0].trim();
    let last_wanted = search[search.len() - 1].trim();
    let lines = Lines::new(content);

    for start in 0..lines.len() {
        if lines.line(start).trim() != first_wanted {
            continue;
        }

        let Some(end) = (start + 2..lines.len()).find(|&end| lines.line(end).trim() == last_wanted)
        else {
            continue;
        };

        if end - start + 1 != search.len() {
            continue;
        }

        let mut compared = 0usize;
        let mut identical = 0usize;
        for offset in 1..search.len() - 1 {
            let have = lines.line(start + offset).trim();
            let want = search[offset].trim();
            if have.is_empty() && want.is_empty() {
                continue;
            }
            compared += 1;
            if have == want {
                identical += 1;
            }
        }

        if compared == 0 || identical as f64 / compared as f64 >= config.context_threshold {
            return vec![lines.block(start, end)];
        }
    }

    Vec::new()
}

pub fn multi_occurrence<'a>(
    content: &'a str,
    find: &str,
    _config: &MatchingConfig,
) -> Vec<&'a str> {
    if find.is_empty() {
        return Vec::new();
    }
    content.match_indices(find).map(|(_, found)| found).collect()
}
