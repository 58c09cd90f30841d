use similar::TextDiff;
use std::path::Path;

/// Unified diff of `old` → `new` with three lines of context.
///
/// Returns an empty string when the contents are identical.
pub fn unified_diff(display_path: &Path, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }

    let name = display_path.display().to_string();
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&name, &name)
        .to_string()
}

/// Count of added and removed lines between two contents.
pub fn line_stats(old: &str, new: &str) -> (usize, usize) {
    use similar::ChangeTag;

    let diff = TextDiff::from_lines(old, new);
    diff.iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        })
}
