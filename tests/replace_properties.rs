use edit_guard::{EditOperation, ReplaceError, StrategyKind, TextReplacer};
use proptest::prelude::*;

proptest! {
    /// Replacing a unique needle and then replacing it back restores the input.
    #[test]
    fn exact_replace_round_trips(
        prefix in "[a-c ]{0,20}",
        needle in "X[d-f]{0,8}X",
        suffix in "[a-c\n]{0,20}",
        replacement in "[g-h]{1,6}",
    ) {
        let replacer = TextReplacer::default();
        let original = format!("{prefix}{needle}{suffix}");

        let forward = replacer
            .replace(&original, &EditOperation::new(needle.clone(), replacement.clone()))
            .unwrap();
        prop_assert_eq!(forward.strategy, StrategyKind::Exact);
        prop_assert_eq!(&forward.content, &format!("{prefix}{replacement}{suffix}"));

        let back = replacer
            .replace(&forward.content, &EditOperation::new(replacement, needle))
            .unwrap();
        prop_assert_eq!(back.content, original);
    }

    /// Two copies of a needle are refused without replace_all and both
    /// replaced with it.
    #[test]
    fn duplicates_need_replace_all(
        needle in "[d-f]{1,6}",
        separator in "[a-c]{1,6}",
    ) {
        let replacer = TextReplacer::default();
        let content = format!("{needle}{separator}{needle}");

        let err = replacer
            .replace(&content, &EditOperation::new(needle.clone(), "Z"))
            .unwrap_err();
        prop_assert_eq!(err, ReplaceError::AmbiguousMatch { count: 2 });

        let all = replacer
            .replace(&content, &EditOperation::new(needle, "Z").replace_all(true))
            .unwrap();
        prop_assert_eq!(all.replacements, 2);
        prop_assert_eq!(all.content, format!("Z{separator}Z"));
    }

    /// Copies on separate lines stay ambiguous however they are indented;
    /// no looser strategy picks one of them.
    #[test]
    fn indented_duplicates_stay_ambiguous(
        needle in "[d-f]{1,6}",
        first_indent in "[ \t]{0,4}",
        second_indent in "[ \t]{0,4}",
        filler in "([a-c]{1,6}\n){0,3}",
    ) {
        let replacer = TextReplacer::default();
        let content = format!("{first_indent}{needle}\n{filler}{second_indent}{needle}\n");

        let err = replacer
            .replace(&content, &EditOperation::new(needle.clone(), "Z"))
            .unwrap_err();
        prop_assert_eq!(err, ReplaceError::AmbiguousMatch { count: 2 });

        let all = replacer
            .replace(&content, &EditOperation::new(needle, "Z").replace_all(true))
            .unwrap();
        prop_assert_eq!(all.replacements, 2);
        prop_assert_eq!(
            all.content,
            format!("{first_indent}Z\n{filler}{second_indent}Z\n")
        );
    }
}
