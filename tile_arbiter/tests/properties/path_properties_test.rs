//! # Resource Path Properties
//!
//! The path grammar under randomized well-formed inputs.

use proptest::prelude::*;

use tile_arbiter_domain::ResourcePath;

fn segment_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["tile", "cluster", "pe", "mem", "acc", "dma"]),
        prop::option::of(0u16..100),
    )
        .prop_map(|(name, id)| match id {
            Some(id) => format!("{}{}", name, id),
            None => name.to_string(),
        })
}

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..5).prop_map(|segments| segments.join("."))
}

proptest! {
    /// Templates are idempotent: stripping indices twice equals stripping
    /// them once.
    #[test]
    fn prop_template_roundtrip(text in path_strategy()) {
        let path = ResourcePath::parse(&text).unwrap();
        let template = path.template();
        prop_assert_eq!(template.template(), template.clone());
        prop_assert!(template.is_template());
    }

    /// Parsing and printing are inverse operations.
    #[test]
    fn prop_parse_display_roundtrip(text in path_strategy()) {
        let path = ResourcePath::parse(&text).unwrap();
        prop_assert_eq!(path.to_string(), text.clone());
        prop_assert_eq!(ResourcePath::parse(&path.to_string()).unwrap(), path);
    }

    /// Every path matches its own template.
    #[test]
    fn prop_path_matches_own_template(text in path_strategy()) {
        let path = ResourcePath::parse(&text).unwrap();
        prop_assert!(path.matches(&path.template()));
        prop_assert!(path.matches(&path));
    }

    /// Splitting the head off and re-joining reproduces the original text.
    #[test]
    fn prop_pop_head_reassembles(text in path_strategy()) {
        let result = ResourcePath::pop_head(&text, '.');
        match result {
            (head, Some(rest)) => prop_assert_eq!(format!("{}.{}", head, rest), text.clone()),
            (head, None) => prop_assert_eq!(head, text.clone()),
        }
    }
}
