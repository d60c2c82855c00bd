// Test-specific lint overrides: property tests use unwrap freely.
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Property-based tests for assignee matching and status parsing.
//!
//! Uses proptest to verify:
//! 1. `normalize_assignee` only ever returns the raw name or the email.
//! 2. Any name contained in the email's local part maps to the email.
//! 3. Without an email the raw name always comes back untouched.
//! 4. Every status label and stored form parses back, whatever the casing.
//! 5. Arbitrary input never panics `TaskStatus::parse`.

use proptest::prelude::*;
use tasksteer_proto::task::{TaskStatus, normalize_assignee};

/// Strategy for plausible email addresses.
fn arb_email() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{0,15}", "[a-z]{1,10}\\.[a-z]{2,3}")
        .prop_map(|(local, domain)| format!("{local}@{domain}"))
}

/// Strategy for any status.
fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

proptest! {
    #[test]
    fn result_is_raw_or_email(raw in "\\PC{0,30}", email in arb_email()) {
        let out = normalize_assignee(&raw, Some(&email));
        prop_assert!(out == raw || out == email);
    }

    #[test]
    fn substring_of_local_part_matches(
        email in arb_email(),
        start in 0usize..16,
        len in 1usize..16,
        pad in "[ ]{0,3}",
    ) {
        let local = email.split('@').next().unwrap().to_string();
        let start = start.min(local.len() - 1);
        let end = (start + len).min(local.len());
        let name = format!("{pad}{}{pad}", local[start..end].to_uppercase());
        prop_assert_eq!(normalize_assignee(&name, Some(&email)), email);
    }

    #[test]
    fn no_email_leaves_name_alone(raw in "\\PC{0,30}") {
        prop_assert_eq!(normalize_assignee(&raw, None), raw.clone());
        prop_assert_eq!(normalize_assignee(&raw, Some("")), raw);
    }

    #[test]
    fn blank_names_never_match(blank in "[ \t]{0,5}", email in arb_email()) {
        prop_assert_eq!(normalize_assignee(&blank, Some(&email)), blank);
    }

    #[test]
    fn labels_and_stored_forms_parse(status in arb_status(), upper in any::<bool>()) {
        let label = if upper {
            status.label().to_uppercase()
        } else {
            status.label().to_lowercase()
        };
        prop_assert_eq!(TaskStatus::parse(&label), Some(status));
        prop_assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        prop_assert_eq!(TaskStatus::parse(&label.replace(' ', "_")), Some(status));
    }

    #[test]
    fn serde_uses_stored_form(status in arb_status()) {
        let json = serde_json::to_string(&status).unwrap();
        prop_assert_eq!(json, format!("\"{}\"", status.as_str()));
    }

    #[test]
    fn parse_never_panics(input in "\\PC{0,64}") {
        let _ = TaskStatus::parse(&input);
    }
}
