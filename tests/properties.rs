//! Property-based invariants for the scorer, redaction and session
//! accounting.

use proptest::prelude::*;
use tokio::runtime::Runtime;

use warden::engine::session::SessionStore;
use warden::ml::redact::redact_secrets;
use warden::ml::scorer::ThreatScorer;

proptest! {
    #[test]
    fn test_scorer_output_in_range_and_deterministic(input in "\\PC*") {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let scorer = ThreatScorer::new();
            let first = scorer.evaluate(&input).await;
            let second = scorer.evaluate(&input).await;

            assert!((0.0..=1.0).contains(&first), "score {} out of range", first);
            assert!(first == second, "scorer not deterministic");
        });
    }

    #[test]
    fn test_redaction_is_idempotent(input in "\\PC*") {
        let (once, _) = redact_secrets(&input);
        let (twice, changed_again) = redact_secrets(&once);
        prop_assert!(!changed_again, "second redaction pass changed text");
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_redaction_removes_aws_keys(suffix in "[0-9A-Z]{16}", pad in "[a-z ]{0,20}") {
        let input = format!("{}AKIA{}{}", pad, suffix, pad);
        let (clean, changed) = redact_secrets(&input);
        prop_assert!(changed);
        prop_assert!(!clean.contains(&format!("AKIA{}", suffix)), "redacted text still contains key");
    }

    #[test]
    fn test_session_score_is_monotonic(deltas in proptest::collection::vec(0i64..=100, 1..32)) {
        let store = SessionStore::new(150, 3);
        let mut previous = 0;
        for delta in deltas {
            store.update_risk("prop-session", delta, "step");
            let (score, _) = store.snapshot("prop-session");
            prop_assert!(score >= previous, "cumulative score decreased");
            previous = score;
        }
    }

    #[test]
    fn test_locked_sessions_stay_locked(extra in proptest::collection::vec(0i64..=100, 0..16)) {
        let store = SessionStore::new(150, 3);
        store.update_risk("prop-lock", 200, "overflow");
        prop_assert!(store.snapshot("prop-lock").1);

        for delta in extra {
            store.update_risk("prop-lock", delta, "after lock");
            prop_assert!(store.snapshot("prop-lock").1, "lock was cleared");
        }
    }
}
