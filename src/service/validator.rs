//! Score validation, polymorphic over game type.
//!
//! The contract is accept-or-reject-with-reason: a rejection never
//! propagates as a hard error to the submitting client. The round layer
//! converts it into a suspicious-activity record plus an elimination,
//! and the rejection reason feeds the severity lookup of the escalation
//! engine. Rules here are deliberately permissive sanity checks; the
//! reason strings are the stable part of the interface.

use crate::domain::GameType;

/// Hard ceiling no legitimate session can reach for any game type.
const MAX_PLAUSIBLE_SCORE: i64 = 1_000_000;

/// Outcome of validating one score submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The score passed all rules for its game type.
    Accepted,
    /// The score was rejected; the reason feeds severity classification.
    Rejected {
        /// Machine-readable reason (`negative_score`, `impossible_score`, ...).
        reason: String,
    },
}

impl Verdict {
    /// Returns `true` for [`Verdict::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
        }
    }
}

/// Validates a score submission for the given game type.
///
/// Every game type shares the baseline rules (non-negative, below the
/// plausibility ceiling); game-specific bounds narrow the ceiling where
/// gameplay makes larger values impossible.
#[must_use]
pub fn validate_score(game_type: GameType, score: i64, metadata: &serde_json::Value) -> Verdict {
    if score < 0 {
        return Verdict::rejected("negative_score");
    }
    if score > MAX_PLAUSIBLE_SCORE {
        return Verdict::rejected("impossible_score");
    }

    match game_type {
        GameType::Flybird => validate_flybird(score, metadata),
        GameType::EndlessRunner => validate_endless_runner(score, metadata),
        GameType::Reaction => Verdict::Accepted,
    }
}

/// Flybird scores one point per obstacle passed; no session plausibly
/// clears more than 100 000 obstacles.
fn validate_flybird(score: i64, _metadata: &serde_json::Value) -> Verdict {
    if score > 100_000 {
        return Verdict::rejected("impossible_score");
    }
    Verdict::Accepted
}

/// Endless runner reports height-derived scores; negative height in the
/// metadata contradicts any positive score.
fn validate_endless_runner(score: i64, metadata: &serde_json::Value) -> Verdict {
    if let Some(height) = metadata.get("height").and_then(serde_json::Value::as_i64)
        && height < 0
        && score > 0
    {
        return Verdict::rejected("score_calculation_mismatch");
    }
    Verdict::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn negative_scores_are_rejected_for_every_game() {
        for game_type in [GameType::Flybird, GameType::EndlessRunner, GameType::Reaction] {
            let verdict = validate_score(game_type, -1, &json!({}));
            assert_eq!(
                verdict,
                Verdict::Rejected {
                    reason: "negative_score".to_string()
                }
            );
        }
    }

    #[test]
    fn zero_is_accepted() {
        assert!(validate_score(GameType::Reaction, 0, &json!({})).is_accepted());
        assert!(validate_score(GameType::Flybird, 0, &json!({})).is_accepted());
    }

    #[test]
    fn absurd_score_is_impossible() {
        let verdict = validate_score(GameType::Reaction, 2_000_000, &json!({}));
        assert_eq!(
            verdict,
            Verdict::Rejected {
                reason: "impossible_score".to_string()
            }
        );
    }

    #[test]
    fn flybird_accepts_any_plausible_obstacle_count() {
        assert!(validate_score(GameType::Flybird, 423, &json!({})).is_accepted());
        assert!(validate_score(GameType::Flybird, 7, &json!({})).is_accepted());
        let verdict = validate_score(GameType::Flybird, 200_000, &json!({}));
        assert_eq!(
            verdict,
            Verdict::Rejected {
                reason: "impossible_score".to_string()
            }
        );
    }

    #[test]
    fn endless_runner_negative_height_with_positive_score_rejected() {
        let verdict = validate_score(GameType::EndlessRunner, 500, &json!({"height": -30}));
        assert!(!verdict.is_accepted());
        assert!(
            validate_score(GameType::EndlessRunner, 500, &json!({"height": 5000})).is_accepted()
        );
    }
}
