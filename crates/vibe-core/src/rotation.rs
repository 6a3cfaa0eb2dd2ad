//! Deterministic check-in question rotation.
//!
//! Every client shows the same questions during a 12-hour window: the window
//! index seeds a multiplicative hash and questions are ordered by
//! `hash(seed + sort_order)`.

use serde::{Deserialize, Serialize};

const WINDOW_MS: i64 = 12 * 60 * 60 * 1000;
const HASH_MULTIPLIER: i128 = 2_654_435_761;
const HASH_MODULUS: i128 = 2_147_483_647;

/// Questions shown per window.
pub const ROTATION_SIZE: usize = 5;

const SLIDER_LABELS: [&str; 5] = ["Extremely Failed", "Failed", "Okay", "Well", "Extremely Well"];
const SLIDER_COLORS: [&str; 5] = ["#E8634A", "#E8A94A", "#E8E84A", "#7BE84A", "#4A90D9"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinQuestion {
    pub id: String,
    pub sort_order: i64,
    pub question: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cat_color: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
}

/// `(n * 2654435761) mod 2147483647`, with the sign of `n` like JavaScript's `%`.
pub fn rotation_hash(n: i64) -> i64 {
    let value = (i128::from(n) * HASH_MULTIPLIER) % HASH_MODULUS;
    // |value| < 2^31
    i64::try_from(value).unwrap_or_default()
}

/// Index of the 12-hour window containing `now_ms`.
pub const fn rotation_seed(now_ms: i64) -> i64 {
    now_ms.div_euclid(WINDOW_MS)
}

/// The first `count` questions of the window's stable hash ordering.
pub fn questions_for_rotation(
    questions: &[CheckinQuestion],
    now_ms: i64,
    count: usize,
) -> Vec<&CheckinQuestion> {
    let seed = rotation_seed(now_ms);
    let mut ordered: Vec<&CheckinQuestion> = questions.iter().collect();
    ordered.sort_by_key(|question| rotation_hash(seed.saturating_add(question.sort_order)));
    ordered.truncate(count);
    ordered
}

fn slider_index(value: i64) -> usize {
    usize::try_from(value.saturating_sub(1).clamp(0, 4)).unwrap_or(2)
}

/// Label for a 1-5 slider value; out-of-range values clamp.
pub fn slider_label(value: i64) -> &'static str {
    SLIDER_LABELS[slider_index(value)]
}

pub fn slider_color(value: i64) -> &'static str {
    SLIDER_COLORS[slider_index(value)]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn catalog(size: i64) -> Vec<CheckinQuestion> {
        (1..=size)
            .map(|order| CheckinQuestion {
                id: format!("q{order}"),
                sort_order: order,
                question: format!("Question {order}"),
                emoji: None,
                category: None,
                cat_color: None,
                advice: None,
            })
            .collect()
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(rotation_hash(0), 0);
        assert_eq!(rotation_hash(1), 506_952_114);
        assert_eq!(rotation_hash(2), 1_013_904_228);
    }

    #[test]
    fn seed_buckets_by_twelve_hours() {
        assert_eq!(rotation_seed(0), 0);
        assert_eq!(rotation_seed(WINDOW_MS - 1), 0);
        assert_eq!(rotation_seed(WINDOW_MS), 1);
    }

    #[test]
    fn rotation_is_stable_within_a_window() {
        let questions = catalog(38);
        let start = 20_000 * WINDOW_MS;

        let first = questions_for_rotation(&questions, start, ROTATION_SIZE);
        let later = questions_for_rotation(&questions, start + WINDOW_MS - 1, ROTATION_SIZE);
        assert_eq!(first, later);
        assert_eq!(first.len(), ROTATION_SIZE);

        let ids: Vec<_> = first.iter().map(|question| question.id.as_str()).collect();
        assert_eq!(ids, vec!["q7", "q24", "q3", "q20", "q37"]);
    }

    #[test]
    fn rotation_changes_between_windows() {
        let questions = catalog(38);
        let start = 20_000 * WINDOW_MS;

        let first = questions_for_rotation(&questions, start, ROTATION_SIZE);
        let next = questions_for_rotation(&questions, start + WINDOW_MS, ROTATION_SIZE);
        assert_ne!(first, next);
    }

    #[test]
    fn small_catalogs_return_everything() {
        let questions = catalog(3);
        assert_eq!(questions_for_rotation(&questions, 0, ROTATION_SIZE).len(), 3);
    }

    #[test]
    fn slider_labels_clamp() {
        assert_eq!(slider_label(1), "Extremely Failed");
        assert_eq!(slider_label(3), "Okay");
        assert_eq!(slider_label(5), "Extremely Well");
        assert_eq!(slider_label(0), "Extremely Failed");
        assert_eq!(slider_label(9), "Extremely Well");
        assert_eq!(slider_color(4), "#7BE84A");
    }
}
