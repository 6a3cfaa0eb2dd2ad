//! Daily check-in model

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::error::{Error, Result};
use crate::util::{is_valid_date, normalize_text_option, round_2};

/// One check-in per user per day; `user_id + checkin_date` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCheckin {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    pub checkin_date: String,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinAnswer {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub checkin_id: RecordId,
    pub question_id: String,
    /// 1 to 5
    pub value: u8,
    #[serde(default)]
    pub detail_text: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinWithAnswers {
    #[serde(flatten)]
    pub checkin: DailyCheckin,
    pub answers: Vec<CheckinAnswer>,
}

impl CheckinWithAnswers {
    pub const fn is_pending(&self) -> bool {
        self.checkin.id.is_pending()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: String,
    pub value: u8,
    #[serde(default)]
    pub detail_text: Option<String>,
}

impl AnswerInput {
    pub fn new(question_id: impl Into<String>, value: u8) -> Self {
        Self {
            question_id: question_id.into(),
            value,
            detail_text: None,
        }
    }
}

/// Caller payload for saving a check-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckinInput {
    /// `YYYY-MM-DD`; today (UTC) when absent
    #[serde(default)]
    pub checkin_date: Option<String>,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub answers: Vec<AnswerInput>,
}

impl CheckinInput {
    /// Trim optional text and reject out-of-range values.
    pub fn normalized(mut self) -> Result<Self> {
        self.checkin_date = normalize_text_option(self.checkin_date);
        self.notes = normalize_text_option(self.notes);

        if let Some(date) = &self.checkin_date {
            if !is_valid_date(date) {
                return Err(Error::InvalidInput(format!(
                    "Check-in date must be YYYY-MM-DD, got '{date}'"
                )));
            }
        }
        if let Some(score) = self.overall_score {
            if !(1.0..=5.0).contains(&score) {
                return Err(Error::InvalidInput(format!(
                    "Overall score must be between 1 and 5, got {score}"
                )));
            }
        }
        for answer in &mut self.answers {
            answer.question_id = answer.question_id.trim().to_string();
            answer.detail_text = normalize_text_option(answer.detail_text.take());
            if answer.question_id.is_empty() {
                return Err(Error::InvalidInput("Answer question id is required".into()));
            }
            if !(1..=5).contains(&answer.value) {
                return Err(Error::InvalidInput(format!(
                    "Answer for '{}' must be between 1 and 5, got {}",
                    answer.question_id, answer.value
                )));
            }
        }
        Ok(self)
    }

    /// Explicit score, or the mean of the answers rounded to two decimals.
    pub fn resolved_score(&self) -> Option<f64> {
        self.overall_score.or_else(|| {
            if self.answers.is_empty() {
                return None;
            }
            let sum: f64 = self.answers.iter().map(|answer| f64::from(answer.value)).sum();
            #[allow(clippy::cast_precision_loss)]
            let count = self.answers.len() as f64;
            Some(round_2(sum / count))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyScore {
    pub date: String,
    pub score: Option<f64>,
}

/// Summary for the check-in dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinStats {
    pub total_checkins: usize,
    /// Mean of the last seven days, two decimals
    pub average_score: Option<f64>,
    pub current_streak: i64,
    pub last_7_days: Vec<DailyScore>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn input(values: &[u8]) -> CheckinInput {
        CheckinInput {
            answers: values
                .iter()
                .enumerate()
                .map(|(index, value)| AnswerInput::new(format!("q{index}"), *value))
                .collect(),
            ..CheckinInput::default()
        }
    }

    #[test]
    fn score_defaults_to_rounded_answer_mean() {
        assert_eq!(input(&[4, 3, 5]).resolved_score(), Some(4.0));
        assert_eq!(input(&[4, 3, 3]).resolved_score(), Some(3.33));
        assert_eq!(input(&[]).resolved_score(), None);

        let explicit = CheckinInput {
            overall_score: Some(2.0),
            ..input(&[5, 5])
        };
        assert_eq!(explicit.resolved_score(), Some(2.0));
    }

    #[test]
    fn normalized_rejects_out_of_range_answers() {
        assert!(input(&[1, 5]).normalized().is_ok());
        assert!(input(&[0]).normalized().is_err());
        assert!(input(&[6]).normalized().is_err());

        let bad_date = CheckinInput {
            checkin_date: Some("03/04/2026".to_string()),
            ..input(&[3])
        };
        assert!(bad_date.normalized().is_err());
    }

    #[test]
    fn decodes_backend_row_with_answers() {
        let checkin: CheckinWithAnswers = serde_json::from_value(json!({
            "id": "c1",
            "user_id": "u1",
            "checkin_date": "2026-03-04",
            "overall_score": 3.5,
            "notes": null,
            "created_at": "2026-03-04T08:00:00Z",
            "answers": [
                { "id": "a1", "checkin_id": "c1", "question_id": "q1", "value": 4 }
            ],
        }))
        .unwrap();

        assert_eq!(checkin.checkin.id.as_persisted(), Some("c1"));
        assert_eq!(checkin.answers[0].value, 4);
        assert!(!checkin.is_pending());
    }
}
