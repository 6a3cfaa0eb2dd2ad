//! Daily check-ins and their answers.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::{group_by, CHECKINS, CHECKIN_ANSWERS, PROFILES};
use crate::auth::SessionProvider;
use crate::client::{decode_all, single, to_row, VibeClient, WriteOutcome};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{
    CheckinAnswer, CheckinInput, CheckinStats, CheckinWithAnswers, DailyCheckin, DailyScore,
    Mutation, RecordId,
};
use crate::remote::{Query, RemoteStore, Row};
use crate::storage::KeyValueStore;
use crate::util::{days_ago, now_rfc3339, round_2, today_date};

const CHECKIN_CONFLICT: &str = "user_id,checkin_date";

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    /// Save the check-in for a day, replacing any earlier one for that date.
    ///
    /// Offline, only the check-in row is queued and the returned record is
    /// pending, answers included.
    pub async fn save_checkin(&self, input: CheckinInput) -> Result<CheckinWithAnswers> {
        let user = self.require_user().await?;
        let input = input.normalized()?;
        let checkin_date = input.checkin_date.clone().unwrap_or_else(today_date);
        let overall_score = input.resolved_score();

        let payload = to_row(&json!({
            "user_id": user.id,
            "checkin_date": checkin_date,
            "overall_score": overall_score,
            "notes": input.notes,
        }))?;
        let mutation = Mutation::upsert(CHECKINS, payload, Some(CHECKIN_CONFLICT))?;

        let rows = match self.write_or_defer(mutation).await? {
            WriteOutcome::Persisted(rows) => rows,
            WriteOutcome::Deferred(_) => {
                let created_at = now_rfc3339();
                let answers = input
                    .answers
                    .iter()
                    .map(|answer| CheckinAnswer {
                        id: RecordId::Pending,
                        checkin_id: RecordId::Pending,
                        question_id: answer.question_id.clone(),
                        value: answer.value,
                        detail_text: answer.detail_text.clone(),
                        created_at: created_at.clone(),
                    })
                    .collect();
                return Ok(CheckinWithAnswers {
                    checkin: DailyCheckin {
                        id: RecordId::Pending,
                        user_id: user.id,
                        checkin_date,
                        overall_score,
                        notes: input.notes,
                        created_at,
                    },
                    answers,
                });
            }
        };

        let checkin: DailyCheckin = single(rows, CHECKINS)?;
        let checkin_id = checkin
            .id
            .as_persisted()
            .ok_or_else(|| Error::Storage("Saved check-in has no id".into()))?
            .to_string();

        let mut filter = Row::new();
        filter.insert("checkin_id".into(), Value::String(checkin_id.clone()));
        self.execute(&Mutation::delete(CHECKIN_ANSWERS, filter)?)
            .await?;

        let answer_rows: Vec<Row> = input
            .answers
            .iter()
            .map(|answer| {
                to_row(&json!({
                    "checkin_id": checkin_id,
                    "question_id": answer.question_id,
                    "value": answer.value,
                    "detail_text": answer.detail_text,
                }))
            })
            .collect::<Result<_>>()?;
        let answers = decode_all(self.insert_rows(CHECKIN_ANSWERS, answer_rows).await?)?;

        tracing::debug!(checkin_id = %checkin_id, date = %checkin.checkin_date, "Saved check-in");
        Ok(CheckinWithAnswers { checkin, answers })
    }

    /// Newest first.
    pub async fn checkin_history(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CheckinWithAnswers>> {
        let user = self.require_user().await?;
        let rows = self
            .select(
                CHECKINS,
                Query::new()
                    .eq("user_id", user.id)
                    .order("checkin_date", false)
                    .range(offset, limit),
            )
            .await?;
        self.attach_answers(decode_all(rows)?).await
    }

    pub async fn checkin_stats(&self) -> Result<CheckinStats> {
        let user = self.require_user().await?;

        let total_checkins = self
            .count(CHECKINS, Query::new().eq("user_id", user.id.as_str()))
            .await?;

        let recent: Vec<DailyCheckin> = decode_all(
            self.select(
                CHECKINS,
                Query::new()
                    .eq("user_id", user.id.as_str())
                    .gte("checkin_date", days_ago(7))
                    .order("checkin_date", true),
            )
            .await?,
        )?;

        let scores: Vec<f64> = recent.iter().filter_map(|c| c.overall_score).collect();
        #[allow(clippy::cast_precision_loss)]
        let average_score = if scores.is_empty() {
            None
        } else {
            Some(round_2(scores.iter().sum::<f64>() / scores.len() as f64))
        };

        let current_streak = match self
            .select(PROFILES, Query::new().eq("id", user.id.as_str()).limit(1))
            .await
        {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("streak_count"))
                .and_then(Value::as_i64)
                .unwrap_or(0),
            Err(error) => {
                tracing::warn!("Could not read check-in streak: {}", error);
                0
            }
        };

        Ok(CheckinStats {
            total_checkins,
            average_score,
            current_streak,
            last_7_days: recent
                .into_iter()
                .map(|checkin| DailyScore {
                    date: checkin.checkin_date,
                    score: checkin.overall_score,
                })
                .collect(),
        })
    }

    /// Today's check-in; `None` when signed out or not yet saved.
    pub async fn today_checkin(&self) -> Result<Option<CheckinWithAnswers>> {
        let Some(user) = self.optional_user().await? else {
            return Ok(None);
        };
        let rows = self
            .select(
                CHECKINS,
                Query::new()
                    .eq("user_id", user.id)
                    .eq("checkin_date", today_date())
                    .limit(1),
            )
            .await?;
        Ok(self.attach_answers(decode_all(rows)?).await?.into_iter().next())
    }

    async fn attach_answers(&self, checkins: Vec<DailyCheckin>) -> Result<Vec<CheckinWithAnswers>> {
        let ids: Vec<String> = checkins
            .iter()
            .filter_map(|checkin| checkin.id.as_persisted().map(str::to_string))
            .collect();
        let mut answers = if ids.is_empty() {
            BTreeMap::new()
        } else {
            let rows = self
                .select(CHECKIN_ANSWERS, Query::new().is_in("checkin_id", ids))
                .await?;
            group_by(rows, "checkin_id")
        };

        checkins
            .into_iter()
            .map(|checkin| {
                let rows = checkin
                    .id
                    .as_persisted()
                    .and_then(|id| answers.remove(id))
                    .unwrap_or_default();
                Ok(CheckinWithAnswers {
                    checkin,
                    answers: decode_all(rows)?,
                })
            })
            .collect()
    }
}
