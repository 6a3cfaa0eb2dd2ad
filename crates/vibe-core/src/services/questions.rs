//! Anonymous questions, answers and votes.

use std::collections::HashMap;

use serde_json::json;

use super::{group_by, ANSWERS, QUESTIONS, VOTES};
use crate::auth::SessionProvider;
use crate::client::{decode_all, single, to_row, VibeClient};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::models::{
    AnonymousAnswer, AnonymousQuestion, Mutation, QuestionOrder, QuestionVote,
    QuestionWithAnswers, VoteAction, VoteType,
};
use crate::remote::{into_row, Query, RemoteStore};
use crate::storage::KeyValueStore;

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    /// A page of active questions with their answers and the caller's vote.
    pub async fn questions(
        &self,
        limit: usize,
        offset: usize,
        order: QuestionOrder,
    ) -> Result<Vec<QuestionWithAnswers>> {
        let user = self.optional_user().await?;
        let questions: Vec<AnonymousQuestion> = decode_all(
            self.select(
                QUESTIONS,
                Query::new()
                    .eq("is_active", true)
                    .order(order.column(), false)
                    .range(offset, limit),
            )
            .await?,
        )?;

        let ids: Vec<String> = questions
            .iter()
            .filter_map(|question| question.id.as_persisted().map(str::to_string))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut answers = group_by(
            self.select(
                ANSWERS,
                Query::new()
                    .is_in("question_id", ids.iter().cloned())
                    .order("created_at", true),
            )
            .await?,
            "question_id",
        );

        let votes: HashMap<String, VoteType> = match user {
            Some(user) => decode_all::<QuestionVote>(
                self.select(
                    VOTES,
                    Query::new().eq("user_id", user.id).is_in("question_id", ids),
                )
                .await?,
            )?
            .into_iter()
            .map(|vote| (vote.question_id, vote.vote))
            .collect(),
            None => HashMap::new(),
        };

        questions
            .into_iter()
            .map(|question| {
                let id = question.id.as_persisted().unwrap_or_default().to_string();
                Ok(QuestionWithAnswers {
                    answers: decode_all(answers.remove(&id).unwrap_or_default())?,
                    user_vote: votes.get(&id).copied(),
                    question,
                })
            })
            .collect()
    }

    pub async fn post_question(&self, text: &str) -> Result<AnonymousQuestion> {
        let user = self.require_user().await?;
        let text = required_text(text, "Question")?;
        self.require_online().await?;

        let payload = to_row(&json!({
            "user_id": user.id,
            "question_text": text,
            "is_active": true,
            "vote_count": 0,
            "answer_count": 0,
        }))?;
        let rows = self.execute(&Mutation::insert(QUESTIONS, payload)?).await?;
        single(rows, QUESTIONS)
    }

    pub async fn answer_question(&self, question_id: &str, text: &str) -> Result<AnonymousAnswer> {
        let user = self.require_user().await?;
        let text = required_text(text, "Answer")?;
        self.require_online().await?;

        let payload = to_row(&json!({
            "question_id": question_id,
            "user_id": user.id,
            "answer_text": text,
        }))?;
        let rows = self.execute(&Mutation::insert(ANSWERS, payload)?).await?;
        single(rows, ANSWERS)
    }

    /// Toggle the caller's vote on a question.
    ///
    /// The same vote again removes it, the opposite vote replaces it, and a
    /// first vote is recorded. Requires a connection.
    pub async fn vote_question(&self, question_id: &str, vote: VoteType) -> Result<VoteAction> {
        let user = self.require_user().await?;
        self.require_online().await?;

        let existing: Option<QuestionVote> = decode_all(
            self.select(
                VOTES,
                Query::new()
                    .eq("question_id", question_id)
                    .eq("user_id", user.id.as_str())
                    .limit(1),
            )
            .await?,
        )?
        .into_iter()
        .next();

        let key = into_row(json!({ "question_id": question_id, "user_id": user.id }));
        let action = match existing {
            Some(current) if current.vote == vote => {
                self.execute(&Mutation::delete(VOTES, key)?).await?;
                VoteAction::Removed
            }
            Some(_) => {
                let data = into_row(json!({ "vote": vote }));
                self.execute(&Mutation::update(VOTES, data, key)?).await?;
                VoteAction::Changed
            }
            None => {
                let mut payload = key;
                payload.insert("vote".into(), json!(vote));
                self.execute(&Mutation::insert(VOTES, payload)?).await?;
                VoteAction::Voted
            }
        };

        tracing::debug!(question_id, vote = %vote, action = %action, "Recorded question vote");
        Ok(action)
    }
}

fn required_text<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let text = text.trim();
    if text.is_empty() {
        Err(Error::InvalidInput(format!("{what} text is required")))
    } else {
        Ok(text)
    }
}
