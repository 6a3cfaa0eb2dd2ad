//! Anonymous Q&A ("ask all of us")

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown vote '{other}', expected up or down")),
        }
    }
}

/// Which transition a vote toggle performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    /// First vote on the question
    Voted,
    /// Opposite vote replaced the previous one
    Changed,
    /// Same vote again, toggled off
    Removed,
}

impl fmt::Display for VoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Voted => "voted",
            Self::Changed => "changed",
            Self::Removed => "removed",
        })
    }
}

/// Listing order for the question feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionOrder {
    #[default]
    Recent,
    Popular,
}

impl QuestionOrder {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Recent => "created_at",
            Self::Popular => "vote_count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousQuestion {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    pub question_text: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub answer_count: i64,
    #[serde(default)]
    pub created_at: String,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousAnswer {
    #[serde(default)]
    pub id: RecordId,
    pub question_id: String,
    pub user_id: String,
    pub answer_text: String,
    #[serde(default)]
    pub created_at: String,
}

/// At most one per user per question; unique on `question_id + user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionVote {
    #[serde(default)]
    pub id: RecordId,
    pub question_id: String,
    pub user_id: String,
    pub vote: VoteType,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: AnonymousQuestion,
    pub answers: Vec<AnonymousAnswer>,
    #[serde(default)]
    pub user_vote: Option<VoteType>,
}
