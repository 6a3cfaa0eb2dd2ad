//! Boss mood (energy check-in) model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// The five scales recorded with every mood entry.
pub const BOSS_MOOD_SCALES: [&str; 5] = [
    "hostile_friendly",
    "controlling_empowering",
    "fearful_confident",
    "closed_open",
    "tense_relaxed",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossMoodEntry {
    #[serde(default)]
    pub id: RecordId,
    pub user_id: String,
    #[serde(default)]
    pub overall_insight: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossMoodScale {
    #[serde(default)]
    pub id: RecordId,
    pub entry_id: String,
    pub scale_name: String,
    /// 1 to 100
    pub value: u8,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntryWithScales {
    #[serde(flatten)]
    pub entry: BossMoodEntry,
    pub scales: Vec<BossMoodScale>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleInput {
    pub scale_name: String,
    pub value: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodInput {
    #[serde(default)]
    pub overall_insight: Option<String>,
    pub scales: Vec<ScaleInput>,
}

impl MoodInput {
    pub fn normalized(mut self) -> Result<Self> {
        self.overall_insight = normalize_text_option(self.overall_insight);
        if self.scales.is_empty() {
            return Err(Error::InvalidInput("At least one mood scale is required".into()));
        }
        for scale in &self.scales {
            if !BOSS_MOOD_SCALES.contains(&scale.scale_name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Unknown mood scale '{}'",
                    scale.scale_name
                )));
            }
            if !(1..=100).contains(&scale.value) {
                return Err(Error::InvalidInput(format!(
                    "Mood scale '{}' must be between 1 and 100, got {}",
                    scale.scale_name, scale.value
                )));
            }
        }
        Ok(self)
    }
}

/// One sparkline point: an entry's scales and their rounded mean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodTrendPoint {
    pub date: String,
    pub scales: BTreeMap<String, u8>,
    pub avg_value: u32,
}

impl From<&MoodEntryWithScales> for MoodTrendPoint {
    fn from(entry: &MoodEntryWithScales) -> Self {
        let scales: BTreeMap<String, u8> = entry
            .scales
            .iter()
            .map(|scale| (scale.scale_name.clone(), scale.value))
            .collect();
        let sum: u32 = entry.scales.iter().map(|scale| u32::from(scale.value)).sum();
        let count = u32::try_from(entry.scales.len()).unwrap_or(u32::MAX);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let avg_value = if count == 0 {
            0
        } else {
            (f64::from(sum) / f64::from(count)).round() as u32
        };

        Self {
            date: entry.entry.created_at.clone(),
            scales,
            avg_value,
        }
    }
}
