//! Read-only coaching content: the category tree, check-in prompts and
//! behavior sliders.

use serde::{Deserialize, Serialize};

use crate::rotation::CheckinQuestion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingCategory {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    pub sort_order: i64,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingSection {
    pub id: String,
    pub category_id: String,
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub sort_order: i64,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingItem {
    pub id: String,
    pub section_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sort_order: i64,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionWithItems {
    #[serde(flatten)]
    pub section: CoachingSection,
    pub items: Vec<CoachingItem>,
}

/// One node of the content tree: a category with its sections and items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithSections {
    #[serde(flatten)]
    pub category: CoachingCategory,
    pub sections: Vec<SectionWithItems>,
}

/// Advice shown for answers up to `max_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinQuestionTip {
    pub id: String,
    pub question_id: String,
    pub max_value: i64,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    pub text: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinQuestionWithTips {
    #[serde(flatten)]
    pub question: CheckinQuestion,
    pub tips: Vec<CheckinQuestionTip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSlider {
    pub id: String,
    pub category_slug: String,
    pub title: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub sort_order: i64,
}

/// Recommendation shown for slider positions up to `max_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSliderRec {
    pub id: String,
    pub slider_id: String,
    pub max_value: i64,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    pub text: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderWithRecs {
    #[serde(flatten)]
    pub slider: BehaviorSlider,
    pub recs: Vec<BehaviorSliderRec>,
}
