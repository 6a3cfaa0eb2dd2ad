//! Coaching content reads. Public catalog data, so no session is needed.

use super::{
    group_by, BEHAVIOR_SLIDERS, CHECKIN_QUESTIONS, COACHING_CATEGORIES, COACHING_ITEMS,
    COACHING_SECTIONS, QUESTION_TIPS, SLIDER_RECS,
};
use crate::auth::SessionProvider;
use crate::client::{decode_all, VibeClient};
use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::models::{
    BehaviorSlider, CategoryWithSections, CheckinQuestionWithTips, CoachingCategory,
    CoachingItem, CoachingSection, SectionWithItems, SliderWithRecs,
};
use crate::remote::{Query, RemoteStore};
use crate::rotation::CheckinQuestion;
use crate::storage::KeyValueStore;

/// Live rows of a catalog table, in display order.
fn live() -> Query {
    Query::new().is_null("archived_at").order("sort_order", true)
}

impl<R, K, C, A> VibeClient<R, K, C, A>
where
    R: RemoteStore + 'static,
    K: KeyValueStore + 'static,
    C: Connectivity,
    A: SessionProvider,
{
    pub async fn categories(&self) -> Result<Vec<CoachingCategory>> {
        decode_all(self.select(COACHING_CATEGORIES, live()).await?)
    }

    pub async fn sections(&self, category_id: &str) -> Result<Vec<CoachingSection>> {
        decode_all(
            self.select(COACHING_SECTIONS, live().eq("category_id", category_id))
                .await?,
        )
    }

    pub async fn items(&self, section_id: &str) -> Result<Vec<CoachingItem>> {
        decode_all(
            self.select(COACHING_ITEMS, live().eq("section_id", section_id))
                .await?,
        )
    }

    /// Every live category with its sections and their items.
    pub async fn content_tree(&self) -> Result<Vec<CategoryWithSections>> {
        let categories = self.select(COACHING_CATEGORIES, live()).await?;
        let sections = self.select(COACHING_SECTIONS, live()).await?;
        let mut items = group_by(self.select(COACHING_ITEMS, live()).await?, "section_id");

        let mut sections_by_category = group_by(sections, "category_id");
        decode_all::<CoachingCategory>(categories)?
            .into_iter()
            .map(|category| {
                let sections = sections_by_category
                    .remove(&category.id)
                    .unwrap_or_default();
                let sections = decode_all::<CoachingSection>(sections)?
                    .into_iter()
                    .map(|section| {
                        let rows = items.remove(&section.id).unwrap_or_default();
                        Ok(SectionWithItems {
                            items: decode_all(rows)?,
                            section,
                        })
                    })
                    .collect::<Result<_>>()?;
                Ok(CategoryWithSections { category, sections })
            })
            .collect()
    }

    /// Live check-in questions, each with its tips.
    pub async fn checkin_questions(&self) -> Result<Vec<CheckinQuestionWithTips>> {
        let questions = self.select(CHECKIN_QUESTIONS, live()).await?;
        let mut tips = group_by(
            self.select(QUESTION_TIPS, Query::new().order("sort_order", true))
                .await?,
            "question_id",
        );

        decode_all::<CheckinQuestion>(questions)?
            .into_iter()
            .map(|question| {
                let rows = tips.remove(&question.id).unwrap_or_default();
                Ok(CheckinQuestionWithTips {
                    tips: decode_all(rows)?,
                    question,
                })
            })
            .collect()
    }

    /// Behavior sliders with their recommendations, optionally limited to
    /// one category.
    pub async fn behavior_sliders(
        &self,
        category_slug: Option<&str>,
    ) -> Result<Vec<SliderWithRecs>> {
        let mut query = Query::new().order("sort_order", true);
        if let Some(slug) = category_slug {
            query = query.eq("category_slug", slug);
        }
        let sliders = self.select(BEHAVIOR_SLIDERS, query).await?;
        let mut recs = group_by(
            self.select(SLIDER_RECS, Query::new().order("sort_order", true))
                .await?,
            "slider_id",
        );

        decode_all::<BehaviorSlider>(sliders)?
            .into_iter()
            .map(|slider| {
                let rows = recs.remove(&slider.id).unwrap_or_default();
                Ok(SliderWithRecs {
                    recs: decode_all(rows)?,
                    slider,
                })
            })
            .collect()
    }
}
