//! Data models for Vibe Working

mod checkin;
mod coaching;
mod contact;
mod item_note;
mod mood;
mod mutation;
mod question;
mod record;
mod saved_item;

pub use checkin::{
    AnswerInput, CheckinAnswer, CheckinInput, CheckinStats, CheckinWithAnswers, DailyCheckin,
    DailyScore,
};
pub use coaching::{
    BehaviorSlider, BehaviorSliderRec, CategoryWithSections, CheckinQuestionTip,
    CheckinQuestionWithTips, CoachingCategory, CoachingItem, CoachingSection, SectionWithItems,
    SliderWithRecs,
};
pub use contact::{Contact, ContactInput, ContactUpdate, DailyContactLog};
pub use item_note::{UserItemNote, UserItemNoteWithPhotos, UserItemPhoto};
pub use mood::{
    BossMoodEntry, BossMoodScale, MoodEntryWithScales, MoodInput, MoodTrendPoint, ScaleInput,
    BOSS_MOOD_SCALES,
};
pub use mutation::{Mutation, MutationId, MutationKind, QueuedMutation};
pub use question::{
    AnonymousAnswer, AnonymousQuestion, QuestionOrder, QuestionVote, QuestionWithAnswers,
    VoteAction, VoteType,
};
pub use record::RecordId;
pub use saved_item::SavedItem;
