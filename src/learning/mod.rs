//! Scheduled re-learning: optimize, validate, version.

pub mod auto_learner;
pub mod promotion;

pub use auto_learner::{data_range, AutoLearner, LEARNING_WINDOW_DAYS};
pub use promotion::{ManualPromotion, PromotionDecision, PromotionPolicy};
