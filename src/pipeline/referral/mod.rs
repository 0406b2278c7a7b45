//! Referral Drafter: referral decision, letter drafting, and deterministic
//! urgency classification.

pub mod decision;
pub mod drafter;
pub mod prompt;
pub mod urgency;

pub use decision::{referral_trigger, ReferralTrigger};
pub use drafter::{ReferralDrafter, FLAG_REFERRAL_FAILED};
pub use urgency::classify_urgency;
