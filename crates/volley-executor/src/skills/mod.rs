mod aerial_strike;

pub use aerial_strike::{AerialStrike, StrikeError, StrikeStatus};

use volley_core::{BallData, CarData, ControlCmd};

#[derive(Clone, Copy)]
pub struct SkillCtx<'a> {
    pub car: &'a CarData,
    pub ball: &'a BallData,
    /// Length of the current tick in seconds
    pub dt: f64,
}

/// The result of a skill execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillResult {
    Success,
    Failure,
}

/// The progress of a skill execution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkillProgress {
    Continue(ControlCmd),
    Done(SkillResult),
}

impl SkillProgress {
    /// Creates a new `SkillProgress` with a `Success` result
    pub fn success() -> SkillProgress {
        SkillProgress::Done(SkillResult::Success)
    }

    /// Creates a new `SkillProgress` with a `Failure` result
    pub fn failure() -> SkillProgress {
        SkillProgress::Done(SkillResult::Failure)
    }
}
