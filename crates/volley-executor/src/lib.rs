mod control;
pub mod prediction;
pub mod skills;

pub use control::{Aerial, Arrive, FlightPlan, GroundApproach, Reorient};
pub use prediction::{extrapolate, predict_flight, PredictionError};
pub use skills::{AerialStrike, SkillCtx, SkillProgress, SkillResult, StrikeError, StrikeStatus};
