mod aerial;
mod arrive;
mod reorient;

pub use aerial::{Aerial, FlightPlan};
pub use arrive::{Arrive, GroundApproach};
pub use reorient::Reorient;
