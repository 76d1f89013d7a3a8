mod debug_info;
mod executor_settings;
mod math;
mod world;

pub use debug_info::*;
pub use executor_settings::*;
pub use math::*;
pub use world::*;

use std::fmt;

use serde::{Deserialize, Serialize};

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Orientation = nalgebra::UnitQuaternion<f64>;

/// A control command for one car, as it is fed to the physics stepper.
///
/// Analog inputs are normalized to \[-1, 1\]. The axis conventions follow the car's
/// local frame: `x` forward, `y` left, `z` up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlCmd {
    /// Forward/backward drive input. Negative values brake or reverse.
    pub throttle: f64,
    /// Steering input, with `+` turning right.
    pub steer: f64,
    /// Rotation about the local `y` axis while airborne.
    pub pitch: f64,
    /// Rotation about the local `z` axis while airborne.
    pub yaw: f64,
    /// Rotation about the local `x` axis while airborne.
    pub roll: f64,
    /// Jump button state
    pub jump: bool,
    /// Boost button state
    pub boost: bool,
}

impl ControlCmd {
    /// A command with every input released.
    pub fn neutral() -> ControlCmd {
        ControlCmd::default()
    }
}

impl fmt::Display for ControlCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra = match (self.jump, self.boost) {
            (true, true) => "JB",
            (true, false) => "J",
            (false, true) => "B",
            (false, false) => "",
        };
        write!(
            f,
            "T{:.2};S{:.2};P{:.2};Y{:.2};R{:.2};{}",
            self.throttle, self.steer, self.pitch, self.yaw, self.roll, extra
        )
    }
}
