use serde::{Deserialize, Serialize};

use crate::{Orientation, Vector3};

/// A snapshot of one car's physical state.
///
/// This is advanced by the physics stepper once per tick. Prediction code always
/// works on a clone, so the live state is never touched outside the stepper.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CarData {
    /// Simulation time of this snapshot in seconds.
    pub time: f64,
    /// Position of the car's center of mass in uu
    pub position: Vector3,
    /// Velocity in uu/s
    pub velocity: Vector3,
    /// Angular velocity in the world frame, in rad/s
    pub angular_velocity: Vector3,
    /// Rotation from the car's local frame to the world frame.
    pub orientation: Orientation,
    /// Boost amount in \[0, 100\]
    pub boost: f64,
    /// Whether the wheels are in contact with the ground
    pub on_ground: bool,
    /// Whether the car has used its first jump since it last left the ground
    pub jumped: bool,
    /// Whether the car has used its second jump
    pub double_jumped: bool,
    /// Time since the first jump, in seconds
    pub jump_timer: f64,
    /// Jump input of the previous step, used for press detection
    pub jump_held: bool,
}

impl CarData {
    /// A car resting on the ground at the given position, facing along `yaw`.
    pub fn on_ground(position: Vector3, yaw: f64) -> Self {
        Self {
            time: 0.0,
            position,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            orientation: Orientation::from_euler_angles(0.0, 0.0, yaw),
            boost: 100.0,
            on_ground: true,
            jumped: false,
            double_jumped: false,
            jump_timer: 0.0,
            jump_held: false,
        }
    }

    /// Unit vector pointing out of the car's nose.
    pub fn forward(&self) -> Vector3 {
        self.orientation * Vector3::x()
    }

    /// Unit vector pointing out of the car's roof.
    pub fn up(&self) -> Vector3 {
        self.orientation * Vector3::z()
    }

    /// Express a world-frame vector in the car's local frame.
    pub fn to_local(&self, v: &Vector3) -> Vector3 {
        self.orientation.inverse() * v
    }
}

/// A struct to store the ball state at one point in time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BallData {
    /// Simulation time of this state in seconds.
    pub time: f64,
    /// Position of the ball's center in uu
    pub position: Vector3,
    /// Velocity of the ball in uu/s
    pub velocity: Vector3,
}

impl BallData {
    pub fn at_rest(position: Vector3, time: f64) -> Self {
        Self {
            time,
            position,
            velocity: Vector3::zeros(),
        }
    }
}

/// A predicted point in space and time where the car can meet the ball.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Intercept {
    pub position: Vector3,
    /// Absolute simulation time at which the ball is at `position`.
    pub time: f64,
}

impl Intercept {
    pub fn new(position: Vector3, time: f64) -> Self {
        Self { position, time }
    }

    /// The ball state at the intercept.
    pub fn ball(&self) -> BallData {
        BallData::at_rest(self.position, self.time)
    }

    pub fn is_finite(&self) -> bool {
        self.time.is_finite() && self.position.iter().all(|c| c.is_finite())
    }
}
