use volley_core::{ground_distance, CarData, ControlCmd, Vector3};

/// Ground controller that keeps a car driving toward a point while an aerial is
/// being prepared.
pub trait GroundApproach {
    /// Baseline controls for this tick to reach `target` at `arrival_time`.
    fn step(&mut self, car: &CarData, target: &Vector3, arrival_time: f64, dt: f64)
        -> ControlCmd;

    /// Whether a supervisor may abort the approach.
    fn interruptible(&self) -> bool {
        true
    }
}

/// Drives straight at the target's ground projection at the average speed needed
/// to get there on time.
#[derive(Debug, Clone)]
pub struct Arrive {
    /// Steering per radian of heading error.
    pub steer_gain: f64,
    /// Speed excess above which the car brakes, in uu/s.
    pub speed_tolerance: f64,
}

impl Default for Arrive {
    fn default() -> Self {
        Self {
            steer_gain: 3.0,
            speed_tolerance: 100.0,
        }
    }
}

impl GroundApproach for Arrive {
    fn step(
        &mut self,
        car: &CarData,
        target: &Vector3,
        arrival_time: f64,
        _dt: f64,
    ) -> ControlCmd {
        let local = car.to_local(&(target - car.position));
        // Positive angle means the target is to the left, positive steer turns right
        let angle = local.y.atan2(local.x);
        let steer = (-angle * self.steer_gain).clamp(-1.0, 1.0);

        let time_left = arrival_time - car.time;
        let speed = car.velocity.dot(&car.forward());
        let throttle = if time_left <= 0.0 {
            1.0
        } else {
            let needed = ground_distance(&car.position, target) / time_left;
            if speed < needed {
                1.0
            } else if speed > needed + self.speed_tolerance {
                -1.0
            } else {
                0.0
            }
        };

        ControlCmd {
            throttle,
            steer,
            ..ControlCmd::neutral()
        }
    }
}
