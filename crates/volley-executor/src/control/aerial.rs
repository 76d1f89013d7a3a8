use volley_core::{angle_between, look_at, CarData, ControlCmd, Orientation, Vector3};
use volley_simulator::SimulationConfig;

use super::reorient::Reorient;

const REORIENT_KP: f64 = 40.0;
const REORIENT_KD: f64 = 10.0;

/// Parameters of one aerial, fixed when the strike is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightPlan {
    /// Position the car's center should reach, in uu.
    pub target: Vector3,
    /// Absolute time at which the car should be at `target`.
    pub arrival_time: f64,
    /// Preferred direction of the car's roof while flying.
    pub up: Vector3,
    /// Maximum angle between the nose and the required correction for boosting.
    pub angle_threshold: f64,
    /// Take off with a second jump.
    pub double_jump: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Takeoff {
    /// First jump is held. `elapsed` is the time the button has been down.
    Jumping { elapsed: f64 },
    /// Button released for one tick so the second jump registers as a new press.
    Release,
    SecondJump,
    Flying,
}

/// Flight controller that takes a car through the air to a point in space at a
/// given time.
///
/// Every step the car's ballistic trajectory is extrapolated to the arrival time.
/// The nose is turned toward the remaining correction and boost is fired whenever
/// the nose points close enough to it.
#[derive(Debug, Clone)]
pub struct Aerial {
    pub target: Vector3,
    pub arrival_time: f64,
    pub up: Vector3,
    /// Orientation to hold once the correction is small. When unset the car looks
    /// at the target.
    pub target_orientation: Option<Orientation>,
    pub angle_threshold: f64,
    /// Correction length below which `target_orientation` takes over, in uu.
    pub reorient_distance: f64,
    double_jump: bool,
    takeoff: Option<Takeoff>,
    reorient: Reorient,
    gravity: Vector3,
    boost_accel: f64,
    jump_impulse: f64,
    jump_hold_accel: f64,
    jump_hold_time: f64,
    finished: bool,
}

impl Aerial {
    pub fn new(plan: &FlightPlan, model: &SimulationConfig) -> Self {
        Self {
            target: plan.target,
            arrival_time: plan.arrival_time,
            up: plan.up,
            target_orientation: None,
            angle_threshold: plan.angle_threshold,
            reorient_distance: 50.0,
            double_jump: plan.double_jump,
            takeoff: None,
            reorient: Reorient::new(REORIENT_KP, REORIENT_KD, model),
            gravity: model.gravity,
            boost_accel: model.boost_accel,
            jump_impulse: model.jump_impulse,
            jump_hold_accel: model.jump_hold_accel,
            jump_hold_time: model.jump_hold_time,
            finished: false,
        }
    }

    /// Whether the arrival time has been reached.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Where the car ends up at the arrival time without any further boost.
    fn ballistic_position(&self, car: &CarData, takeoff: Takeoff, time_left: f64) -> Vector3 {
        let t = time_left;
        let mut position = car.position + car.velocity * t + self.gravity * (0.5 * t * t);

        let hold_left = match takeoff {
            Takeoff::Jumping { elapsed } => (self.jump_hold_time - elapsed).clamp(0.0, t),
            _ => 0.0,
        };
        if car.on_ground && matches!(takeoff, Takeoff::Jumping { .. }) {
            position += car.up() * (self.jump_impulse * t);
        }
        position += car.up() * (self.jump_hold_accel * hold_left * (t - 0.5 * hold_left));

        let second_jump_pending = self.double_jump && takeoff != Takeoff::Flying;
        if second_jump_pending {
            position += car.up() * (self.jump_impulse * (t - hold_left));
        }
        position
    }

    /// Advance the takeoff sequence by one step and return whether jump is held.
    fn step_takeoff(&mut self, takeoff: Takeoff, dt: f64) -> bool {
        let (next, jump) = match takeoff {
            Takeoff::Jumping { elapsed } => {
                let elapsed = elapsed + dt;
                if elapsed < self.jump_hold_time {
                    (Takeoff::Jumping { elapsed }, true)
                } else if self.double_jump {
                    (Takeoff::Release, true)
                } else {
                    (Takeoff::Flying, true)
                }
            }
            Takeoff::Release => (Takeoff::SecondJump, false),
            Takeoff::SecondJump => (Takeoff::Flying, true),
            Takeoff::Flying => (Takeoff::Flying, false),
        };
        self.takeoff = Some(next);
        jump
    }

    pub fn step(&mut self, car: &CarData, dt: f64) -> ControlCmd {
        let time_left = self.arrival_time - car.time;
        if time_left <= 0.0 {
            self.finished = true;
            return ControlCmd::neutral();
        }

        let takeoff = *self.takeoff.get_or_insert(if car.on_ground {
            Takeoff::Jumping { elapsed: 0.0 }
        } else {
            Takeoff::Flying
        });

        let correction = self.target - self.ballistic_position(car, takeoff, time_left);

        let setpoint = if correction.norm() > self.reorient_distance {
            look_at(&correction, &self.up)
        } else {
            match self.target_orientation {
                Some(orientation) => orientation,
                None => look_at(&(self.target - car.position), &self.up),
            }
        };
        self.reorient.set_setpoint(setpoint);

        let mut controls = ControlCmd::neutral();
        self.reorient.update(car, &mut controls);
        controls.jump = self.step_takeoff(takeoff, dt);

        // A single boost step must not overshoot the correction
        let aligned = angle_between(&car.forward(), &correction) < self.angle_threshold;
        controls.boost =
            aligned && correction.norm() > 0.5 * self.boost_accel * dt * time_left;

        controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use volley_simulator::{CarSimulator, PhysicsStepper};

    const DT: f64 = 1.0 / 120.0;

    fn plan(target: Vector3, arrival_time: f64, double_jump: bool) -> FlightPlan {
        FlightPlan {
            target,
            arrival_time,
            up: Vector3::new(-1.0, 0.0, 0.5).normalize(),
            angle_threshold: 0.8,
            double_jump,
        }
    }

    fn fly(car: &CarData, plan: &FlightPlan) -> (CarData, Vec<ControlCmd>) {
        let sim = CarSimulator::default();
        let mut aerial = Aerial::new(plan, sim.config());
        let mut car = car.clone();
        let mut history = Vec::new();
        loop {
            let controls = aerial.step(&car, DT);
            if aerial.finished() {
                return (car, history);
            }
            history.push(controls);
            car = sim.step(&car, &controls, DT);
        }
    }

    #[test]
    fn test_finished_at_arrival_time() {
        let car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        let mut aerial = Aerial::new(
            &plan(Vector3::new(0.0, 0.0, 500.0), 0.0, false),
            &SimulationConfig::default(),
        );

        let controls = aerial.step(&car, DT);

        assert!(aerial.finished());
        assert_eq!(controls, ControlCmd::neutral());
    }

    #[test]
    fn test_single_jump_holds_then_releases() {
        let car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        let (_, history) = fly(&car, &plan(Vector3::new(400.0, 0.0, 500.0), 1.5, false));

        let held = history.iter().take_while(|c| c.jump).count();
        assert!((24..=26).contains(&held), "held {}", held);
        assert!(history[held..].iter().all(|c| !c.jump));
    }

    #[test]
    fn test_double_jump_sequence() {
        let car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        let (_, history) = fly(&car, &plan(Vector3::new(400.0, 0.0, 900.0), 2.0, true));

        let held = history.iter().take_while(|c| c.jump).count();
        assert!(!history[held].jump);
        assert!(history[held + 1].jump);
        assert!(history[held + 2..].iter().all(|c| !c.jump));
    }

    #[test]
    fn test_reaches_reachable_target() {
        let car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        let target = Vector3::new(600.0, 0.0, 600.0);
        let (end, _) = fly(&car, &plan(target, 1.4, false));

        assert_relative_eq!(end.time, 1.4, epsilon = 1.5 * DT);
        assert!((end.position - target).norm() < 60.0);
    }

    #[test]
    fn test_airborne_car_skips_takeoff() {
        let mut car = CarData::on_ground(Vector3::new(0.0, 0.0, 400.0), 0.0);
        car.on_ground = false;
        let sim = CarSimulator::default();
        let mut aerial = Aerial::new(
            &plan(Vector3::new(500.0, 0.0, 400.0), 1.0, true),
            sim.config(),
        );

        let controls = aerial.step(&car, DT);
        assert!(!controls.jump);
    }
}
