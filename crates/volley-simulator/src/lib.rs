use volley_core::{ground, BallData, CarData, ControlCmd, Orientation, Vector3};

mod utils;

use utils::IntervalTrigger;

/// Advances a car by one fixed step.
///
/// Implementations must be pure: the same input always produces the same output and
/// the input state is never modified. Prediction code relies on this to run
/// throwaway simulations from copies of the live state.
pub trait PhysicsStepper {
    fn step(&self, car: &CarData, controls: &ControlCmd, dt: f64) -> CarData;
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    // PHYSICAL CONSTANTS
    /// Gravity vector in uu/s^2
    pub gravity: Vector3,
    /// Height of the car's center of mass when resting on the ground, in uu
    pub rest_height: f64,
    /// Maximum speed of the car in uu/s
    pub max_speed: f64,
    /// Maximum angular speed of the car in rad/s
    pub max_angular_speed: f64,

    // GROUND MODEL
    /// Throttle acceleration at standstill in uu/s^2
    pub throttle_accel: f64,
    /// Speed above which throttle no longer accelerates, in uu/s
    pub max_throttle_speed: f64,
    /// Deceleration when the throttle opposes the velocity, in uu/s^2
    pub brake_accel: f64,
    /// Deceleration without throttle, in uu/s^2
    pub coast_accel: f64,
    /// Maximum turning curvature (1/radius) at a given speed, as `(speed, curvature)`
    /// pairs sorted by speed
    pub curvature_table: Vec<(f64, f64)>,

    // JUMPING
    /// Velocity change applied along the roof axis on each jump, in uu/s
    pub jump_impulse: f64,
    /// Acceleration along the roof axis while the first jump is held, in uu/s^2
    pub jump_hold_accel: f64,
    /// Maximum duration of the hold acceleration in seconds
    pub jump_hold_time: f64,
    /// Time after the first jump in which the second jump is available, in seconds
    pub double_jump_window: f64,

    // AIR MODEL
    /// Forward acceleration from the throttle while airborne, in uu/s^2
    pub air_throttle_accel: f64,
    /// Angular acceleration per unit of roll, pitch and yaw input, in rad/s^2
    pub air_torque: Vector3,
    /// Angular damping for roll, pitch and yaw, in 1/s
    pub air_damping: Vector3,

    // BOOST
    /// Forward acceleration while boosting, in uu/s^2
    pub boost_accel: f64,
    /// Boost consumed per second of boosting
    pub boost_consumption: f64,

    // CONTACT
    /// Center distance at which the car counts as touching the ball, in uu
    pub contact_distance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            // PHYSICAL CONSTANTS
            gravity: Vector3::new(0.0, 0.0, -650.0),
            rest_height: 17.0,
            max_speed: 2300.0,
            max_angular_speed: 5.5,

            // GROUND MODEL
            throttle_accel: 1600.0,
            max_throttle_speed: 1410.0,
            brake_accel: 3500.0,
            coast_accel: 525.0,
            curvature_table: vec![
                (0.0, 0.0069),
                (500.0, 0.00398),
                (1000.0, 0.00235),
                (1500.0, 0.001375),
                (1750.0, 0.0011),
                (2300.0, 0.00088),
            ],

            // JUMPING
            jump_impulse: 291.667,
            jump_hold_accel: 1458.333,
            jump_hold_time: 0.2,
            double_jump_window: 1.25,

            // AIR MODEL
            air_throttle_accel: 66.667,
            air_torque: Vector3::new(36.08, 12.46, 8.92),
            air_damping: Vector3::new(4.47, 2.80, 1.89),

            // BOOST
            boost_accel: 991.667,
            boost_consumption: 33.3,

            // CONTACT
            contact_distance: 150.0,
        }
    }
}

impl SimulationConfig {
    /// Maximum curvature of the car's path at the given speed.
    pub fn max_curvature(&self, speed: f64) -> f64 {
        let speed = speed.abs();
        let table = &self.curvature_table;
        match table.first() {
            None => 0.0,
            Some(&(s0, k0)) if speed <= s0 => k0,
            Some(_) => {
                for pair in table.windows(2) {
                    let (s0, k0) = pair[0];
                    let (s1, k1) = pair[1];
                    if speed <= s1 {
                        return k0 + (speed - s0) / (s1 - s0) * (k1 - k0);
                    }
                }
                table.last().map(|&(_, k)| k).unwrap_or(0.0)
            }
        }
    }

    /// Forward acceleration from full throttle at the given speed.
    pub fn throttle_acceleration(&self, speed: f64) -> f64 {
        let speed = speed.abs();
        if speed >= self.max_throttle_speed {
            0.0
        } else {
            self.throttle_accel * (1.0 - speed / self.max_throttle_speed)
        }
    }
}

/// A simplified car model: arcade-style driving on a flat ground plane, jumps, and
/// torque-driven air control.
#[derive(Debug, Clone, Default)]
pub struct CarSimulator {
    config: SimulationConfig,
}

impl CarSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn step_ground(&self, car: &mut CarData, controls: &ControlCmd, dt: f64) {
        let config = &self.config;
        let forward = ground(&car.forward())
            .try_normalize(1e-9)
            .unwrap_or_else(Vector3::x);
        let speed = car.velocity.dot(&forward);
        let throttle = controls.throttle.clamp(-1.0, 1.0);

        let mut accel = if throttle.abs() < 0.01 {
            if speed.abs() > 1e-9 {
                -speed.signum() * config.coast_accel
            } else {
                0.0
            }
        } else if speed * throttle < 0.0 {
            throttle.signum() * config.brake_accel
        } else {
            throttle * config.throttle_acceleration(speed)
        };
        let braking = throttle.abs() < 0.01 || speed * throttle < 0.0;
        if self.use_boost(car, controls, dt) {
            accel += config.boost_accel;
        }

        let mut new_speed = speed + accel * dt;
        // Braking and coasting stop the car, they never reverse it
        if braking && speed * new_speed < 0.0 {
            new_speed = 0.0;
        }
        let new_speed = new_speed.clamp(-config.max_speed, config.max_speed);

        let yaw_rate =
            -controls.steer.clamp(-1.0, 1.0) * config.max_curvature(new_speed) * new_speed;
        let yaw = forward.y.atan2(forward.x) + yaw_rate * dt;
        car.orientation = Orientation::from_euler_angles(0.0, 0.0, yaw);
        car.velocity = car.forward() * new_speed;
        car.angular_velocity = Vector3::z() * yaw_rate;
        car.position += car.velocity * dt;
        car.position.z = config.rest_height;
    }

    fn step_air(&self, car: &mut CarData, controls: &ControlCmd, holding_jump: bool, dt: f64) {
        let config = &self.config;
        let throttle = controls.throttle.clamp(-1.0, 1.0);
        let mut accel = config.gravity + car.forward() * (throttle * config.air_throttle_accel);
        if holding_jump {
            accel += car.up() * config.jump_hold_accel;
        }
        if self.use_boost(car, controls, dt) {
            accel += car.forward() * config.boost_accel;
        }
        car.velocity += accel * dt;
        if car.velocity.norm() > config.max_speed {
            car.velocity = car.velocity.normalize() * config.max_speed;
        }
        car.position += car.velocity * dt;

        let input = Vector3::new(
            controls.roll.clamp(-1.0, 1.0),
            controls.pitch.clamp(-1.0, 1.0),
            controls.yaw.clamp(-1.0, 1.0),
        );
        let omega_local = car.to_local(&car.angular_velocity);
        let damping = Vector3::new(
            config.air_damping.x,
            config.air_damping.y * (1.0 - input.y.abs()),
            config.air_damping.z * (1.0 - input.z.abs()),
        );
        let alpha = config.air_torque.component_mul(&input) - damping.component_mul(&omega_local);
        let mut omega = car.orientation * (omega_local + alpha * dt);
        if omega.norm() > config.max_angular_speed {
            omega = omega.normalize() * config.max_angular_speed;
        }
        car.angular_velocity = omega;
        car.orientation = Orientation::from_scaled_axis(omega * dt) * car.orientation;
        car.orientation.renormalize_fast();
        car.jump_timer += dt;

        if car.position.z <= config.rest_height && car.velocity.z < 0.0 {
            self.land(car);
        }
    }

    fn land(&self, car: &mut CarData) {
        let forward = car.forward();
        let yaw = if ground(&forward).norm() > 1e-6 {
            forward.y.atan2(forward.x)
        } else {
            car.up().y.atan2(car.up().x)
        };
        car.orientation = Orientation::from_euler_angles(0.0, 0.0, yaw);
        car.position.z = self.config.rest_height;
        car.velocity.z = 0.0;
        car.angular_velocity = Vector3::zeros();
        car.on_ground = true;
        car.jumped = false;
        car.double_jumped = false;
        car.jump_timer = 0.0;
    }

    /// Consumes boost for this step and returns whether boost force applies.
    fn use_boost(&self, car: &mut CarData, controls: &ControlCmd, dt: f64) -> bool {
        if !controls.boost || car.boost <= 0.0 {
            return false;
        }
        car.boost = (car.boost - self.config.boost_consumption * dt).max(0.0);
        true
    }
}

impl PhysicsStepper for CarSimulator {
    fn step(&self, car: &CarData, controls: &ControlCmd, dt: f64) -> CarData {
        let mut next = car.clone();
        let jump_pressed = controls.jump && !car.jump_held;

        if car.on_ground && !jump_pressed {
            self.step_ground(&mut next, controls, dt);
        } else {
            let takeoff = car.on_ground;
            if takeoff {
                next.velocity += car.up() * self.config.jump_impulse;
                next.on_ground = false;
                next.jumped = true;
                next.double_jumped = false;
                next.jump_timer = 0.0;
            } else if jump_pressed
                && car.jumped
                && !car.double_jumped
                && car.jump_timer < self.config.double_jump_window
            {
                next.velocity += car.up() * self.config.jump_impulse;
                next.double_jumped = true;
            }
            let holding_jump = controls.jump
                && next.jumped
                && !next.double_jumped
                && (car.jump_held || takeoff)
                && next.jump_timer < self.config.jump_hold_time;
            self.step_air(&mut next, controls, holding_jump, dt);
        }

        next.jump_held = controls.jump;
        next.time += dt;
        next
    }
}

/// Longest physics step taken by [`Simulation`], in seconds.
const PHYSICS_SUBSTEP: f64 = 1.0 / 120.0;

/// A closed-loop simulation of one car and a hovering ball.
///
/// The outer step can be longer than the physics step; it is split into substeps
/// that are at most [`PHYSICS_SUBSTEP`] long.
pub struct Simulation<S: PhysicsStepper = CarSimulator> {
    stepper: S,
    car: CarData,
    ball: BallData,
    contact_distance: f64,
    first_contact: Option<f64>,
    log_trigger: IntervalTrigger,
}

impl Simulation<CarSimulator> {
    pub fn new(config: SimulationConfig, car: CarData, ball: BallData) -> Self {
        let contact_distance = config.contact_distance;
        Self::with_stepper(CarSimulator::new(config), car, ball, contact_distance)
    }
}

impl<S: PhysicsStepper> Simulation<S> {
    pub fn with_stepper(stepper: S, car: CarData, ball: BallData, contact_distance: f64) -> Self {
        Self {
            stepper,
            car,
            ball,
            contact_distance,
            first_contact: None,
            log_trigger: IntervalTrigger::new(0.25),
        }
    }

    pub fn car(&self) -> &CarData {
        &self.car
    }

    pub fn ball(&self) -> &BallData {
        &self.ball
    }

    pub fn time(&self) -> f64 {
        self.car.time
    }

    /// Time of the first contact between car and ball, if any.
    pub fn first_contact(&self) -> Option<f64> {
        self.first_contact
    }

    /// Advance the simulation by `dt` seconds while holding `controls`.
    pub fn step(&mut self, controls: &ControlCmd, dt: f64) {
        let substeps = (dt / PHYSICS_SUBSTEP - 1e-9).ceil().max(1.0) as usize;
        let h = dt / substeps as f64;
        for _ in 0..substeps {
            self.car = self.stepper.step(&self.car, controls, h);
            self.ball.time = self.car.time;
            if self.first_contact.is_none()
                && (self.car.position - self.ball.position).norm() < self.contact_distance
            {
                log::info!("Car touched the ball at t={:.3}", self.car.time);
                self.first_contact = Some(self.car.time);
            }
        }

        if self.log_trigger.trigger(self.car.time) {
            log::debug!(
                "t={:.2} pos=({:.0}, {:.0}, {:.0}) speed={:.0} boost={:.0} on_ground={}",
                self.car.time,
                self.car.position.x,
                self.car.position.y,
                self.car.position.z,
                self.car.velocity.norm(),
                self.car.boost,
                self.car.on_ground
            );
        }
    }
}
