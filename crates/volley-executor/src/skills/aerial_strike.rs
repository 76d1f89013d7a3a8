use std::fmt;

use thiserror::Error;
use volley_core::{
    angle_to, axis_to_rotation, debug_cross, debug_polyline, debug_remove, debug_string, debug_value, direction,
    distance, ground_direction, ground_distance, look_at, AerialSettings, BallData, CarData,
    ControlCmd, DebugColor, Intercept, PredictionSettings, Vector3,
};
use volley_simulator::{CarSimulator, PhysicsStepper, SimulationConfig};

use super::{SkillCtx, SkillProgress, SkillResult};
use crate::{
    control::{Aerial, Arrive, FlightPlan, GroundApproach},
    prediction::{extrapolate, predict_flight},
};

/// Where the strike is in its decision process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeStatus {
    /// Driving, takeoff not yet possible.
    Grounded,
    /// Driving. Taking off now would work, but so would taking off later.
    TooEarly,
    /// Airborne control has taken over. Never left again.
    Committed,
}

impl StrikeStatus {
    fn color(self) -> DebugColor {
        match self {
            StrikeStatus::Grounded => DebugColor::Red,
            StrikeStatus::TooEarly => DebugColor::Orange,
            StrikeStatus::Committed => DebugColor::Green,
        }
    }
}

impl fmt::Display for StrikeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrikeStatus::Grounded => "grounded",
            StrikeStatus::TooEarly => "too_early",
            StrikeStatus::Committed => "committed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrikeError {
    #[error("intercept or aim point is not finite")]
    InvalidIntercept,
    #[error("the strike has already taken off")]
    AlreadyCommitted,
}

/// Skill that hits the ball out of the air at a precomputed intercept.
///
/// While on the ground the car keeps driving toward the takeoff spot and every tick
/// simulates the whole aerial from its current state. It takes off once the
/// simulated flight ends close to the target, unless a flight started a moment
/// later would still get there. Once in the air, control is handed to [`Aerial`]
/// until the arrival time.
pub struct AerialStrike<S: PhysicsStepper = CarSimulator, G: GroundApproach = Arrive> {
    settings: AerialSettings,
    prediction: PredictionSettings,
    aim: Vector3,
    plan: Option<FlightPlan>,
    aerial: Option<Aerial>,
    status: StrikeStatus,
    outcome: Option<SkillResult>,
    flight_path: Vec<Vector3>,
    stepper: S,
    approach: G,
    model: SimulationConfig,
}

impl AerialStrike {
    /// Creates a strike that sends the ball toward `aim`, predicting flights with the
    /// default car model.
    pub fn new(settings: AerialSettings, aim: Vector3) -> Self {
        let stepper = CarSimulator::default();
        let model = stepper.config().clone();
        Self::with_collaborators(settings, aim, stepper, model, Arrive::default())
    }
}

impl<S: PhysicsStepper, G: GroundApproach> AerialStrike<S, G> {
    /// Creates a strike with a custom physics stepper and ground controller.
    ///
    /// `model` provides the car constants the flight controller plans with.
    pub fn with_collaborators(
        settings: AerialSettings,
        aim: Vector3,
        stepper: S,
        model: SimulationConfig,
        approach: G,
    ) -> Self {
        Self {
            settings,
            prediction: PredictionSettings::default(),
            aim,
            plan: None,
            aerial: None,
            status: StrikeStatus::Grounded,
            outcome: None,
            flight_path: Vec::new(),
            stepper,
            approach,
            model,
        }
    }

    pub fn with_prediction(mut self, prediction: PredictionSettings) -> Self {
        self.prediction = prediction;
        self
    }

    /// Whether the ball state is a sensible candidate for this strike.
    pub fn intercept_predicate(&self, car: &CarData, ball: &BallData) -> bool {
        self.settings
            .is_feasible(ball.position.z, ball.time - car.time)
    }

    /// Sets up the flight plan for a new intercept.
    pub fn configure(&mut self, car: &CarData, intercept: &Intercept) -> Result<(), StrikeError> {
        if self.status == StrikeStatus::Committed {
            log::warn!("Ignoring new intercept, the car has already taken off");
            return Err(StrikeError::AlreadyCommitted);
        }
        if !intercept.is_finite() || !self.aim.iter().all(|c| c.is_finite()) {
            log::warn!("Refusing to configure strike for {:?}", intercept);
            return Err(StrikeError::InvalidIntercept);
        }

        let target = intercept.position
            - direction(&intercept.position, &self.aim) * self.settings.target_offset;
        let up = (ground_direction(&intercept.position, &car.position)
            + Vector3::new(0.0, 0.0, self.settings.up_bias))
        .try_normalize(1e-9)
        .unwrap_or_else(Vector3::z);

        log::debug!(
            "Strike configured: target=({:.0}, {:.0}, {:.0}) arrival={:.2}",
            target.x,
            target.y,
            target.z,
            intercept.time
        );
        self.plan = Some(FlightPlan {
            target,
            arrival_time: intercept.time,
            up,
            angle_threshold: self.settings.angle_threshold,
            double_jump: self.settings.double_jump,
        });
        self.status = StrikeStatus::Grounded;
        self.outcome = None;
        self.flight_path.clear();
        Ok(())
    }

    pub fn flight_plan(&self) -> Option<&FlightPlan> {
        self.plan.as_ref()
    }

    /// The flight controller, once the car has taken off.
    pub fn aerial(&self) -> Option<&Aerial> {
        self.aerial.as_ref()
    }

    pub fn status(&self) -> StrikeStatus {
        self.status
    }

    /// Positions of the most recent flight prediction from the live car state.
    pub fn flight_path(&self) -> &[Vector3] {
        &self.flight_path
    }

    pub fn finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// A supervisor may only abort the strike before takeoff.
    pub fn interruptible(&self) -> bool {
        self.status != StrikeStatus::Committed && self.approach.interruptible()
    }

    pub fn update(&mut self, ctx: SkillCtx<'_>) -> SkillProgress {
        if let Some(outcome) = self.outcome {
            return SkillProgress::Done(outcome);
        }
        let Some(plan) = self.plan.clone() else {
            return SkillProgress::Continue(ControlCmd::neutral());
        };

        match self.status {
            StrikeStatus::Committed => self.fly(ctx, &plan),
            StrikeStatus::Grounded | StrikeStatus::TooEarly => self.drive(ctx, &plan),
        }
    }

    /// Distance between the end of a simulated flight from `car` and the target.
    /// Flights that cannot be simulated count as infinitely far off.
    fn landing_error(
        &self,
        plan: &FlightPlan,
        car: &CarData,
        path: Option<&mut Vec<Vector3>>,
    ) -> f64 {
        match predict_flight(
            &self.stepper,
            car,
            plan,
            &self.model,
            &self.prediction,
            path,
        ) {
            Ok(end) => distance(&end.position, &plan.target),
            Err(err) => {
                log::debug!("Treating flight as infeasible: {}", err);
                f64::INFINITY
            }
        }
    }

    fn drive(&mut self, ctx: SkillCtx<'_>, plan: &FlightPlan) -> SkillProgress {
        let car = ctx.car;
        let settings = &self.settings;
        let time_left = plan.arrival_time - car.time;
        if time_left <= 0.0 {
            log::warn!("Missed the intercept at t={:.2}", plan.arrival_time);
            self.outcome = Some(SkillResult::Failure);
            return SkillProgress::failure();
        }

        self.status = StrikeStatus::Grounded;
        let mut controls = self
            .approach
            .step(car, &plan.target, plan.arrival_time, ctx.dt);

        let mut path = std::mem::take(&mut self.flight_path);
        path.clear();
        let landing_error = self.landing_error(plan, car, Some(&mut path));
        self.flight_path = path;

        let speed_towards_target = car
            .velocity
            .dot(&ground_direction(&car.position, &plan.target));
        let target_distance = ground_distance(&car.position, &plan.target);
        let speed_needed = target_distance / time_left;
        let aligned = angle_to(car, &plan.target) < settings.max_alignment_angle;

        let mut commit = false;
        if speed_towards_target > speed_needed && aligned {
            // Too fast, slow down
            controls.throttle = -1.0;
        } else if landing_error < settings.max_distance_error {
            if aligned || car.velocity.norm() < settings.slow_speed {
                if !settings.delay_takeoff || target_distance <= settings.delay_min_ground_distance
                {
                    commit = true;
                } else {
                    let later = extrapolate(car, settings.probe_time, settings.probe_min_speed);
                    let later_error = self.landing_error(plan, &later, None);
                    if later_error > self.settings.max_distance_error {
                        commit = true;
                    } else {
                        self.status = StrikeStatus::TooEarly;
                    }
                }
            }
        } else {
            controls.throttle = 1.0;
        }

        if commit {
            log::info!(
                "Taking off at t={:.3}, {:.2}s before arrival (landing error {:.1})",
                car.time,
                time_left,
                landing_error
            );
            self.status = StrikeStatus::Committed;
        } else {
            log::debug!(
                "{} landing_error={:.1} speed={:.0}/{:.0} -> {}",
                self.status,
                landing_error,
                speed_towards_target,
                speed_needed,
                controls
            );
        }

        let color = self.status.color();
        debug_polyline("strike.flight_path", &self.flight_path, color);
        debug_cross("strike.target", plan.target, color);
        debug_value("strike.landing_error", landing_error);
        debug_string("strike.status", self.status.to_string());

        SkillProgress::Continue(controls)
    }

    fn fly(&mut self, ctx: SkillCtx<'_>, plan: &FlightPlan) -> SkillProgress {
        let car = ctx.car;
        if self.aerial.is_none() {
            // Ground predictions no longer apply once airborne
            debug_remove("strike.landing_error");
        }
        let settings = &self.settings;
        let aerial = self
            .aerial
            .get_or_insert_with(|| Aerial::new(plan, &self.model));
        let time_left = aerial.arrival_time - car.time;

        if car.position.z > settings.freestyle_min_height
            && time_left > settings.freestyle_cutoff_time
        {
            let roll = axis_to_rotation(&(car.forward() * settings.freestyle_roll));
            aerial.up = roll * car.up();
        } else {
            aerial.up = -Vector3::z();
        }
        aerial.target_orientation = Some(look_at(
            &direction(&car.position, &ctx.ball.position),
            &-Vector3::z(),
        ));

        let controls = aerial.step(car, ctx.dt);
        if aerial.finished() {
            log::info!("Aerial finished at t={:.3}", car.time);
            self.outcome = Some(SkillResult::Success);
            return SkillProgress::success();
        }
        SkillProgress::Continue(controls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    /// Moves the car along its velocity and ignores every input, so flight
    /// predictions end at `position + velocity * time_left`.
    struct Drift;

    impl PhysicsStepper for Drift {
        fn step(&self, car: &CarData, _controls: &ControlCmd, dt: f64) -> CarData {
            let mut next = car.clone();
            next.position += car.velocity * dt;
            next.time += dt;
            next
        }
    }

    const DT: f64 = 1.0 / 60.0;

    fn strike(settings: AerialSettings) -> AerialStrike<Drift, Arrive> {
        AerialStrike::with_collaborators(
            settings,
            Vector3::new(3900.0, 0.0, 300.0),
            Drift,
            SimulationConfig::default(),
            Arrive::default(),
        )
    }

    fn car(yaw: f64, velocity: Vector3) -> CarData {
        let mut car = CarData::on_ground(Vector3::zeros(), yaw);
        car.velocity = velocity;
        car
    }

    fn configured(
        settings: AerialSettings,
        car: &CarData,
        intercept: Vector3,
        arrival_time: f64,
    ) -> AerialStrike<Drift, Arrive> {
        let mut strike = strike(settings);
        strike
            .configure(car, &Intercept::new(intercept, arrival_time))
            .unwrap();
        strike
    }

    fn tick(strike: &mut AerialStrike<Drift, Arrive>, car: &CarData) -> SkillProgress {
        let ball = BallData::at_rest(Vector3::new(1900.0, 0.0, 300.0), car.time);
        strike.update(SkillCtx {
            car,
            ball: &ball,
            dt: DT,
        })
    }

    fn controls(progress: SkillProgress) -> ControlCmd {
        match progress {
            SkillProgress::Continue(controls) => controls,
            SkillProgress::Done(result) => panic!("strike ended with {:?}", result),
        }
    }

    #[test]
    fn test_configure_derives_flight_plan() {
        let car = car(0.0, Vector3::zeros());
        let strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            3.0,
        );
        let plan = strike.flight_plan().unwrap();

        assert_relative_eq!(plan.target, Vector3::new(1800.0, 0.0, 300.0), epsilon = 1e-9);
        assert_relative_eq!(
            plan.up,
            Vector3::new(-1.0, 0.0, 0.5).normalize(),
            epsilon = 1e-9
        );
        assert_relative_eq!(plan.arrival_time, 3.0);
        assert_relative_eq!(plan.angle_threshold, 0.8);
        assert!(!plan.double_jump);
    }

    #[test]
    fn test_configure_rejects_invalid_intercept() {
        let car = car(0.0, Vector3::zeros());
        let mut strike = strike(AerialSettings::standard());

        let result = strike.configure(&car, &Intercept::new(Vector3::new(f64::NAN, 0.0, 0.0), 1.0));

        assert_eq!(result, Err(StrikeError::InvalidIntercept));
        assert!(strike.flight_plan().is_none());
    }

    #[test]
    fn test_unconfigured_strike_stays_grounded() {
        let car = car(0.0, Vector3::new(600.0, 0.0, 0.0));
        let mut strike = strike(AerialSettings::standard());

        let progress = tick(&mut strike, &car);

        assert_eq!(progress, SkillProgress::Continue(ControlCmd::neutral()));
        assert_eq!(strike.status(), StrikeStatus::Grounded);
        assert!(strike.flight_path().is_empty());
    }

    #[test_log::test]
    fn test_waits_while_later_takeoff_works() {
        let car = car(FRAC_PI_2, Vector3::new(600.0, 0.0, 100.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            3.0,
        );

        controls(tick(&mut strike, &car));

        assert_eq!(strike.status(), StrikeStatus::TooEarly);
        assert!(strike.interruptible());
        assert!(strike.aerial().is_none());
        assert!(!strike.flight_path().is_empty());
    }

    #[test_log::test]
    fn test_commits_when_later_takeoff_misses() {
        let car = car(FRAC_PI_2, Vector3::new(300.0, 0.0, 50.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            6.0,
        );

        controls(tick(&mut strike, &car));

        assert_eq!(strike.status(), StrikeStatus::Committed);
        assert!(!strike.interruptible());
    }

    #[test]
    fn test_fast_preset_commits_without_delay_check() {
        let car = car(FRAC_PI_2, Vector3::new(600.0, 0.0, 100.0));
        let mut strike = configured(
            AerialSettings::fast(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            3.0,
        );

        controls(tick(&mut strike, &car));

        assert_eq!(strike.status(), StrikeStatus::Committed);
        assert!(strike.flight_plan().unwrap().double_jump);
    }

    #[test]
    fn test_commits_close_to_target() {
        let car = car(FRAC_PI_2, Vector3::new(600.0, 0.0, 100.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1000.0, 0.0, 150.0),
            1.5,
        );

        controls(tick(&mut strike, &car));

        assert_eq!(strike.status(), StrikeStatus::Committed);
    }

    #[test]
    fn test_overshoot_guard_takes_precedence() {
        // The flight lands 30 uu from the target, but the car is too fast
        let car = car(0.0, Vector3::new(610.0, 0.0, 100.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            3.0,
        );

        let controls = controls(tick(&mut strike, &car));

        assert_eq!(controls.throttle, -1.0);
        assert_eq!(strike.status(), StrikeStatus::Grounded);
    }

    /// A car facing sideways that drifts exactly onto the target by the arrival time.
    fn fast_unaligned_strike(speed: f64) -> (AerialStrike<Drift, Arrive>, CarData, ControlCmd) {
        let arrival_time = 1.5;
        let mut car = car(FRAC_PI_2, Vector3::new(speed, 0.0, 0.0));
        car.position = Vector3::new(1800.0 - speed * arrival_time, 0.0, 300.0);
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            arrival_time,
        );
        let plan = strike.flight_plan().unwrap().clone();
        let baseline = Arrive::default().step(&car, &plan.target, plan.arrival_time, DT);

        let controls = controls(tick(&mut strike, &car));
        assert_eq!(controls, baseline);
        (strike, car, controls)
    }

    #[test]
    fn test_fast_unaligned_car_does_not_commit() {
        let (strike, _, controls) = fast_unaligned_strike(1200.0);

        assert_eq!(strike.status(), StrikeStatus::Grounded);
        assert!(strike.aerial().is_none());
        assert!(controls.throttle != -1.0);
    }

    #[test]
    fn test_slow_speed_limit_is_exclusive() {
        let (strike, car, _) = fast_unaligned_strike(1000.0);

        assert_eq!(car.velocity.norm(), 1000.0);
        assert_eq!(strike.status(), StrikeStatus::Grounded);
        assert!(strike.interruptible());
    }

    #[test]
    fn test_accelerates_when_flight_misses() {
        let car = car(FRAC_PI_2, Vector3::new(100.0, 0.0, 0.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            3.0,
        );

        let controls = controls(tick(&mut strike, &car));

        assert_eq!(controls.throttle, 1.0);
        assert_eq!(strike.status(), StrikeStatus::Grounded);
    }

    #[test]
    fn test_step_limit_counts_as_miss() {
        // Would land on target, but the flight is longer than the step cap
        let car = car(FRAC_PI_2, Vector3::new(18.0, 0.0, 3.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            100.0,
        );

        let controls = controls(tick(&mut strike, &car));

        assert_eq!(controls.throttle, 1.0);
        assert_eq!(strike.status(), StrikeStatus::Grounded);
        assert_eq!(strike.flight_path().len(), 1200);
    }

    #[test]
    fn test_fails_when_out_of_time() {
        let mut car = car(0.0, Vector3::new(600.0, 0.0, 0.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            1.0,
        );
        car.time = 1.0;

        assert_eq!(tick(&mut strike, &car), SkillProgress::failure());
        assert!(strike.finished());
        assert_eq!(tick(&mut strike, &car), SkillProgress::failure());
    }

    #[test]
    fn test_commit_is_final() {
        let mut car = car(FRAC_PI_2, Vector3::new(300.0, 0.0, 50.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car,
            Vector3::new(1900.0, 0.0, 300.0),
            6.0,
        );
        controls(tick(&mut strike, &car));
        assert_eq!(strike.status(), StrikeStatus::Committed);

        let result = strike.configure(&car, &Intercept::new(Vector3::new(0.0, 0.0, 500.0), 9.0));
        assert_eq!(result, Err(StrikeError::AlreadyCommitted));

        let mut ticks = 0;
        loop {
            car = Drift.step(&car, &ControlCmd::neutral(), DT);
            ticks += 1;
            let progress = tick(&mut strike, &car);
            assert_eq!(strike.status(), StrikeStatus::Committed);
            if progress == SkillProgress::success() {
                break;
            }
            assert!(ticks < 400);
        }

        assert!(strike.finished());
        assert!(car.time >= 6.0 && car.time < 6.0 + DT);
    }

    #[test]
    fn test_freestyle_up_vector() {
        let car_on_ground = car(FRAC_PI_2, Vector3::new(600.0, 0.0, 100.0));
        let mut strike = configured(
            AerialSettings::standard(),
            &car_on_ground,
            Vector3::new(1000.0, 0.0, 150.0),
            1.5,
        );
        controls(tick(&mut strike, &car_on_ground));
        assert_eq!(strike.status(), StrikeStatus::Committed);

        let mut flying = CarData::on_ground(Vector3::new(0.0, 0.0, 1000.0), 0.0);
        flying.on_ground = false;
        controls(tick(&mut strike, &flying));
        let aerial = strike.aerial().unwrap();
        assert_relative_eq!(
            aerial.up,
            Vector3::new(0.0, -(0.5f64).sin(), (0.5f64).cos()),
            epsilon = 1e-9
        );
        let facing = aerial.target_orientation.unwrap();
        assert_relative_eq!(
            facing * Vector3::x(),
            Vector3::new(1900.0, 0.0, -700.0).normalize(),
            epsilon = 1e-9
        );
        assert!((facing * Vector3::z()).z < -0.9);

        flying.position.z = 150.0;
        controls(tick(&mut strike, &flying));
        assert_relative_eq!(strike.aerial().unwrap().up, -Vector3::z());

        flying.position.z = 1000.0;
        flying.time = 1.0;
        controls(tick(&mut strike, &flying));
        assert_relative_eq!(strike.aerial().unwrap().up, -Vector3::z());
    }
}
