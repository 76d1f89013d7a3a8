use thiserror::Error;
use volley_core::{CarData, PredictionSettings, Vector3};
use volley_simulator::{PhysicsStepper, SimulationConfig};

use crate::control::{Aerial, FlightPlan};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    #[error("flight prediction did not finish within {steps} steps")]
    StepLimitExceeded { steps: usize },
}

/// Simulates an aerial from `car` to its arrival time and returns the final car
/// state.
///
/// The simulation runs on a private copy of `car`. When `path` is given, the
/// position after every step is appended to it.
pub fn predict_flight<S: PhysicsStepper>(
    stepper: &S,
    car: &CarData,
    plan: &FlightPlan,
    model: &SimulationConfig,
    settings: &PredictionSettings,
    mut path: Option<&mut Vec<Vector3>>,
) -> Result<CarData, PredictionError> {
    let mut car = car.clone();
    let mut aerial = Aerial::new(plan, model);
    let mut steps = 0;

    loop {
        if steps >= settings.max_steps {
            return Err(PredictionError::StepLimitExceeded { steps });
        }
        let controls = aerial.step(&car, settings.step);
        if aerial.finished() {
            break;
        }

        // Boost is assumed to be unlimited while predicting
        car.boost = settings.boost_override;
        car = stepper.step(&car, &controls, settings.step);
        if let Some(path) = path.as_deref_mut() {
            path.push(car.position);
        }
        steps += 1;
    }

    Ok(car)
}

/// Moves a copy of `car` along a straight line for `time` seconds.
///
/// Cars slower than `min_speed` are moved at `min_speed` along their velocity, or
/// along their nose when they are standing still.
pub fn extrapolate(car: &CarData, time: f64, min_speed: f64) -> CarData {
    let mut car = car.clone();
    let speed = car.velocity.norm();
    let displacement = if speed > min_speed {
        car.velocity * time
    } else {
        let direction = car
            .velocity
            .try_normalize(1e-6)
            .unwrap_or_else(|| car.forward());
        direction * (min_speed * time)
    };
    car.position += displacement;
    car.time += time;
    car
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use volley_simulator::CarSimulator;

    fn plan() -> FlightPlan {
        FlightPlan {
            target: Vector3::new(500.0, 0.0, 600.0),
            arrival_time: 1.3,
            up: Vector3::new(-1.0, 0.0, 0.5).normalize(),
            angle_threshold: 0.8,
            double_jump: false,
        }
    }

    #[test]
    fn test_prediction_is_deterministic_and_pure() {
        let sim = CarSimulator::default();
        let mut car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        car.velocity = Vector3::new(300.0, 0.0, 0.0);
        car.boost = 12.0;
        let copy = car.clone();
        let settings = PredictionSettings::default();

        let mut first_path = Vec::new();
        let mut second_path = Vec::new();
        let first = predict_flight(
            &sim,
            &car,
            &plan(),
            sim.config(),
            &settings,
            Some(&mut first_path),
        )
        .unwrap();
        let second = predict_flight(
            &sim,
            &car,
            &plan(),
            sim.config(),
            &settings,
            Some(&mut second_path),
        )
        .unwrap();

        assert_eq!(car, copy);
        assert_eq!(first, second);
        assert_eq!(first_path, second_path);
        assert!(first.time >= 1.3);
        assert_eq!(first_path.last(), Some(&first.position));
    }

    #[test]
    fn test_step_limit() {
        let sim = CarSimulator::default();
        let car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        let settings = PredictionSettings {
            max_steps: 10,
            ..Default::default()
        };

        let result = predict_flight(&sim, &car, &plan(), sim.config(), &settings, None);
        assert_eq!(result, Err(PredictionError::StepLimitExceeded { steps: 10 }));
    }

    #[test]
    fn test_extrapolate_uses_velocity() {
        let mut car = CarData::on_ground(Vector3::zeros(), 0.0);
        car.velocity = Vector3::new(0.0, 800.0, 0.0);

        let later = extrapolate(&car, 0.5, 500.0);

        assert_relative_eq!(later.position, Vector3::new(0.0, 400.0, 0.0));
        assert_relative_eq!(later.time, 0.5);
        assert_eq!(car.position, Vector3::zeros());
    }

    #[test]
    fn test_extrapolate_slow_car_uses_min_speed() {
        let mut car = CarData::on_ground(Vector3::zeros(), 0.0);
        car.velocity = Vector3::new(0.0, 100.0, 0.0);
        assert_relative_eq!(
            extrapolate(&car, 0.5, 500.0).position,
            Vector3::new(0.0, 250.0, 0.0)
        );

        car.velocity = Vector3::zeros();
        assert_relative_eq!(
            extrapolate(&car, 0.5, 500.0).position,
            Vector3::new(250.0, 0.0, 0.0)
        );
    }
}
