use anyhow::{Context, Result};
use volley_core::{distance, ExecutorSettings};
use volley_executor::{predict_flight, AerialStrike};
use volley_simulator::CarSimulator;

use crate::scenario::ScenarioArgs;

pub fn predict(settings: &ExecutorSettings, args: &ScenarioArgs) -> Result<()> {
    let scenario = args.build()?;
    let mut strike = AerialStrike::new(args.preset.settings(settings), scenario.aim);
    strike.configure(&scenario.car, &scenario.intercept)?;
    let plan = strike.flight_plan().context("Strike has no flight plan")?;

    let sim = CarSimulator::default();
    let mut path = Vec::new();
    let end = predict_flight(
        &sim,
        &scenario.car,
        plan,
        sim.config(),
        &settings.prediction,
        Some(&mut path),
    )?;

    println!(
        "Landing at ({:.0}, {:.0}, {:.0}) at t={:.3}s",
        end.position.x, end.position.y, end.position.z, end.time
    );
    println!(
        "Landing error: {:.1} uu (tolerance {:.0} uu)",
        distance(&end.position, &plan.target),
        args.preset.settings(settings).max_distance_error
    );
    println!("Path length: {} steps", path.len());

    Ok(())
}
