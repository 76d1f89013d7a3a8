use std::path::Path;

use anyhow::{bail, Context, Result};
use volley_core::{distance, DebugSubscriber, ExecutorSettings};
use volley_executor::{AerialStrike, SkillCtx, SkillProgress, SkillResult, StrikeStatus};
use volley_simulator::{Simulation, SimulationConfig};

use crate::scenario::ScenarioArgs;

/// Extra time after the intercept before a strike that has not ended is abandoned.
const TIMEOUT_MARGIN: f64 = 1.0;

pub fn strike(
    settings: &ExecutorSettings,
    args: &ScenarioArgs,
    force: bool,
    debug_dump: Option<&Path>,
) -> Result<()> {
    let scenario = args.build()?;
    let subscriber = match debug_dump {
        Some(_) => Some(DebugSubscriber::install()?),
        None => None,
    };

    let aerial_settings = args.preset.settings(settings);
    let mut strike = AerialStrike::new(aerial_settings.clone(), scenario.aim)
        .with_prediction(settings.prediction.clone());

    if !strike.intercept_predicate(&scenario.car, &scenario.ball) {
        let required = aerial_settings.required_time(args.ball_height);
        if !force {
            bail!(
                "Intercept at height {:.0} with {:.2}s slack is not feasible for the {:?} preset \
                 (height range {:.0}..{:.0}, required slack {:.2}s), use --force to run anyway",
                args.ball_height,
                args.slack,
                args.preset,
                aerial_settings.min_height,
                aerial_settings.max_height,
                required
            );
        }
        tracing::warn!("Running infeasible strike (required slack {:.2}s)", required);
    }

    strike.configure(&scenario.car, &scenario.intercept)?;
    let target = strike
        .flight_plan()
        .map(|plan| plan.target)
        .context("Strike has no flight plan")?;

    let mut sim = Simulation::new(SimulationConfig::default(), scenario.car, scenario.ball);
    let max_ticks = ((args.slack + TIMEOUT_MARGIN) / scenario.dt).ceil() as usize;
    let mut commit_time = None;
    let mut result = None;
    for _ in 0..max_ticks {
        let progress = strike.update(SkillCtx {
            car: sim.car(),
            ball: sim.ball(),
            dt: scenario.dt,
        });
        if commit_time.is_none() && strike.status() == StrikeStatus::Committed {
            commit_time = Some(sim.time());
        }
        match progress {
            SkillProgress::Continue(controls) => sim.step(&controls, scenario.dt),
            SkillProgress::Done(done) => {
                result = Some(done);
                break;
            }
        }
    }

    let car = sim.car();
    match result {
        Some(SkillResult::Success) => println!("Strike finished at t={:.3}s", sim.time()),
        Some(SkillResult::Failure) => println!("Strike failed at t={:.3}s", sim.time()),
        None => println!("Strike did not end within {:.2}s", sim.time()),
    }
    match commit_time {
        Some(time) => println!("Took off at t={:.3}s", time),
        None => println!("Never took off"),
    }
    println!(
        "Final distance to target: {:.1} uu, boost left: {:.0}",
        distance(&car.position, &target),
        car.boost
    );
    if let Some(time) = sim.first_contact() {
        println!("Touched the ball at t={:.3}s", time);
    }

    if let (Some(subscriber), Some(path)) = (subscriber, debug_dump) {
        let records = serde_json::to_string_pretty(&subscriber.get_copy())?;
        std::fs::write(path, records)
            .with_context(|| format!("Failed to write debug records to {}", path.display()))?;
        tracing::info!("Wrote debug records to {}", path.display());
    }

    Ok(())
}
