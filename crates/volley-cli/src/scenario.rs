use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use volley_core::{AerialSettings, BallData, CarData, ExecutorSettings, Intercept, Vector3};

/// Distance behind the ball, along the approach, of the point the strike aims at.
const AIM_DISTANCE: f64 = 2000.0;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Preset {
    Standard,
    Fast,
}

impl Preset {
    pub fn settings(self, settings: &ExecutorSettings) -> AerialSettings {
        match self {
            Preset::Standard => settings.standard_aerial.clone(),
            Preset::Fast => settings.fast_aerial.clone(),
        }
    }
}

/// A car driving straight at a ball that hovers at the intercept.
#[derive(Debug, Clone, Args)]
pub struct ScenarioArgs {
    #[clap(long, default_value = "standard")]
    pub preset: Preset,

    /// Height of the ball above the ground in uu.
    #[clap(long, default_value = "650")]
    pub ball_height: f64,

    /// Time until the ball reaches the intercept in seconds.
    #[clap(long, default_value = "2.5")]
    pub slack: f64,

    /// Initial ground distance between the car and the ball in uu.
    #[clap(long, default_value = "1500")]
    pub distance: f64,

    /// Initial speed of the car toward the ball in uu/s.
    #[clap(long, default_value = "0", allow_hyphen_values = true)]
    pub speed: f64,

    /// Rate at which the strike is updated, in Hz.
    #[clap(long, default_value = "60")]
    pub tick_rate: f64,
}

pub struct Scenario {
    pub car: CarData,
    pub ball: BallData,
    pub intercept: Intercept,
    pub aim: Vector3,
    pub dt: f64,
}

impl ScenarioArgs {
    pub fn build(&self) -> Result<Scenario> {
        if self.distance.is_nan() || self.distance <= 0.0 {
            bail!("Distance must be positive, got {}", self.distance);
        }
        if self.slack.is_nan() || self.slack <= 0.0 {
            bail!("Slack must be positive, got {}", self.slack);
        }
        if self.tick_rate.is_nan() || self.tick_rate <= 0.0 {
            bail!("Tick rate must be positive, got {}", self.tick_rate);
        }
        if !self.ball_height.is_finite() || !self.speed.is_finite() {
            bail!("Ball height and speed must be finite");
        }

        let mut car = CarData::on_ground(Vector3::new(0.0, 0.0, 17.0), 0.0);
        car.velocity = Vector3::new(self.speed, 0.0, 0.0);
        let ball_position = Vector3::new(self.distance, 0.0, self.ball_height);
        let intercept = Intercept::new(ball_position, self.slack);

        Ok(Scenario {
            car,
            ball: intercept.ball(),
            aim: ball_position + Vector3::new(AIM_DISTANCE, 0.0, 0.0),
            intercept,
            dt: 1.0 / self.tick_rate,
        })
    }
}
