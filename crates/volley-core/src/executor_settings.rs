use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::range_map;

/// Settings for one aerial strike policy.
///
/// The standard and fast aerials are the same policy with different constants, see
/// [`AerialSettings::standard`] and [`AerialSettings::fast`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AerialSettings {
    /// Lower bound (exclusive) of the ball height at which an aerial is considered, in uu.
    pub min_height: f64,
    /// Upper bound (exclusive) of the ball height at which an aerial is considered, in uu.
    pub max_height: f64,
    /// Time needed to reach a ball at `min_height`, in seconds.
    pub min_height_time: f64,
    /// Time needed to reach a ball at `max_height`, in seconds.
    pub max_height_time: f64,
    /// Take off with a double jump instead of a single jump.
    pub double_jump: bool,
    /// Allow postponing the takeoff while a later takeoff still lands on target.
    pub delay_takeoff: bool,

    /// Maximum distance between the predicted landing and the target to take off, in uu.
    pub max_distance_error: f64,
    /// Heading error below which the car counts as aligned with the target, in radians.
    pub max_alignment_angle: f64,
    /// Speed below which the car may take off without being aligned, in uu/s.
    pub slow_speed: f64,
    /// Ground distance to the target above which the delayed takeoff is checked, in uu.
    pub delay_min_ground_distance: f64,
    /// How far ahead the car is extrapolated for the delayed takeoff check, in seconds.
    pub probe_time: f64,
    /// Minimum speed assumed when extrapolating a slow car, in uu/s.
    pub probe_min_speed: f64,

    /// Distance the target is moved through the ball along the aim direction, in uu.
    pub target_offset: f64,
    /// Vertical component added to the ground direction when deriving the up vector.
    pub up_bias: f64,
    /// Angle between the nose and the required correction within which boost is used,
    /// in radians.
    pub angle_threshold: f64,

    /// Height above which the car rolls while flying, in uu.
    pub freestyle_min_height: f64,
    /// Remaining time below which the roof is turned straight down, in seconds.
    pub freestyle_cutoff_time: f64,
    /// Roll applied to the up vector every tick while freestyling, in radians.
    pub freestyle_roll: f64,
}

impl AerialSettings {
    /// Conservative preset for balls between 500 and 800 uu. Uses a single jump and
    /// waits for the latest possible takeoff.
    pub fn standard() -> Self {
        Self {
            min_height: 500.0,
            max_height: 800.0,
            min_height_time: 0.8,
            max_height_time: 1.5,
            double_jump: false,
            delay_takeoff: true,
            max_distance_error: 50.0,
            max_alignment_angle: 0.1,
            slow_speed: 1000.0,
            delay_min_ground_distance: 1000.0,
            probe_time: 0.5,
            probe_min_speed: 500.0,
            target_offset: 100.0,
            up_bias: 0.5,
            angle_threshold: 0.8,
            freestyle_min_height: 200.0,
            freestyle_cutoff_time: 0.7,
            freestyle_roll: 0.5,
        }
    }

    /// Aggressive preset for balls between 800 and 1800 uu. Uses a double jump and
    /// takes off as soon as the shot is on target.
    pub fn fast() -> Self {
        Self {
            min_height: 800.0,
            max_height: 1800.0,
            min_height_time: 1.3,
            max_height_time: 2.5,
            double_jump: true,
            delay_takeoff: false,
            ..Self::standard()
        }
    }

    /// Time the car needs before arrival to reach a ball at `height`.
    pub fn required_time(&self, height: f64) -> f64 {
        range_map(
            height,
            self.min_height,
            self.max_height,
            self.min_height_time,
            self.max_height_time,
        )
    }

    /// Whether an aerial at `height` with `slack` seconds to spare is worth attempting.
    pub fn is_feasible(&self, height: f64, slack: f64) -> bool {
        self.min_height < height && height < self.max_height && slack > self.required_time(height)
    }
}

impl Default for AerialSettings {
    fn default() -> Self {
        Self::standard()
    }
}

/// Settings for the flight prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionSettings {
    /// Simulation step of a prediction run, in seconds. Independent from the rate at
    /// which the skill itself is updated.
    pub step: f64,
    /// Hard cap on the number of steps of one prediction run.
    pub max_steps: usize,
    /// Boost amount the predicted car is refilled to before every step.
    pub boost_override: f64,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            step: 1.0 / 120.0,
            max_steps: 1200,
            boost_override: 100.0,
        }
    }
}

/// Settings for the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub standard_aerial: AerialSettings,
    pub fast_aerial: AerialSettings,
    pub prediction: PredictionSettings,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorSettings {
    pub fn new() -> Self {
        Self {
            standard_aerial: AerialSettings::standard(),
            fast_aerial: AerialSettings::fast(),
            prediction: PredictionSettings::default(),
        }
    }

    /// Load the executor settings from a file, or store the default settings if the file does not
    /// exist. Settings that fail to parse are replaced by the defaults.
    pub fn load_or_insert(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => Ok(settings),
                Err(err) => {
                    log::warn!("Failed to parse executor settings: {}", err);
                    Ok(Self::new())
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::new();
                settings.store(path)?;
                Ok(settings)
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read executor settings from {}", path.display())),
        }
    }

    /// Store the executor settings in the given file.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write executor settings to {}", path.display()))
    }
}
