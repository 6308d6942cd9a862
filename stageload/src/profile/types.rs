//! Stage, profile and policy types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::duration::{MAX_DURATION, parse_duration};

/// Errors raised while building or parsing a ramp profile
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Ramp profile has no stages")]
    Empty,

    #[error("Stage {index} must have a positive duration")]
    NonPositiveDuration { index: usize },

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("Duration {0:?} is longer than one year")]
    DurationTooLong(String),

    #[error("Ramp profile is longer than one year")]
    ProfileTooLong,

    #[error("Negative duration: {0:?}")]
    NegativeDuration(String),

    #[error("Invalid stage {0:?} (expected <target>:<duration>, e.g. 10:1m)")]
    InvalidStage(String),

    #[error("Unknown ramp policy: {0:?} (expected \"step\" or \"linear\")")]
    UnknownPolicy(String),
}

/// One time-boxed segment of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Virtual users to reach during this stage
    pub target: u32,
    /// How long the stage lasts
    #[serde(with = "super::duration::human")]
    pub duration: Duration,
}

impl Stage {
    pub fn new(target: u32, duration: Duration) -> Self {
        Self { target, duration }
    }
}

impl FromStr for Stage {
    type Err = ProfileError;

    /// Parse the compact `<target>:<duration>` form, e.g. `"10:1m"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, duration) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ProfileError::InvalidStage(s.to_string()))?;
        let target = target
            .trim()
            .parse()
            .map_err(|_| ProfileError::InvalidStage(s.to_string()))?;
        let duration = parse_duration(duration)?;
        Ok(Self { target, duration })
    }
}

/// How concurrency moves between consecutive stage targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RampPolicy {
    /// Jump to the stage target as soon as the stage starts
    Step,
    /// Interpolate from the previous target to the stage target over the stage
    #[default]
    Linear,
}

impl RampPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RampPolicy::Step => "step",
            RampPolicy::Linear => "linear",
        }
    }
}

impl fmt::Display for RampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RampPolicy {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "step" => Ok(RampPolicy::Step),
            "linear" => Ok(RampPolicy::Linear),
            _ => Err(ProfileError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Ordered, validated sequence of stages
///
/// A profile always has at least one stage and every stage has a positive
/// duration; construction goes through [`RampProfile::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RampProfile {
    stages: Vec<Stage>,
}

impl RampProfile {
    /// Validate and build a profile
    pub fn new(stages: Vec<Stage>) -> Result<Self, ProfileError> {
        if stages.is_empty() {
            return Err(ProfileError::Empty);
        }
        if let Some(index) = stages.iter().position(|s| s.duration.is_zero()) {
            return Err(ProfileError::NonPositiveDuration { index });
        }
        stages
            .iter()
            .try_fold(Duration::ZERO, |total, s| total.checked_add(s.duration))
            .filter(|total| *total <= MAX_DURATION)
            .ok_or(ProfileError::ProfileTooLong)?;
        Ok(Self { stages })
    }

    /// Parse a comma-separated list of `<target>:<duration>` stages
    pub fn parse_compact(spec: &str) -> Result<Self, ProfileError> {
        let stages = spec
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Stage>, _>>()?;
        Self::new(stages)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum of all stage durations
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.duration))
    }

    /// Highest target across all stages
    pub fn peak_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Target of the last stage, i.e. the concurrency the run ends at
    pub fn final_target(&self) -> u32 {
        self.stages.last().map(|s| s.target).unwrap_or(0)
    }
}

impl Default for RampProfile {
    /// Low → high → low traffic over six one-minute stages
    fn default() -> Self {
        let minute = Duration::from_secs(60);
        Self {
            stages: [5, 10, 15, 10, 5, 0]
                .into_iter()
                .map(|target| Stage::new(target, minute))
                .collect(),
        }
    }
}
