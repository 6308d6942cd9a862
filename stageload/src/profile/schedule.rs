//! Target concurrency as a function of elapsed run time

use std::time::Duration;

use super::types::{RampPolicy, RampProfile};

/// Where in the profile a point in time falls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StagePosition {
    /// Index of the active stage
    pub index: usize,
    /// Time already spent inside the active stage
    pub elapsed_in_stage: Duration,
    /// Target of the previous stage (0 before the first stage)
    pub start_target: u32,
    /// Target of the active stage
    pub end_target: u32,
    /// Duration of the active stage
    pub stage_duration: Duration,
}

impl StagePosition {
    /// Fraction of the active stage already elapsed, in `[0, 1)`
    pub fn progress(&self) -> f64 {
        self.elapsed_in_stage.as_secs_f64() / self.stage_duration.as_secs_f64()
    }
}

impl RampProfile {
    /// Locate the stage active at `elapsed`; `None` once the profile has run out
    ///
    /// Stage `i` covers the half-open window `[start_i, start_i + duration_i)`.
    pub(crate) fn position_at(&self, elapsed: Duration) -> Option<StagePosition> {
        let mut stage_start = Duration::ZERO;
        let mut start_target = 0;

        for (index, stage) in self.stages().iter().enumerate() {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                return Some(StagePosition {
                    index,
                    elapsed_in_stage: elapsed.saturating_sub(stage_start),
                    start_target,
                    end_target: stage.target,
                    stage_duration: stage.duration,
                });
            }
            stage_start = stage_end;
            start_target = stage.target;
        }

        None
    }

    /// Index of the stage active at `elapsed`
    pub fn stage_at(&self, elapsed: Duration) -> Option<usize> {
        self.position_at(elapsed).map(|p| p.index)
    }

    /// Desired virtual-user count at `elapsed`
    ///
    /// Past the end of the profile this is the final stage's target.
    pub fn target_at(&self, elapsed: Duration, policy: RampPolicy) -> u32 {
        let Some(position) = self.position_at(elapsed) else {
            return self.final_target();
        };

        match policy {
            RampPolicy::Step => position.end_target,
            RampPolicy::Linear => {
                let start = position.start_target as f64;
                let end = position.end_target as f64;
                let value = start + (end - start) * position.progress();
                value.round().clamp(0.0, u32::MAX as f64) as u32
            }
        }
    }

    /// Inclusive range the target may take anywhere inside stage `index`
    pub fn stage_bounds(&self, index: usize, policy: RampPolicy) -> Option<(u32, u32)> {
        let stage = self.stages().get(index)?;
        match policy {
            RampPolicy::Step => Some((stage.target, stage.target)),
            RampPolicy::Linear => {
                let previous = index
                    .checked_sub(1)
                    .map(|i| self.stages()[i].target)
                    .unwrap_or(0);
                Some((previous.min(stage.target), previous.max(stage.target)))
            }
        }
    }
}
