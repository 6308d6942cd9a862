//! Driver lifecycle
//!
//! `Idle → Ramping(0) → … → Ramping(n-1) → Draining → Done`. Transitions are
//! driven by elapsed time; cancellation jumps straight to `Draining`.

/// Lifecycle state of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Idle,
    /// Executing stage `stage` of the profile
    Ramping { stage: usize },
    /// No new iterations start; in-flight ones complete
    Draining,
    Done,
}

impl DriverState {
    pub fn name(&self) -> &'static str {
        match self {
            DriverState::Idle => "idle",
            DriverState::Ramping { .. } => "ramping",
            DriverState::Draining => "draining",
            DriverState::Done => "done",
        }
    }

    /// Next state given the stage active now (`None` once the profile ran out)
    ///
    /// Stages only move forward, and a draining or finished driver never
    /// returns to ramping.
    pub fn advance(self, active_stage: Option<usize>, cancelled: bool) -> Self {
        match self {
            DriverState::Draining | DriverState::Done => self,
            _ if cancelled => DriverState::Draining,
            DriverState::Idle | DriverState::Ramping { .. } => match active_stage {
                Some(stage) => match self {
                    DriverState::Ramping { stage: current } if current > stage => self,
                    _ => DriverState::Ramping { stage },
                },
                None => DriverState::Draining,
            },
        }
    }

    /// Draining finishes into `Done`; other states are unchanged
    pub fn finish(self) -> Self {
        match self {
            DriverState::Draining => DriverState::Done,
            other => other,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, DriverState::Done)
    }
}

/// What the driver is doing right now, published on every control tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverStatus {
    pub state: DriverState,
    /// Concurrency the profile asks for at this tick
    pub target: u32,
    /// Virtual users currently running (retired users excluded)
    pub active: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut state = DriverState::Idle;
        state = state.advance(Some(0), false);
        assert_eq!(state, DriverState::Ramping { stage: 0 });
        state = state.advance(Some(1), false);
        assert_eq!(state, DriverState::Ramping { stage: 1 });
        state = state.advance(None, false);
        assert_eq!(state, DriverState::Draining);
        state = state.finish();
        assert_eq!(state, DriverState::Done);
        assert!(state.is_done());
    }

    #[test]
    fn test_cancellation_drains_from_any_running_state() {
        assert_eq!(
            DriverState::Idle.advance(Some(0), true),
            DriverState::Draining
        );
        assert_eq!(
            DriverState::Ramping { stage: 3 }.advance(Some(3), true),
            DriverState::Draining
        );
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        assert_eq!(
            DriverState::Draining.advance(Some(0), false),
            DriverState::Draining
        );
        assert_eq!(DriverState::Done.advance(Some(0), false), DriverState::Done);
        assert_eq!(DriverState::Done.finish(), DriverState::Done);
        assert_eq!(
            DriverState::Ramping { stage: 0 }.finish(),
            DriverState::Ramping { stage: 0 }
        );
    }

    #[test]
    fn test_stages_never_move_backwards() {
        assert_eq!(
            DriverState::Ramping { stage: 2 }.advance(Some(1), false),
            DriverState::Ramping { stage: 2 }
        );
    }
}
