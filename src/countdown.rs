//! Countdown Timer Controller
//!
//! Countdown events are edges of an explicit state machine rather than
//! independent deltas, because the visual treatment depends on which edge
//! was taken:
//!
//! ```text
//! Idle ──start──▶ Running ──stop──▶ Stopped
//!                   │  ▲ tick          │
//!                   │  └───────────────┤ start (from any state)
//!                   └──finish──▶ Finished
//! ```
//!
//! The server is the clock of record; nothing here measures elapsed time.

use crate::transition::TransitionKind;
use crate::types::CountdownState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEdge {
    Start(u32),
    Tick(u32),
    Stop,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownStep {
    pub state: CountdownState,
    /// `None` when the edge leaves the display unchanged (duplicate delivery)
    pub transition: Option<TransitionKind>,
}

impl CountdownStep {
    fn unchanged(state: CountdownState) -> Self {
        Self {
            state,
            transition: None,
        }
    }

    fn to(state: CountdownState, transition: TransitionKind) -> Self {
        Self {
            state,
            transition: Some(transition),
        }
    }
}

pub fn advance(current: CountdownState, edge: CountdownEdge) -> CountdownStep {
    match (current, edge) {
        // A repeated start for the same duration before any tick is a redelivery
        (CountdownState::Running { remaining, total }, CountdownEdge::Start(seconds))
            if remaining == seconds && total == seconds =>
        {
            tracing::debug!("Duplicate countdown start ({}s) ignored", seconds);
            CountdownStep::unchanged(current)
        }

        // Last start wins, whatever state we were in
        (_, CountdownEdge::Start(seconds)) => CountdownStep::to(
            CountdownState::Running {
                remaining: seconds,
                total: seconds,
            },
            TransitionKind::CountdownStart { seconds },
        ),

        (CountdownState::Running { remaining, total }, CountdownEdge::Tick(seconds)) => {
            if remaining == seconds {
                tracing::debug!("Duplicate countdown tick ({}s) ignored", seconds);
                return CountdownStep::unchanged(current);
            }
            let total = total.max(seconds);
            CountdownStep::to(
                CountdownState::Running {
                    remaining: seconds,
                    total,
                },
                TransitionKind::CountdownTick {
                    remaining: seconds,
                    total,
                },
            )
        }

        // Missed the start (reconnect or reordering): resume from this tick
        (_, CountdownEdge::Tick(seconds)) => {
            tracing::info!(
                "Countdown tick ({}s) received while {:?}, resuming as running",
                seconds,
                current
            );
            CountdownStep::to(
                CountdownState::Running {
                    remaining: seconds,
                    total: seconds,
                },
                TransitionKind::CountdownTick {
                    remaining: seconds,
                    total: seconds,
                },
            )
        }

        (CountdownState::Stopped, CountdownEdge::Stop) => CountdownStep::unchanged(current),
        (_, CountdownEdge::Stop) => {
            CountdownStep::to(CountdownState::Stopped, TransitionKind::CountdownReset)
        }

        (CountdownState::Finished, CountdownEdge::Finish) => CountdownStep::unchanged(current),
        (_, CountdownEdge::Finish) => {
            CountdownStep::to(CountdownState::Finished, TransitionKind::CountdownFinish)
        }
    }
}
