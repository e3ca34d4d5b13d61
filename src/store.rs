//! Display State Store
//!
//! Single owner of the last-known value of every displayable field. The only
//! way to change it is `DisplayStore::apply`, which runs the reconciler and
//! commits its result. Per-lane transition status lives on a `StatusBoard`
//! that the sequencer updates as tasks are queued and completed.

use crate::error::DisplayResult;
use crate::protocol::ServerEvent;
use crate::reconcile;
use crate::transition::TransitionTask;
use crate::types::{CountdownState, Lane, PlayerId, PlayerInfo, QuizState, TeamId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub scores: BTreeMap<TeamId, i64>,
    pub roster: BTreeMap<PlayerId, PlayerInfo>,
    pub theme: String,
    pub countdown: CountdownState,
    pub quiz: QuizState,
    pub dice: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    Idle,
    Animating,
}

/// Count of queued-or-active transitions per lane
#[derive(Debug, Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<BTreeMap<Lane, usize>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BTreeMap::new());
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn begin(&self, lane: Lane) {
        self.tx.send_modify(|lanes| *lanes.entry(lane).or_insert(0) += 1);
    }

    pub(crate) fn finish(&self, lane: Lane) {
        self.tx.send_modify(|lanes| {
            if let Some(count) = lanes.get_mut(&lane) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    lanes.remove(&lane);
                }
            }
        });
    }

    pub fn pending(&self, lane: Lane) -> usize {
        self.tx.borrow().get(&lane).copied().unwrap_or(0)
    }

    pub fn status(&self, lane: Lane) -> TransitionStatus {
        if self.pending(lane) > 0 {
            TransitionStatus::Animating
        } else {
            TransitionStatus::Idle
        }
    }

    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Resolves once every lane is idle
    pub async fn settled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|lanes| lanes.is_empty()).await;
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DisplayStore {
    state: DisplayState,
    board: StatusBoard,
}

impl DisplayStore {
    /// Fresh store with all-empty defaults. There is no teardown.
    pub fn init() -> Self {
        Self {
            state: DisplayState::default(),
            board: StatusBoard::new(),
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn status(&self, lane: Lane) -> TransitionStatus {
        self.board.status(lane)
    }

    /// Reconcile one event against the current state and commit the result.
    /// On error nothing is committed.
    pub fn apply(&mut self, event: &ServerEvent) -> DisplayResult<Vec<TransitionTask>> {
        let reconciled = reconcile::reconcile(&self.state, event)?;
        self.state = reconciled.state;
        Ok(reconciled.tasks)
    }
}
