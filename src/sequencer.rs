//! Transition Sequencer
//!
//! One FIFO worker per lane. A lane drains one task at a time: plan it, apply
//! each phase's effects, hold for the phase duration, then run cleanup. Tasks
//! for a busy lane wait their turn; they are never dropped and never run
//! side by side. The one exception is a countdown start, which bumps the
//! lane epoch: the active task aborts at its next hold (cleanup still runs)
//! and queued tasks from older epochs are skipped.

use crate::sink::DisplaySink;
use crate::store::{StatusBoard, TransitionStatus};
use crate::transition::{Plan, TransitionTask};
use crate::types::{Lane, TeamId};
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

struct Queued {
    task: TransitionTask,
    epoch: u64,
}

struct LaneHandle {
    tx: mpsc::UnboundedSender<Queued>,
    epoch: watch::Sender<u64>,
    worker: JoinHandle<()>,
}

impl LaneHandle {
    fn spawn(lane: Lane, sink: Arc<dyn DisplaySink>, board: StatusBoard) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (epoch, epoch_rx) = watch::channel(0);
        let worker = tokio::spawn(run_lane(lane, rx, epoch_rx, sink, board));
        tracing::debug!("Spawned transition lane {}", lane);
        Self { tx, epoch, worker }
    }
}

pub struct TransitionSequencer {
    sink: Arc<dyn DisplaySink>,
    board: StatusBoard,
    lanes: HashMap<Lane, LaneHandle>,
}

impl TransitionSequencer {
    /// Must be created inside a tokio runtime; lanes are spawned lazily.
    pub fn new(sink: Arc<dyn DisplaySink>, board: StatusBoard) -> Self {
        Self {
            sink,
            board,
            lanes: HashMap::new(),
        }
    }

    pub fn enqueue(&mut self, task: TransitionTask) {
        let lane = task.field.lane();
        let handle = self
            .lanes
            .entry(lane)
            .or_insert_with(|| LaneHandle::spawn(lane, self.sink.clone(), self.board.clone()));

        if task.kind.preempts() {
            handle.epoch.send_modify(|epoch| *epoch += 1);
            tracing::debug!("Lane {} preempted", lane);
        }
        let epoch = *handle.epoch.borrow();

        self.board.begin(lane);
        if handle.tx.send(Queued { task, epoch }).is_err() {
            tracing::warn!("Transition lane {} is gone, dropping task", lane);
            self.board.finish(lane);
        }
    }

    /// Drop idle score lanes for teams no longer in `scores`. Returns how many
    /// were retired. A lane still animating out is kept until a later call.
    pub fn retire_score_lanes(&mut self, scores: &BTreeMap<TeamId, i64>) -> usize {
        let before = self.lanes.len();
        let board = &self.board;
        // Closing the sender lets the idle worker return on its own
        self.lanes.retain(|lane, _| match lane {
            Lane::Score(team) => scores.contains_key(team) || board.pending(*lane) > 0,
            _ => true,
        });
        before - self.lanes.len()
    }

    pub fn status(&self, lane: Lane) -> TransitionStatus {
        self.board.status(lane)
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }
}

impl Drop for TransitionSequencer {
    fn drop(&mut self) {
        for handle in self.lanes.values() {
            handle.worker.abort();
        }
    }
}

async fn run_lane(
    lane: Lane,
    mut rx: mpsc::UnboundedReceiver<Queued>,
    mut epoch_rx: watch::Receiver<u64>,
    sink: Arc<dyn DisplaySink>,
    board: StatusBoard,
) {
    while let Some(Queued { task, epoch }) = rx.recv().await {
        let current = *epoch_rx.borrow_and_update();
        if epoch < current {
            tracing::debug!("Skipping superseded {:?} on lane {}", task.kind, lane);
            board.finish(lane);
            continue;
        }

        // A panicking task must neither kill the lane nor leave it counted as active
        let outcome = AssertUnwindSafe(run_task(lane, &task, &mut epoch_rx, sink.as_ref()))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            tracing::error!("Lane {} task {:?} panicked, skipping it", lane, task.kind);
        }
        board.finish(lane);
    }
    tracing::debug!("Transition lane {} retired", lane);
}

async fn run_task(
    lane: Lane,
    task: &TransitionTask,
    epoch_rx: &mut watch::Receiver<u64>,
    sink: &dyn DisplaySink,
) {
    let plan = {
        let mut rng = rand::rng();
        task.plan(&mut rng)
    };
    tracing::debug!(
        "Lane {} running {:?} after {:?} in queue",
        lane,
        task.kind,
        task.enqueued_at.elapsed()
    );

    if !run_phases(&plan, epoch_rx, sink).await {
        tracing::debug!("Lane {} task preempted, running cleanup", lane);
    }
    for effect in &plan.cleanup {
        sink.apply(effect);
    }
}

/// Returns false when a newer epoch interrupted the plan
async fn run_phases(
    plan: &Plan,
    epoch_rx: &mut watch::Receiver<u64>,
    sink: &dyn DisplaySink,
) -> bool {
    for phase in &plan.phases {
        for effect in &phase.effects {
            sink.apply(effect);
        }
        if phase.hold.is_zero() {
            continue;
        }
        tokio::select! {
            _ = tokio::time::sleep(phase.hold) => {}
            _ = epoch_rx.changed() => return false,
        }
    }
    true
}
