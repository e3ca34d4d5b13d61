//! Display event loop
//!
//! Wires the pieces together: transport signals in, reconciler against the
//! store, resulting transitions onto the sequencer, effects out to the sink.
//! Events are handled strictly in delivery order.

use crate::error::{DisplayError, DisplayResult};
use crate::protocol::ServerEvent;
use crate::sequencer::TransitionSequencer;
use crate::sink::DisplaySink;
use crate::store::{DisplayState, DisplayStore, StatusBoard, TransitionStatus};
use crate::transport::{Transport, TransportSignal};
use crate::types::Lane;
use std::sync::Arc;

pub const CONNECTED_NOTICE: &str = "Connected to game server!";
pub const DISCONNECTED_NOTICE: &str = "Connection lost, reconnecting…";

pub struct Display {
    store: DisplayStore,
    sequencer: TransitionSequencer,
    sink: Arc<dyn DisplaySink>,
}

impl Display {
    /// Must be called inside a tokio runtime
    pub fn new(sink: Arc<dyn DisplaySink>) -> Self {
        let store = DisplayStore::init();
        let sequencer = TransitionSequencer::new(sink.clone(), store.board().clone());
        Self {
            store,
            sequencer,
            sink,
        }
    }

    pub fn state(&self) -> &DisplayState {
        self.store.state()
    }

    pub fn status(&self, lane: Lane) -> TransitionStatus {
        self.sequencer.status(lane)
    }

    pub fn board(&self) -> &StatusBoard {
        self.store.board()
    }

    /// Resolves once no transition is queued or running
    pub async fn settled(&self) {
        self.store.board().settled().await
    }

    /// Reconcile one event and enqueue its transitions.
    /// Returns how many transitions were enqueued.
    pub fn handle_event(&mut self, event: &ServerEvent) -> DisplayResult<usize> {
        let tasks = self.store.apply(event).inspect_err(|e| {
            tracing::warn!("Ignoring {} event: {}", event.kind(), e);
        })?;

        if tasks.is_empty() {
            tracing::debug!("{} produced no visible change", event.kind());
        } else {
            tracing::info!("{} -> {} transition(s)", event.kind(), tasks.len());
        }

        let count = tasks.len();
        for task in tasks {
            self.sequencer.enqueue(task);
        }

        let retired = self.sequencer.retire_score_lanes(&self.store.state().scores);
        if retired > 0 {
            tracing::debug!("Retired {} score lane(s) for departed teams", retired);
        }
        Ok(count)
    }

    pub fn handle_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::Connected => {
                tracing::info!("Connected to game server");
                self.sink.notice(CONNECTED_NOTICE);
            }
            TransportSignal::Disconnected { reason } => {
                let err = DisplayError::TransportDisruption(reason);
                tracing::warn!("{}", err);
                self.sink.notice(DISCONNECTED_NOTICE);
            }
            TransportSignal::Event(event) => {
                // Errors are already logged; the event is simply dropped
                let _ = self.handle_event(&event);
            }
            TransportSignal::Rejected(err) => {
                tracing::warn!("Ignoring undecodable frame: {}", err);
            }
        }
    }

    /// Consume signals until the transport shuts down
    pub async fn run<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        while let Some(signal) = transport.next_signal().await {
            self.handle_signal(signal);
        }
        tracing::info!("Transport closed, display loop finished");
    }
}
