// Public API for integration tests and the display binary

pub mod config;
pub mod countdown;
pub mod display;
pub mod error;
pub mod protocol;
pub mod reconcile;
pub mod sequencer;
pub mod sink;
pub mod store;
pub mod transition;
pub mod transport;
pub mod types;
