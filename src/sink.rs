//! Outbound side effects: render calls, audio cues and transient notices
//!
//! The rendering surface itself is external. `TracingSink` logs every effect
//! (headless monitor mode), `RecordingSink` keeps them for inspection.

use crate::transition::{Effect, RenderOp};
use crate::types::{FieldId, SoundCue};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

pub trait DisplaySink: Send + Sync {
    fn render(&self, field: FieldId, op: &RenderOp);

    /// Fire-and-forget; no completion is awaited
    fn cue(&self, cue: SoundCue);

    fn notice(&self, text: &str);

    fn apply(&self, effect: &Effect) {
        match effect {
            Effect::Render(field, op) => self.render(*field, op),
            Effect::Cue(cue) => self.cue(*cue),
            Effect::Notice(text) => self.notice(text),
        }
    }
}

/// Logs every effect at info level
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    muted: bool,
}

impl TracingSink {
    pub fn new(muted: bool) -> Self {
        Self { muted }
    }
}

impl DisplaySink for TracingSink {
    fn render(&self, field: FieldId, op: &RenderOp) {
        match op {
            RenderOp::Roster(entries) => {
                let rows: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{} [{}] {}", e.initial(), e.team_label(), e.username))
                    .collect();
                tracing::info!("render {}: {}", field, rows.join(", "));
            }
            other => tracing::info!("render {}: {:?}", field, other),
        }
    }

    fn cue(&self, cue: SoundCue) {
        if self.muted {
            tracing::debug!("cue {} (muted)", cue);
        } else {
            tracing::info!("cue {}", cue);
        }
    }

    fn notice(&self, text: &str) {
        tracing::info!("notice: {}", text);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub at: Instant,
    pub effect: Effect,
}

/// Keeps every effect with the (tokio) time it was applied
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Recorded>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, effect: Effect) {
        self.lock().push(Recorded {
            at: Instant::now(),
            effect,
        });
    }

    pub fn records(&self) -> Vec<Recorded> {
        self.lock().clone()
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.lock().iter().map(|r| r.effect.clone()).collect()
    }

    /// All render ops applied to one field, in order
    pub fn renders(&self, field: FieldId) -> Vec<RenderOp> {
        self.lock()
            .iter()
            .filter_map(|r| match &r.effect {
                Effect::Render(f, op) if *f == field => Some(op.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self, field: FieldId) -> Vec<String> {
        self.renders(field)
            .into_iter()
            .filter_map(|op| match op {
                RenderOp::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, field: FieldId) -> Option<String> {
        self.texts(field).pop()
    }

    pub fn cues(&self) -> Vec<SoundCue> {
        self.lock()
            .iter()
            .filter_map(|r| match r.effect {
                Effect::Cue(cue) => Some(cue),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|r| match &r.effect {
                Effect::Notice(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl DisplaySink for RecordingSink {
    fn render(&self, field: FieldId, op: &RenderOp) {
        self.push(Effect::Render(field, op.clone()));
    }

    fn cue(&self, cue: SoundCue) {
        self.push(Effect::Cue(cue));
    }

    fn notice(&self, text: &str) {
        self.push(Effect::Notice(text.to_string()));
    }
}
