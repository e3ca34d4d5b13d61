use crate::error::DisplayResult;
use crate::types::{PlayerId, TeamId};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Events pushed by the game server, one JSON text frame each
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full snapshot of scores and roster (never a diff)
    TeamsUpdated {
        scores: BTreeMap<TeamId, i64>,
        players: BTreeMap<PlayerId, WirePlayer>,
    },
    RouletteResult {
        theme: String,
    },
    CountdownStarted {
        seconds: u32,
    },
    CountdownTick {
        seconds: u32,
    },
    CountdownStopped,
    CountdownFinished,
    QuizQuestion {
        question: String,
    },
    QuizAnswer {
        answer: String,
    },
    /// Range is checked by the reconciler, not the decoder
    DiceResult {
        value: i64,
    },
}

/// Player as sent by the server. `team` may be null, absent, or the legacy `0`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WirePlayer {
    pub username: String,
    #[serde(default)]
    pub team: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TeamsUpdated,
    RouletteResult,
    CountdownStarted,
    CountdownTick,
    CountdownStopped,
    CountdownFinished,
    QuizQuestion,
    QuizAnswer,
    DiceResult,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TeamsUpdated => "teams_updated",
            EventKind::RouletteResult => "roulette_result",
            EventKind::CountdownStarted => "countdown_started",
            EventKind::CountdownTick => "countdown_tick",
            EventKind::CountdownStopped => "countdown_stopped",
            EventKind::CountdownFinished => "countdown_finished",
            EventKind::QuizQuestion => "quiz_question",
            EventKind::QuizAnswer => "quiz_answer",
            EventKind::DiceResult => "dice_result",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServerEvent {
    /// Decode one text frame. Unknown kinds and bad payloads are `MalformedPayload`.
    pub fn decode(text: &str) -> DisplayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::TeamsUpdated { .. } => EventKind::TeamsUpdated,
            ServerEvent::RouletteResult { .. } => EventKind::RouletteResult,
            ServerEvent::CountdownStarted { .. } => EventKind::CountdownStarted,
            ServerEvent::CountdownTick { .. } => EventKind::CountdownTick,
            ServerEvent::CountdownStopped => EventKind::CountdownStopped,
            ServerEvent::CountdownFinished => EventKind::CountdownFinished,
            ServerEvent::QuizQuestion { .. } => EventKind::QuizQuestion,
            ServerEvent::QuizAnswer { .. } => EventKind::QuizAnswer,
            ServerEvent::DiceResult { .. } => EventKind::DiceResult,
        }
    }
}
