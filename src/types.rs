use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Opaque player identifier assigned by the game server
pub type PlayerId = String;

/// Team number as assigned by the game master.
///
/// Always positive: "no team" is `Option::<TeamId>::None`, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TeamId(NonZeroU32);

// JSON object keys arrive as strings, and internally tagged events buffer
// them before the key type sees them, so accept both strings and integers.
impl<'de> Deserialize<'de> for TeamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TeamIdVisitor;

        impl Visitor<'_> for TeamIdVisitor {
            type Value = TeamId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a positive team number")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TeamId, E> {
                u32::try_from(v)
                    .ok()
                    .and_then(TeamId::new)
                    .ok_or_else(|| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TeamId, E> {
                match u64::try_from(v) {
                    Ok(v) => self.visit_u64(v),
                    Err(_) => Err(E::invalid_value(Unexpected::Signed(v), &self)),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TeamId, E> {
                match v.trim().parse::<u64>() {
                    Ok(n) => self.visit_u64(n),
                    Err(_) => Err(E::invalid_value(Unexpected::Str(v), &self)),
                }
            }
        }

        deserializer.deserialize_any(TeamIdVisitor)
    }
}

impl TeamId {
    pub fn new(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    pub team: Option<TeamId>,
}

/// Countdown as last reported by the server. The client never extrapolates
/// time between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CountdownState {
    #[default]
    Idle,
    Running {
        remaining: u32,
        total: u32,
    },
    Stopped,
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizState {
    pub question: Option<String>,
    pub answer: Option<String>,
}

/// Three-level countdown styling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Normal,
    Warning,
    Urgent,
}

impl UrgencyTier {
    pub const URGENT_AT: u32 = 5;
    pub const WARNING_AT: u32 = 10;

    pub fn for_seconds(seconds: u32) -> Self {
        if seconds <= Self::URGENT_AT {
            UrgencyTier::Urgent
        } else if seconds <= Self::WARNING_AT {
            UrgencyTier::Warning
        } else {
            UrgencyTier::Normal
        }
    }
}

/// A displayable unit that receives render calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    Score(TeamId),
    Roster,
    Theme,
    Countdown,
    CountdownBanner,
    QuizQuestion,
    QuizAnswer,
    Dice,
}

impl FieldId {
    /// Sequencing lane that owns animations for this field
    pub fn lane(&self) -> Lane {
        match self {
            FieldId::Score(team) => Lane::Score(*team),
            FieldId::Roster => Lane::Roster,
            FieldId::Theme => Lane::Theme,
            FieldId::Countdown | FieldId::CountdownBanner => Lane::Countdown,
            FieldId::QuizQuestion | FieldId::QuizAnswer => Lane::Quiz,
            FieldId::Dice => Lane::Dice,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldId::Score(team) => write!(f, "score.team{}", team),
            FieldId::Roster => f.write_str("roster"),
            FieldId::Theme => f.write_str("theme"),
            FieldId::Countdown => f.write_str("countdown"),
            FieldId::CountdownBanner => f.write_str("countdown.banner"),
            FieldId::QuizQuestion => f.write_str("quiz.question"),
            FieldId::QuizAnswer => f.write_str("quiz.answer"),
            FieldId::Dice => f.write_str("dice"),
        }
    }
}

/// Unit of mutual exclusion for transitions: at most one active task per lane.
///
/// The quiz question and answer share a lane so a reveal never overlaps a
/// question fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Score(TeamId),
    Roster,
    Theme,
    Countdown,
    Quiz,
    Dice,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Score(team) => write!(f, "score.team{}", team),
            Lane::Roster => f.write_str("roster"),
            Lane::Theme => f.write_str("theme"),
            Lane::Countdown => f.write_str("countdown"),
            Lane::Quiz => f.write_str("quiz"),
            Lane::Dice => f.write_str("dice"),
        }
    }
}

/// Fixed set of audio cues the display can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundCue {
    CountdownStart,
    CountdownEnd,
    Tick,
    ScoreUp,
    ScoreDown,
    ThemeChange,
    NewQuestion,
    AnswerReveal,
    DiceRoll,
}

impl SoundCue {
    pub const ALL: [SoundCue; 9] = [
        SoundCue::CountdownStart,
        SoundCue::CountdownEnd,
        SoundCue::Tick,
        SoundCue::ScoreUp,
        SoundCue::ScoreDown,
        SoundCue::ThemeChange,
        SoundCue::NewQuestion,
        SoundCue::AnswerReveal,
        SoundCue::DiceRoll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCue::CountdownStart => "countdown-start",
            SoundCue::CountdownEnd => "countdown-end",
            SoundCue::Tick => "tick",
            SoundCue::ScoreUp => "score-up",
            SoundCue::ScoreDown => "score-down",
            SoundCue::ThemeChange => "theme-change",
            SoundCue::NewQuestion => "new-question",
            SoundCue::AnswerReveal => "answer-reveal",
            SoundCue::DiceRoll => "dice-roll",
        }
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the rendered player list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub username: String,
    pub team: Option<TeamId>,
}

impl RosterEntry {
    /// First character of the username, uppercased (avatar text)
    pub fn initial(&self) -> String {
        self.username
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    pub fn team_label(&self) -> String {
        match self.team {
            Some(team) => format!("Team {}", team),
            None => "Unassigned".to_string(),
        }
    }

    pub fn badge_class(&self) -> String {
        match self.team {
            Some(team) => format!("team-{}", team),
            None => "team-none".to_string(),
        }
    }
}
