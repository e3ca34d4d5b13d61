//! Transition tasks and their timed phase plans
//!
//! A `TransitionTask` is the value handed from the reconciler to the
//! sequencer. Planning turns it into a finite list of named phases: each phase
//! applies its effects on entry and then holds for a fixed duration. Cleanup
//! effects always run after the last phase, or when the task is preempted.

use crate::types::{FieldId, RosterEntry, SoundCue, TeamId, UrgencyTier};
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

pub const SCORE_DURATION: Duration = Duration::from_millis(1000);
pub const SCORE_FRAME: Duration = Duration::from_millis(50);
pub const THEME_FADE: Duration = Duration::from_millis(400);
pub const EMPHASIS: Duration = Duration::from_millis(1000);
pub const QUESTION_FADE: Duration = Duration::from_millis(500);
pub const FINISH_FLASH: Duration = Duration::from_millis(2000);
pub const DICE_TICK: Duration = Duration::from_millis(100);
pub const DICE_FACES: usize = 10;

/// Countdown placeholder shown while no countdown is running
pub const COUNTDOWN_PLACEHOLDER: &str = "--";
pub const COUNTDOWN_STOPPED_NOTICE: &str = "Countdown stopped!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// `None` when the score did not move
    pub fn between(from: i64, to: i64) -> Option<Self> {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Some(Direction::Increase),
            std::cmp::Ordering::Less => Some(Direction::Decrease),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    ScoreChange {
        team: TeamId,
        from: i64,
        to: i64,
        direction: Direction,
    },
    RosterRefresh {
        entries: Vec<RosterEntry>,
    },
    ThemeChange {
        theme: String,
    },
    CountdownStart {
        seconds: u32,
    },
    CountdownTick {
        remaining: u32,
        total: u32,
    },
    CountdownReset,
    CountdownFinish,
    NewQuestion {
        question: String,
    },
    QuizCleared,
    RevealAnswer {
        answer: String,
    },
    DiceRoll {
        value: u8,
    },
}

impl TransitionKind {
    pub fn field(&self) -> FieldId {
        match self {
            TransitionKind::ScoreChange { team, .. } => FieldId::Score(*team),
            TransitionKind::RosterRefresh { .. } => FieldId::Roster,
            TransitionKind::ThemeChange { .. } => FieldId::Theme,
            TransitionKind::CountdownStart { .. }
            | TransitionKind::CountdownTick { .. }
            | TransitionKind::CountdownReset
            | TransitionKind::CountdownFinish => FieldId::Countdown,
            TransitionKind::NewQuestion { .. } | TransitionKind::QuizCleared => {
                FieldId::QuizQuestion
            }
            TransitionKind::RevealAnswer { .. } => FieldId::QuizAnswer,
            TransitionKind::DiceRoll { .. } => FieldId::Dice,
        }
    }

    /// A new countdown start discards whatever the countdown lane is doing
    pub fn preempts(&self) -> bool {
        matches!(self, TransitionKind::CountdownStart { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TransitionTask {
    pub field: FieldId,
    pub kind: TransitionKind,
    pub enqueued_at: Instant,
}

impl TransitionTask {
    pub fn new(kind: TransitionKind) -> Self {
        Self {
            field: kind.field(),
            kind,
            enqueued_at: Instant::now(),
        }
    }
}

/// Visual treatment that can be layered on a field; at most one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    ScoreUp,
    ScoreDown,
    Pulse,
    BounceIn,
    HeartBeat,
    Flash,
    Rolling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    Text(String),
    Emphasis(Emphasis),
    ClearEmphasis,
    FadeOut,
    FadeIn,
    Show,
    Hide,
    Urgency(UrgencyTier),
    /// Countdown arc fill in thousandths (1000 = full circle)
    Progress(u16),
    Roster(Vec<RosterEntry>),
}

impl RenderOp {
    pub fn progress(remaining: u32, total: u32) -> Self {
        if total == 0 {
            return RenderOp::Progress(0);
        }
        let permille = (u64::from(remaining.min(total)) * 1000) / u64::from(total);
        RenderOp::Progress(permille as u16)
    }
}

/// Outbound side effect produced by a phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Render(FieldId, RenderOp),
    Cue(SoundCue),
    Notice(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: &'static str,
    pub effects: Vec<Effect>,
    pub hold: Duration,
}

impl Phase {
    fn new(name: &'static str, effects: Vec<Effect>, hold: Duration) -> Self {
        Self {
            name,
            effects,
            hold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub phases: Vec<Phase>,
    pub cleanup: Vec<Effect>,
}

impl Plan {
    pub fn duration(&self) -> Duration {
        self.phases.iter().map(|p| p.hold).sum()
    }

    /// Every effect in the order a full run applies them
    pub fn effects(&self) -> impl Iterator<Item = &Effect> {
        self.phases
            .iter()
            .flat_map(|p| p.effects.iter())
            .chain(self.cleanup.iter())
    }
}

/// jQuery-style "swing" easing, floored to whole points and clamped to the
/// endpoints.
pub fn interpolate_score(from: i64, to: i64, progress: f64) -> i64 {
    let p = progress.clamp(0.0, 1.0);
    let eased = 0.5 - (p * std::f64::consts::PI).cos() / 2.0;
    // Span in f64: `to - from` can exceed i64 for opposite-signed extremes
    let span = to as f64 - from as f64;
    let value = (from as f64 + span * eased).floor() as i64;
    value.clamp(from.min(to), from.max(to))
}

impl TransitionTask {
    /// Expand into timed phases. `rng` only feeds decorative dice faces.
    pub fn plan<R: Rng>(&self, rng: &mut R) -> Plan {
        let field = self.field;
        let render = |op: RenderOp| Effect::Render(field, op);

        match &self.kind {
            TransitionKind::ScoreChange {
                from,
                to,
                direction,
                ..
            } => {
                let (emphasis, cue) = match direction {
                    Direction::Increase => (Emphasis::ScoreUp, SoundCue::ScoreUp),
                    Direction::Decrease => (Emphasis::ScoreDown, SoundCue::ScoreDown),
                };
                let frames = (SCORE_DURATION.as_millis() / SCORE_FRAME.as_millis()) as u32;

                let mut phases = vec![Phase::new(
                    "highlight",
                    vec![
                        render(RenderOp::Emphasis(emphasis)),
                        Effect::Cue(cue),
                        render(RenderOp::Text(from.to_string())),
                    ],
                    SCORE_FRAME,
                )];
                let mut shown = *from;
                for frame in 1..frames {
                    let value = interpolate_score(*from, *to, f64::from(frame) / f64::from(frames));
                    let effects = if value != shown {
                        shown = value;
                        vec![render(RenderOp::Text(value.to_string()))]
                    } else {
                        Vec::new()
                    };
                    phases.push(Phase::new("count", effects, SCORE_FRAME));
                }
                phases.push(Phase::new(
                    "settle",
                    vec![render(RenderOp::Text(to.to_string()))],
                    Duration::ZERO,
                ));

                Plan {
                    phases,
                    cleanup: vec![render(RenderOp::ClearEmphasis)],
                }
            }

            TransitionKind::RosterRefresh { entries } => Plan {
                phases: vec![Phase::new(
                    "render",
                    vec![render(RenderOp::Roster(entries.clone()))],
                    Duration::ZERO,
                )],
                cleanup: Vec::new(),
            },

            TransitionKind::ThemeChange { theme } => Plan {
                phases: vec![
                    Phase::new(
                        "fade-out",
                        vec![render(RenderOp::FadeOut), Effect::Cue(SoundCue::ThemeChange)],
                        THEME_FADE,
                    ),
                    Phase::new(
                        "fade-in",
                        vec![
                            render(RenderOp::Text(theme.clone())),
                            render(RenderOp::FadeIn),
                            render(RenderOp::Emphasis(Emphasis::Pulse)),
                        ],
                        THEME_FADE,
                    ),
                    Phase::new("pulse", Vec::new(), EMPHASIS - THEME_FADE),
                ],
                cleanup: vec![render(RenderOp::ClearEmphasis)],
            },

            TransitionKind::CountdownStart { seconds } => Plan {
                phases: vec![Phase::new(
                    "enter",
                    vec![
                        Effect::Render(FieldId::CountdownBanner, RenderOp::Hide),
                        render(RenderOp::Text(seconds.to_string())),
                        render(RenderOp::progress(*seconds, *seconds)),
                        render(RenderOp::Urgency(UrgencyTier::Normal)),
                        render(RenderOp::Emphasis(Emphasis::BounceIn)),
                        Effect::Cue(SoundCue::CountdownStart),
                    ],
                    EMPHASIS,
                )],
                cleanup: vec![render(RenderOp::ClearEmphasis)],
            },

            TransitionKind::CountdownTick { remaining, total } => {
                let tier = UrgencyTier::for_seconds(*remaining);
                let mut effects = vec![
                    render(RenderOp::Text(remaining.to_string())),
                    render(RenderOp::progress(*remaining, *total)),
                    render(RenderOp::Urgency(tier)),
                ];
                if tier == UrgencyTier::Urgent {
                    effects.push(render(RenderOp::Emphasis(Emphasis::HeartBeat)));
                    effects.push(Effect::Cue(SoundCue::Tick));
                } else {
                    effects.push(render(RenderOp::ClearEmphasis));
                }
                Plan {
                    phases: vec![Phase::new("tick", effects, Duration::ZERO)],
                    cleanup: Vec::new(),
                }
            }

            TransitionKind::CountdownReset => Plan {
                phases: vec![Phase::new(
                    "reset",
                    vec![
                        render(RenderOp::Text(COUNTDOWN_PLACEHOLDER.to_string())),
                        Effect::Render(FieldId::CountdownBanner, RenderOp::Hide),
                        render(RenderOp::Progress(1000)),
                        render(RenderOp::Urgency(UrgencyTier::Normal)),
                        render(RenderOp::ClearEmphasis),
                        Effect::Notice(COUNTDOWN_STOPPED_NOTICE.to_string()),
                    ],
                    Duration::ZERO,
                )],
                cleanup: Vec::new(),
            },

            TransitionKind::CountdownFinish => Plan {
                phases: vec![Phase::new(
                    "finish",
                    vec![
                        render(RenderOp::Text("0".to_string())),
                        render(RenderOp::Progress(0)),
                        render(RenderOp::Urgency(UrgencyTier::Urgent)),
                        render(RenderOp::ClearEmphasis),
                        Effect::Render(FieldId::CountdownBanner, RenderOp::Show),
                        Effect::Render(
                            FieldId::CountdownBanner,
                            RenderOp::Emphasis(Emphasis::Flash),
                        ),
                        Effect::Cue(SoundCue::CountdownEnd),
                    ],
                    FINISH_FLASH,
                )],
                cleanup: vec![Effect::Render(
                    FieldId::CountdownBanner,
                    RenderOp::ClearEmphasis,
                )],
            },

            TransitionKind::NewQuestion { question } => Plan {
                phases: vec![
                    Phase::new(
                        "fade-out",
                        vec![
                            Effect::Render(FieldId::QuizAnswer, RenderOp::Hide),
                            render(RenderOp::FadeOut),
                            Effect::Cue(SoundCue::NewQuestion),
                        ],
                        QUESTION_FADE,
                    ),
                    Phase::new(
                        "fade-in",
                        vec![
                            render(RenderOp::Text(question.clone())),
                            render(RenderOp::FadeIn),
                        ],
                        QUESTION_FADE,
                    ),
                ],
                cleanup: Vec::new(),
            },

            TransitionKind::QuizCleared => Plan {
                phases: vec![Phase::new(
                    "clear",
                    vec![
                        Effect::Render(FieldId::QuizAnswer, RenderOp::Hide),
                        Effect::Render(FieldId::QuizAnswer, RenderOp::Text(String::new())),
                        render(RenderOp::Text(String::new())),
                    ],
                    Duration::ZERO,
                )],
                cleanup: Vec::new(),
            },

            TransitionKind::RevealAnswer { answer } => Plan {
                phases: vec![Phase::new(
                    "reveal",
                    vec![
                        render(RenderOp::Text(answer.clone())),
                        render(RenderOp::Show),
                        render(RenderOp::Emphasis(Emphasis::BounceIn)),
                        Effect::Cue(SoundCue::AnswerReveal),
                    ],
                    EMPHASIS,
                )],
                cleanup: vec![render(RenderOp::ClearEmphasis)],
            },

            TransitionKind::DiceRoll { value } => {
                let mut phases = Vec::with_capacity(DICE_FACES + 1);
                for face in 0..DICE_FACES {
                    let mut effects = Vec::new();
                    if face == 0 {
                        effects.push(render(RenderOp::Emphasis(Emphasis::Rolling)));
                        effects.push(Effect::Cue(SoundCue::DiceRoll));
                    }
                    let shown: u8 = rng.random_range(1..=6);
                    effects.push(render(RenderOp::Text(shown.to_string())));
                    phases.push(Phase::new("spin", effects, DICE_TICK));
                }
                phases.push(Phase::new(
                    "commit",
                    vec![
                        render(RenderOp::Emphasis(Emphasis::BounceIn)),
                        render(RenderOp::Text(value.to_string())),
                    ],
                    EMPHASIS,
                ));
                Plan {
                    phases,
                    cleanup: vec![render(RenderOp::ClearEmphasis)],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn texts(plan: &Plan, field: FieldId) -> Vec<String> {
        plan.effects()
            .filter_map(|e| match e {
                Effect::Render(f, RenderOp::Text(t)) if *f == field => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn score_task(from: i64, to: i64) -> TransitionTask {
        let team = TeamId::new(1).unwrap();
        TransitionTask::new(TransitionKind::ScoreChange {
            team,
            from,
            to,
            direction: Direction::between(from, to).unwrap(),
        })
    }

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between(3, 7), Some(Direction::Increase));
        assert_eq!(Direction::between(7, 2), Some(Direction::Decrease));
        assert_eq!(Direction::between(4, 4), None);
    }

    #[test]
    fn test_score_interpolation_is_monotonic_and_snaps() {
        let task = score_task(3, 7);
        let plan = task.plan(&mut StdRng::seed_from_u64(1));
        let values: Vec<i64> = texts(&plan, task.field)
            .iter()
            .map(|t| t.parse().unwrap())
            .collect();

        assert_eq!(values.first(), Some(&3));
        assert_eq!(values.last(), Some(&7));
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
        assert_eq!(plan.duration(), SCORE_DURATION);
    }

    #[test]
    fn test_score_decrease_is_non_increasing() {
        let task = score_task(7, 2);
        let plan = task.plan(&mut StdRng::seed_from_u64(1));
        let values: Vec<i64> = texts(&plan, task.field)
            .iter()
            .map(|t| t.parse().unwrap())
            .collect();

        assert_eq!(values.last(), Some(&2));
        assert!(values.windows(2).all(|w| w[0] >= w[1]), "{:?}", values);
        assert!(plan
            .effects()
            .any(|e| *e == Effect::Cue(SoundCue::ScoreDown)));
    }

    #[test]
    fn test_interpolation_large_jump_stays_in_range() {
        for step in 0..=20 {
            let v = interpolate_score(-1000, 1_000_000, f64::from(step) / 20.0);
            assert!((-1000..=1_000_000).contains(&v));
        }
        assert_eq!(interpolate_score(3, 7, 1.0), 7);
        assert_eq!(interpolate_score(3, 7, 0.0), 3);
    }

    #[test]
    fn test_interpolation_spanning_full_i64_range() {
        for (from, to) in [(-1, i64::MAX), (i64::MIN, i64::MAX), (i64::MAX, i64::MIN)] {
            let mut prev = interpolate_score(from, to, 0.0);
            assert_eq!(prev, from);
            for step in 1..=20 {
                let v = interpolate_score(from, to, f64::from(step) / 20.0);
                assert!((from.min(to)..=from.max(to)).contains(&v));
                if to > from {
                    assert!(v >= prev);
                } else {
                    assert!(v <= prev);
                }
                prev = v;
            }
        }

        let plan = score_task(-1, i64::MAX).plan(&mut StdRng::seed_from_u64(3));
        let field = FieldId::Score(TeamId::new(1).unwrap());
        assert_eq!(texts(&plan, field).last().map(String::as_str), Some("9223372036854775807"));
    }

    #[test]
    fn test_score_plan_ends_with_cleared_emphasis() {
        let task = score_task(0, 1);
        let plan = task.plan(&mut StdRng::seed_from_u64(1));
        assert_eq!(
            plan.cleanup,
            vec![Effect::Render(task.field, RenderOp::ClearEmphasis)]
        );
    }

    #[test]
    fn test_theme_plan_phases() {
        let task = TransitionTask::new(TransitionKind::ThemeChange {
            theme: "Cinema".to_string(),
        });
        let plan = task.plan(&mut StdRng::seed_from_u64(1));
        let names: Vec<_> = plan.phases.iter().map(|p| p.name).collect();

        assert_eq!(names, vec!["fade-out", "fade-in", "pulse"]);
        assert_eq!(plan.phases[0].hold, THEME_FADE);
        assert_eq!(plan.phases[1].hold, THEME_FADE);
        assert_eq!(texts(&plan, FieldId::Theme), vec!["Cinema".to_string()]);
    }

    #[test]
    fn test_dice_spin_is_bounded_and_commits_value() {
        let task = TransitionTask::new(TransitionKind::DiceRoll { value: 4 });
        for seed in 0..20 {
            let plan = task.plan(&mut StdRng::seed_from_u64(seed));
            let faces = texts(&plan, FieldId::Dice);

            assert_eq!(faces.len(), DICE_FACES + 1);
            assert_eq!(faces.last().map(String::as_str), Some("4"));
            for face in &faces[..DICE_FACES] {
                let n: u8 = face.parse().unwrap();
                assert!((1..=6).contains(&n));
            }
        }
    }

    #[test]
    fn test_tick_urgency_effects() {
        let urgent = TransitionTask::new(TransitionKind::CountdownTick {
            remaining: 5,
            total: 30,
        })
        .plan(&mut StdRng::seed_from_u64(1));
        assert!(urgent
            .effects()
            .any(|e| *e == Effect::Render(FieldId::Countdown, RenderOp::Urgency(UrgencyTier::Urgent))));
        assert!(urgent.effects().any(|e| *e == Effect::Cue(SoundCue::Tick)));

        let warning = TransitionTask::new(TransitionKind::CountdownTick {
            remaining: 8,
            total: 30,
        })
        .plan(&mut StdRng::seed_from_u64(1));
        assert!(warning.effects().any(|e| *e
            == Effect::Render(FieldId::Countdown, RenderOp::Urgency(UrgencyTier::Warning))));
        assert!(!warning.effects().any(|e| *e == Effect::Cue(SoundCue::Tick)));
    }

    #[test]
    fn test_progress_permille() {
        assert_eq!(RenderOp::progress(30, 30), RenderOp::Progress(1000));
        assert_eq!(RenderOp::progress(15, 30), RenderOp::Progress(500));
        assert_eq!(RenderOp::progress(40, 30), RenderOp::Progress(1000));
        assert_eq!(RenderOp::progress(0, 0), RenderOp::Progress(0));
    }

    #[test]
    fn test_only_countdown_start_preempts() {
        assert!(TransitionKind::CountdownStart { seconds: 10 }.preempts());
        assert!(!TransitionKind::CountdownReset.preempts());
        assert!(!TransitionKind::DiceRoll { value: 1 }.preempts());
    }
}
