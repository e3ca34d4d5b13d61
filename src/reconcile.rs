//! Event Reconciler
//!
//! One pure function per event kind: `(prior state, payload) -> (next state,
//! transitions)`. A transition is emitted only when the reconciled value
//! differs from the prior one, which is what makes redelivered events silent.

use crate::countdown::{self, CountdownEdge};
use crate::error::{DisplayError, DisplayResult};
use crate::protocol::{ServerEvent, WirePlayer};
use crate::store::DisplayState;
use crate::transition::{Direction, TransitionKind, TransitionTask};
use crate::types::{PlayerId, PlayerInfo, QuizState, RosterEntry, TeamId};
use std::collections::{BTreeMap, BTreeSet};

pub const DICE_RANGE: std::ops::RangeInclusive<i64> = 1..=6;

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub state: DisplayState,
    pub tasks: Vec<TransitionTask>,
}

impl Reconciled {
    fn unchanged(prior: &DisplayState) -> Self {
        Self {
            state: prior.clone(),
            tasks: Vec::new(),
        }
    }

    fn with(state: DisplayState, kinds: Vec<TransitionKind>) -> Self {
        Self {
            state,
            tasks: kinds.into_iter().map(TransitionTask::new).collect(),
        }
    }
}

pub fn reconcile(prior: &DisplayState, event: &ServerEvent) -> DisplayResult<Reconciled> {
    match event {
        ServerEvent::TeamsUpdated { scores, players } => teams_updated(prior, scores, players),
        ServerEvent::RouletteResult { theme } => Ok(roulette_result(prior, theme)),
        ServerEvent::CountdownStarted { seconds } => {
            Ok(countdown(prior, CountdownEdge::Start(*seconds)))
        }
        ServerEvent::CountdownTick { seconds } => Ok(countdown(prior, CountdownEdge::Tick(*seconds))),
        ServerEvent::CountdownStopped => Ok(countdown(prior, CountdownEdge::Stop)),
        ServerEvent::CountdownFinished => Ok(countdown(prior, CountdownEdge::Finish)),
        ServerEvent::QuizQuestion { question } => Ok(quiz_question(prior, question)),
        ServerEvent::QuizAnswer { answer } => quiz_answer(prior, answer),
        ServerEvent::DiceResult { value } => dice_result(prior, *value),
    }
}

/// Normalize a wire team number. Null and the legacy `0` both mean unassigned.
fn normalize_team(player_id: &str, team: Option<i64>) -> DisplayResult<Option<TeamId>> {
    match team {
        None => Ok(None),
        Some(0) => {
            tracing::debug!("Player {} has team 0, treating as unassigned", player_id);
            Ok(None)
        }
        Some(n) => u32::try_from(n)
            .ok()
            .and_then(TeamId::new)
            .map(Some)
            .ok_or_else(|| {
                DisplayError::MalformedPayload(format!(
                    "player {} has invalid team number {}",
                    player_id, n
                ))
            }),
    }
}

/// Display order: team ascending with unassigned last, then username, then id
pub fn roster_order(roster: &BTreeMap<PlayerId, PlayerInfo>) -> Vec<RosterEntry> {
    let mut entries: Vec<RosterEntry> = roster
        .iter()
        .map(|(id, info)| RosterEntry {
            player_id: id.clone(),
            username: info.username.clone(),
            team: info.team,
        })
        .collect();

    entries.sort_by(|a, b| {
        (a.team.is_none(), a.team, &a.username, &a.player_id).cmp(&(
            b.team.is_none(),
            b.team,
            &b.username,
            &b.player_id,
        ))
    });
    entries
}

/// Snapshot replace of scores and roster. Unknown teams count as 0.
pub fn teams_updated(
    prior: &DisplayState,
    scores: &BTreeMap<TeamId, i64>,
    players: &BTreeMap<PlayerId, WirePlayer>,
) -> DisplayResult<Reconciled> {
    let mut roster = BTreeMap::new();
    for (id, player) in players {
        let team = normalize_team(id, player.team)?;
        roster.insert(
            id.clone(),
            PlayerInfo {
                username: player.username.clone(),
                team,
            },
        );
    }

    let teams: BTreeSet<TeamId> = prior.scores.keys().chain(scores.keys()).copied().collect();
    let mut kinds = Vec::new();
    for team in teams {
        let from = prior.scores.get(&team).copied().unwrap_or(0);
        let to = scores.get(&team).copied().unwrap_or(0);
        if let Some(direction) = Direction::between(from, to) {
            kinds.push(TransitionKind::ScoreChange {
                team,
                from,
                to,
                direction,
            });
        }
    }

    kinds.push(TransitionKind::RosterRefresh {
        entries: roster_order(&roster),
    });

    let state = DisplayState {
        scores: scores.clone(),
        roster,
        ..prior.clone()
    };
    Ok(Reconciled::with(state, kinds))
}

pub fn roulette_result(prior: &DisplayState, theme: &str) -> Reconciled {
    if prior.theme == theme {
        tracing::debug!("Theme unchanged ({}), no transition", theme);
        return Reconciled::unchanged(prior);
    }
    let state = DisplayState {
        theme: theme.to_string(),
        ..prior.clone()
    };
    Reconciled::with(
        state,
        vec![TransitionKind::ThemeChange {
            theme: theme.to_string(),
        }],
    )
}

pub fn countdown(prior: &DisplayState, edge: CountdownEdge) -> Reconciled {
    let step = countdown::advance(prior.countdown, edge);
    let state = DisplayState {
        countdown: step.state,
        ..prior.clone()
    };
    Reconciled::with(state, step.transition.into_iter().collect())
}

/// A blank question (sent on game reset) clears the quiz panel
pub fn quiz_question(prior: &DisplayState, question: &str) -> Reconciled {
    if question.trim().is_empty() {
        if prior.quiz == QuizState::default() {
            return Reconciled::unchanged(prior);
        }
        let state = DisplayState {
            quiz: QuizState::default(),
            ..prior.clone()
        };
        return Reconciled::with(state, vec![TransitionKind::QuizCleared]);
    }

    if prior.quiz.question.as_deref() == Some(question) && prior.quiz.answer.is_none() {
        tracing::debug!("Question already displayed, no transition");
        return Reconciled::unchanged(prior);
    }

    let state = DisplayState {
        quiz: QuizState {
            question: Some(question.to_string()),
            answer: None,
        },
        ..prior.clone()
    };
    Reconciled::with(
        state,
        vec![TransitionKind::NewQuestion {
            question: question.to_string(),
        }],
    )
}

pub fn quiz_answer(prior: &DisplayState, answer: &str) -> DisplayResult<Reconciled> {
    if prior.quiz.question.is_none() {
        return Err(DisplayError::InvalidSequence(
            "answer received with no active question".to_string(),
        ));
    }
    if prior.quiz.answer.as_deref() == Some(answer) {
        tracing::debug!("Answer already revealed, no transition");
        return Ok(Reconciled::unchanged(prior));
    }

    let state = DisplayState {
        quiz: QuizState {
            question: prior.quiz.question.clone(),
            answer: Some(answer.to_string()),
        },
        ..prior.clone()
    };
    Ok(Reconciled::with(
        state,
        vec![TransitionKind::RevealAnswer {
            answer: answer.to_string(),
        }],
    ))
}

pub fn dice_result(prior: &DisplayState, value: i64) -> DisplayResult<Reconciled> {
    if !DICE_RANGE.contains(&value) {
        return Err(DisplayError::InvalidSequence(format!(
            "dice value {} outside 1-6",
            value
        )));
    }
    // Range checked above
    let value = value as u8;
    if prior.dice == Some(value) {
        tracing::debug!("Dice already shows {}, no transition", value);
        return Ok(Reconciled::unchanged(prior));
    }

    let state = DisplayState {
        dice: Some(value),
        ..prior.clone()
    };
    Ok(Reconciled::with(state, vec![TransitionKind::DiceRoll { value }]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CountdownState;

    fn team(n: u32) -> TeamId {
        TeamId::new(n).unwrap()
    }

    fn wire(username: &str, team: Option<i64>) -> WirePlayer {
        WirePlayer {
            username: username.to_string(),
            team,
        }
    }

    fn teams_event(scores: &[(u32, i64)], players: &[(&str, &str, Option<i64>)]) -> ServerEvent {
        ServerEvent::TeamsUpdated {
            scores: scores.iter().map(|(t, s)| (team(*t), *s)).collect(),
            players: players
                .iter()
                .map(|(id, name, t)| (id.to_string(), wire(name, *t)))
                .collect(),
        }
    }

    fn kinds(reconciled: &Reconciled) -> Vec<TransitionKind> {
        reconciled.tasks.iter().map(|t| t.kind.clone()).collect()
    }

    fn score_changes(reconciled: &Reconciled) -> Vec<TransitionKind> {
        kinds(reconciled)
            .into_iter()
            .filter(|k| matches!(k, TransitionKind::ScoreChange { .. }))
            .collect()
    }

    #[test]
    fn test_teams_updated_emits_score_changes() {
        let event = teams_event(&[(1, 3), (2, 0)], &[("A", "Ann", Some(1))]);
        let result = reconcile(&DisplayState::default(), &event).unwrap();

        assert_eq!(
            score_changes(&result),
            vec![TransitionKind::ScoreChange {
                team: team(1),
                from: 0,
                to: 3,
                direction: Direction::Increase,
            }]
        );
        assert_eq!(result.state.scores.get(&team(1)), Some(&3));
        assert_eq!(result.state.roster["A"].team, Some(team(1)));
    }

    #[test]
    fn test_teams_updated_is_idempotent() {
        let event = teams_event(&[(1, 5), (2, 2)], &[("A", "Ann", Some(1))]);
        let first = reconcile(&DisplayState::default(), &event).unwrap();
        let second = reconcile(&first.state, &event).unwrap();

        assert_eq!(first.state, second.state);
        assert!(score_changes(&second).is_empty());
        // Roster re-render is always emitted and harmless
        assert!(matches!(
            kinds(&second).as_slice(),
            [TransitionKind::RosterRefresh { .. }]
        ));
    }

    #[test]
    fn test_teams_updated_replaces_wholesale() {
        let first = reconcile(
            &DisplayState::default(),
            &teams_event(&[(1, 4)], &[("A", "Ann", Some(1)), ("B", "Bob", None)]),
        )
        .unwrap();
        let second =
            reconcile(&first.state, &teams_event(&[(2, 1)], &[("C", "Cy", Some(2))])).unwrap();

        assert!(!second.state.roster.contains_key("A"));
        assert!(!second.state.scores.contains_key(&team(1)));
        assert_eq!(
            score_changes(&second),
            vec![
                TransitionKind::ScoreChange {
                    team: team(1),
                    from: 4,
                    to: 0,
                    direction: Direction::Decrease,
                },
                TransitionKind::ScoreChange {
                    team: team(2),
                    from: 0,
                    to: 1,
                    direction: Direction::Increase,
                },
            ]
        );
    }

    #[test]
    fn test_team_zero_is_unassigned_and_negative_is_malformed() {
        let result = reconcile(
            &DisplayState::default(),
            &teams_event(&[], &[("A", "Ann", Some(0))]),
        )
        .unwrap();
        assert_eq!(result.state.roster["A"].team, None);

        let prior = result.state.clone();
        let err = reconcile(&prior, &teams_event(&[(1, 9)], &[("A", "Ann", Some(-2))]));
        assert!(matches!(err, Err(DisplayError::MalformedPayload(_))));
    }

    #[test]
    fn test_roster_order() {
        let mut roster = BTreeMap::new();
        roster.insert(
            "p1".to_string(),
            PlayerInfo {
                username: "Bob".to_string(),
                team: Some(team(2)),
            },
        );
        roster.insert(
            "p2".to_string(),
            PlayerInfo {
                username: "Ann".to_string(),
                team: None,
            },
        );
        roster.insert(
            "p3".to_string(),
            PlayerInfo {
                username: "Zoe".to_string(),
                team: Some(team(1)),
            },
        );
        roster.insert(
            "p4".to_string(),
            PlayerInfo {
                username: "Abe".to_string(),
                team: Some(team(2)),
            },
        );

        let names: Vec<_> = roster_order(&roster)
            .into_iter()
            .map(|e| e.username)
            .collect();
        assert_eq!(names, vec!["Zoe", "Abe", "Bob", "Ann"]);
    }

    #[test]
    fn test_roulette_result_only_on_change() {
        let changed = roulette_result(&DisplayState::default(), "Sport");
        assert_eq!(
            kinds(&changed),
            vec![TransitionKind::ThemeChange {
                theme: "Sport".to_string()
            }]
        );

        let same = roulette_result(&changed.state, "Sport");
        assert!(same.tasks.is_empty());
        assert_eq!(same.state.theme, "Sport");
    }

    #[test]
    fn test_countdown_events_route_through_controller() {
        let started = reconcile(
            &DisplayState::default(),
            &ServerEvent::CountdownStarted { seconds: 30 },
        )
        .unwrap();
        let restarted =
            reconcile(&started.state, &ServerEvent::CountdownStarted { seconds: 10 }).unwrap();
        assert_eq!(
            restarted.state.countdown,
            CountdownState::Running {
                remaining: 10,
                total: 10
            }
        );

        let healed = reconcile(
            &DisplayState::default(),
            &ServerEvent::CountdownTick { seconds: 5 },
        )
        .unwrap();
        assert_eq!(
            healed.state.countdown,
            CountdownState::Running {
                remaining: 5,
                total: 5
            }
        );
    }

    #[test]
    fn test_quiz_question_resets_answer() {
        let prior = DisplayState {
            quiz: QuizState {
                question: Some("Capital of France?".to_string()),
                answer: Some("Paris".to_string()),
            },
            ..DisplayState::default()
        };
        let result = quiz_question(&prior, "Capital of Italy?");

        assert_eq!(
            result.state.quiz,
            QuizState {
                question: Some("Capital of Italy?".to_string()),
                answer: None,
            }
        );
        assert_eq!(
            kinds(&result),
            vec![TransitionKind::NewQuestion {
                question: "Capital of Italy?".to_string()
            }]
        );
    }

    #[test]
    fn test_blank_question_clears_quiz() {
        let prior = DisplayState {
            quiz: QuizState {
                question: Some("Q".to_string()),
                answer: None,
            },
            ..DisplayState::default()
        };
        let cleared = quiz_question(&prior, "  ");
        assert_eq!(cleared.state.quiz, QuizState::default());
        assert_eq!(kinds(&cleared), vec![TransitionKind::QuizCleared]);

        let again = quiz_question(&cleared.state, "");
        assert!(again.tasks.is_empty());
    }

    #[test]
    fn test_answer_without_question_is_rejected() {
        let result = reconcile(
            &DisplayState::default(),
            &ServerEvent::QuizAnswer {
                answer: "Paris".to_string(),
            },
        );
        assert!(matches!(result, Err(DisplayError::InvalidSequence(_))));
    }

    #[test]
    fn test_answer_reveal_and_duplicate() {
        let asked = quiz_question(&DisplayState::default(), "Capital of France?");
        let revealed = quiz_answer(&asked.state, "Paris").unwrap();
        assert_eq!(revealed.state.quiz.answer.as_deref(), Some("Paris"));
        assert_eq!(
            kinds(&revealed),
            vec![TransitionKind::RevealAnswer {
                answer: "Paris".to_string()
            }]
        );

        let duplicate = quiz_answer(&revealed.state, "Paris").unwrap();
        assert!(duplicate.tasks.is_empty());
    }

    #[test]
    fn test_dice_range() {
        for bad in [0, 7, -1, 100] {
            assert!(matches!(
                dice_result(&DisplayState::default(), bad),
                Err(DisplayError::InvalidSequence(_))
            ));
        }
        let rolled = dice_result(&DisplayState::default(), 6).unwrap();
        assert_eq!(rolled.state.dice, Some(6));
        assert_eq!(kinds(&rolled), vec![TransitionKind::DiceRoll { value: 6 }]);
    }
}
