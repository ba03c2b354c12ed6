use crate::model::entities::{PhysicsParameters, UserProgress};
use crate::session_key::SessionKey;
use chrono::NaiveDateTime;
use float_cmp::approx_eq;
use serde::{Deserialize, Serialize};
use tracing::warn;

const ATTEMPT_PENALTY: f64 = -5.0;
const TIME_BONUS: f64 = 50.0;
const TIME_BONUS_LIMIT: f64 = 150.0;
const SESSION_MULTIPLIER: f64 = 0.05;

/// Answers this close to the tolerance still count as inside it.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// The four graded sections of a game session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    #[serde(rename = "section_1")]
    One,
    #[serde(rename = "section_2")]
    Two,
    #[serde(rename = "section_3")]
    Three,
    #[serde(rename = "section_4")]
    Four,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::One, Section::Two, Section::Three, Section::Four];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "section_1" => Some(Section::One),
            "section_2" => Some(Section::Two),
            "section_3" => Some(Section::Three),
            "section_4" => Some(Section::Four),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Section::One => "section_1",
            Section::Two => "section_2",
            Section::Three => "section_3",
            Section::Four => "section_4",
        }
    }

    /// The physics parameter a student has to find in this section.
    pub fn expected_value(&self, params: &PhysicsParameters) -> Option<f64> {
        match self {
            Section::One => params.acid_time,
            Section::Two => params.v2,
            Section::Three => params.v1,
            Section::Four => params.v0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub total_score: f64,
    pub total_attempts: u64,
    pub total_time: f64,
    pub game_sessions: u64,
    pub final_score: f64,
}

/// Aggregates a student's whole progress tree into a single score.
///
/// `(score - 5 * attempts + bonus) * (1 + 0.05 * sessions)`, where the bonus of 50 is granted
/// when the summed time stays under 150.
pub fn calculate_user_score(progress: &UserProgress) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::default();

    for sessions in progress.values() {
        for session in sessions.values() {
            breakdown.game_sessions += 1;
            for section in session.sections.values() {
                breakdown.total_score += section.score;
                breakdown.total_attempts += u64::from(section.attempts);
                breakdown.total_time += section.time;
            }
        }
    }

    let penalty = breakdown.total_attempts as f64 * ATTEMPT_PENALTY;
    let time_bonus = if breakdown.total_time < TIME_BONUS_LIMIT {
        TIME_BONUS
    } else {
        0.0
    };
    let session_multiplier = breakdown.game_sessions as f64 * SESSION_MULTIPLIER;

    breakdown.final_score =
        (breakdown.total_score + penalty + time_bonus) * (1.0 + session_multiplier);
    breakdown
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LastGame {
    pub level: String,
    pub session_key: String,
    pub played_at: NaiveDateTime,
}

/// Finds the most recently played session. Keys that do not parse are skipped.
pub fn last_game(progress: &UserProgress) -> Option<LastGame> {
    let mut latest: Option<LastGame> = None;

    for (level, sessions) in progress {
        for session_key in sessions.keys() {
            let played_at = match SessionKey::parse(session_key) {
                Ok(key) => key.played_at,
                Err(e) => {
                    warn!("Skipping session with unreadable key: {}", e);
                    continue;
                }
            };

            if latest.as_ref().is_none_or(|l| played_at > l.played_at) {
                latest = Some(LastGame {
                    level: level.clone(),
                    session_key: session_key.clone(),
                    played_at,
                });
            }
        }
    }

    latest
}

/// Checks a numeric answer for `section_key` against the session's parameters.
pub fn is_answer_correct(
    section_key: &str,
    answer: f64,
    params: &PhysicsParameters,
    tolerance: f64,
) -> bool {
    let Some(expected) = Section::from_key(section_key).and_then(|s| s.expected_value(params))
    else {
        return false;
    };

    let difference = (answer - expected).abs();
    difference <= tolerance || approx_eq!(f64, difference, tolerance, epsilon = BOUNDARY_EPSILON)
}
