use crate::scoring::{LastGame, ScoreBreakdown};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionSummary {
    pub level: String,
    pub session_key: String,
    pub played_at: Option<NaiveDateTime>,
    pub sections_played: usize,
    pub score: f64,
    pub attempts: u64,
    pub time: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentProgressResponse {
    pub score: ScoreBreakdown,
    pub last_game: Option<LastGame>,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentStatistics {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub validated: bool,
    pub score: f64,
    pub game_sessions: u64,
    pub last_game: Option<LastGame>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AnnouncementResponse {
    pub key: String,
    pub professor_id: String,
    pub title: String,
    pub content: String,
    pub timestamp: i64,
    pub target_groups: Vec<String>,
    pub is_global: bool,
}
