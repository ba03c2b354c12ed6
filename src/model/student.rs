use crate::scoring::{LastGame, ScoreBreakdown};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentProfileResponse {
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub group_id: String,
    pub group_name: Option<String>,
    pub validated: bool,
    pub levels: BTreeMap<String, bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentScoreResponse {
    pub score: ScoreBreakdown,
    pub last_game: Option<LastGame>,
}
