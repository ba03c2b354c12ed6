use crate::model::entities::{PhysicsParameters, SectionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentParams {
    pub student_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SaveGameSessionPayload {
    pub student_id: String,
    pub level: String,
    /// Generated from the current time when absent.
    pub session_key: Option<String>,
    #[serde(default)]
    pub data: PhysicsParameters,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionResult>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CheckAnswerPayload {
    pub section: String,
    pub answer: f64,
    pub data: PhysicsParameters,
}
