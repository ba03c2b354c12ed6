use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfessorParams {
    pub professor_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfessorGroupParams {
    pub professor_id: String,
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfessorStudentParams {
    pub professor_id: String,
    pub student_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ValidateStudentPayload {
    pub professor_id: String,
    pub student_id: String,
    #[serde(default = "default_true")]
    pub validated: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfessorSetStudentGroupPayload {
    pub professor_id: String,
    pub student_id: String,
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SetGroupLevelsPayload {
    pub professor_id: String,
    pub group_id: String,
    pub levels: BTreeMap<String, bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfessorPostAnnouncementPayload {
    pub professor_id: String,
    pub title: String,
    pub content: String,
    pub target_groups: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteAnnouncementPayload {
    pub professor_id: String,
    pub announcement_key: String,
}
