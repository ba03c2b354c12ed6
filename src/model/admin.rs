use crate::model::entities::AccountStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Serialize, Deserialize, Debug)]
pub struct ProfessorSummary {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub status: AccountStatus,
    pub first_log_time: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GroupSummary {
    pub key: String,
    pub group_id: String,
    pub group_name: String,
    pub levels: BTreeMap<String, bool>,
    pub professor_ids: BTreeSet<String>,
    pub student_count: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedGroupResponse {
    pub key: String,
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StudentSummary {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub group_id: String,
    pub validated: bool,
    pub status: AccountStatus,
    pub demo: bool,
}
