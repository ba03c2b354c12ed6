use crate::model::entities::AccountStatus;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct AdminParams {
    pub admin_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ListProfessorsParams {
    pub admin_id: String,
    pub status: Option<AccountStatus>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SetProfessorStatusPayload {
    pub admin_id: String,
    pub professor_id: String,
    pub status: AccountStatus,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteProfessorPayload {
    pub admin_id: String,
    pub professor_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateGroupPayload {
    pub admin_id: String,
    pub group_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RenameGroupPayload {
    pub admin_id: String,
    pub group_id: String,
    pub group_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteGroupPayload {
    pub admin_id: String,
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AssignProfessorPayload {
    pub admin_id: String,
    pub group_id: String,
    pub professor_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UnassignProfessorPayload {
    pub admin_id: String,
    pub group_id: String,
    pub professor_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AdminListStudentsParams {
    pub admin_id: String,
    pub group_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AdminSetStudentGroupPayload {
    pub admin_id: String,
    pub student_id: String,
    /// Empty string detaches the student from any group.
    #[serde(default)]
    pub group_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteStudentPayload {
    pub admin_id: String,
    pub student_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SetTolerancePayload {
    pub admin_id: String,
    pub tolerance: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SetDbEnabledPayload {
    pub admin_id: String,
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UpsertLevelPayload {
    pub admin_id: String,
    pub level_key: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AdminPostAnnouncementPayload {
    pub admin_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub target_groups: Vec<String>,
}
