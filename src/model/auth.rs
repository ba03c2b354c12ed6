use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Professor,
    Student,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub uid: String,
    pub role: Role,
    pub email: String,
    pub name: String,
    pub last_name: String,
    /// Always true for admins and professors.
    pub validated: bool,
}
