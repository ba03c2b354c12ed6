use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct RegisterStudentPayload {
    pub uid: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub demo: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RegisterProfessorPayload {
    pub uid: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginPayload {
    pub uid: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WhoAmIParams {
    pub uid: String,
}
