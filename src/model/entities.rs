//! Documents as they are stored in the data tree.
//!
//! Field names follow the stored JSON (camelCase where the tree uses it), so a dump of the
//! store stays readable by the existing game client.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Account state shared by professors and students.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    #[default]
    Active,
    Rejected,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Rejected => "rejected",
            AccountStatus::Blocked => "blocked",
        }
    }
}

/// A student, stored under `users/{uid}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    /// `Group::group_id` of the student's group, empty when unassigned.
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub demo: bool,
}

impl User {
    pub fn has_group(&self) -> bool {
        !self.group.is_empty()
    }
}

/// A professor, stored under `professors/{uid}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Professor {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    pub status: AccountStatus,
    /// Unix milliseconds of the first successful login.
    #[serde(rename = "firstLogTime", default, skip_serializing_if = "Option::is_none")]
    pub first_log_time: Option<i64>,
}

/// A super-admin, stored under `admin/{uid}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Admin {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// A cohort of students, stored under `groups/{key}`.
///
/// The storage key and `group_id` are two different identifiers; students and join rows
/// reference `group_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub levels: BTreeMap<String, bool>,
}

impl Group {
    /// A level is playable unless the group explicitly disabled it.
    pub fn level_enabled(&self, level: &str) -> bool {
        self.levels.get(level).copied().unwrap_or(true)
    }
}

/// Professor/group association, stored under `group_professors/{key}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupProfessor {
    pub group_id: String,
    pub professor_id: String,
    #[serde(default)]
    pub professor_email: String,
}

/// Results for one section of a game session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SectionResult {
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub time: f64,
    #[serde(rename = "listResults", default)]
    pub list_results: Vec<JsonValue>,
}

/// Physics parameters the game generated for a session. Only the fields used for answer
/// checking are typed; everything else is kept as is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PhysicsParameters {
    #[serde(rename = "acidTime", default, skip_serializing_if = "Option::is_none")]
    pub acid_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v0: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v2: Option<f64>,
    #[serde(flatten)]
    pub other: BTreeMap<String, JsonValue>,
}

/// One played session, stored under `progress/{uid}/{level}/{sessionKey}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct GameSession {
    #[serde(default)]
    pub data: PhysicsParameters,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionResult>,
}

/// Sessions of one level keyed by session key.
pub type LevelProgress = BTreeMap<String, GameSession>;

/// A student's whole history keyed by level id.
pub type UserProgress = BTreeMap<String, LevelProgress>;

/// A broadcast message, stored under `announcements/{key}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Announcement {
    #[serde(rename = "professorId")]
    pub professor_id: String,
    pub content: String,
    pub title: String,
    pub timestamp: i64,
    #[serde(rename = "targetGroups", default)]
    pub target_groups: Vec<String>,
    #[serde(rename = "isGlobal", default)]
    pub is_global: bool,
}

impl Announcement {
    pub fn visible_to_group(&self, group_id: &str) -> bool {
        self.is_global || (!group_id.is_empty() && self.target_groups.iter().any(|g| g == group_id))
    }
}

pub const DEFAULT_TOLERANCE: f64 = 0.1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct GlobalValues {
    #[serde(rename = "toleranceValue", default, skip_serializing_if = "Option::is_none")]
    pub tolerance_value: Option<f64>,
}

impl GlobalValues {
    pub fn tolerance(&self) -> f64 {
        self.tolerance_value.unwrap_or(DEFAULT_TOLERANCE)
    }
}

/// Entry of the level catalogue, stored under `levels/{levelKey}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Level {
    pub name: String,
}
