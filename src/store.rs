//! In-memory document tree persisted to a single JSON file.
//!
//! The tree keeps the collection layout the game client reads and writes. All collections
//! are ordered maps, so iteration order is the key order. Push keys are time-ordered, which
//! keeps that equal to insertion order.

use crate::model::entities::{
    Admin, Announcement, GlobalValues, Group, GroupProfessor, Level, Professor, User,
    UserProgress,
};
use anyhow::Context;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const GROUP_ID_LEN: usize = 7;

pub type Store = Arc<RwLock<Database>>;

pub fn new_store(db: Database) -> Store {
    Arc::new(RwLock::new(db))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataTree {
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    #[serde(default)]
    pub professors: BTreeMap<String, Professor>,
    #[serde(default)]
    pub admin: BTreeMap<String, Admin>,
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
    #[serde(default)]
    pub group_professors: BTreeMap<String, GroupProfessor>,
    #[serde(default)]
    pub progress: BTreeMap<String, UserProgress>,
    #[serde(default)]
    pub announcements: BTreeMap<String, Announcement>,
    #[serde(rename = "globalValues", default)]
    pub global_values: GlobalValues,
    #[serde(default = "enabled")]
    pub db_enabled: bool,
    #[serde(default)]
    pub levels: BTreeMap<String, Level>,
}

fn enabled() -> bool {
    true
}

impl Default for DataTree {
    fn default() -> Self {
        DataTree {
            users: BTreeMap::new(),
            professors: BTreeMap::new(),
            admin: BTreeMap::new(),
            groups: BTreeMap::new(),
            group_professors: BTreeMap::new(),
            progress: BTreeMap::new(),
            announcements: BTreeMap::new(),
            global_values: GlobalValues::default(),
            db_enabled: true,
            levels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDeletion {
    pub removed_assignments: usize,
    pub detached_students: usize,
}

/// Generates a storage key that sorts after every key generated before it.
pub fn push_key() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{:012x}{}", millis, &suffix[..8])
}

/// Generates the short public identifier of a group.
pub fn generate_group_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GROUP_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

impl DataTree {
    /// Linear scan from the public `group_id` to the stored row.
    pub fn find_group(&self, group_id: &str) -> Option<(&String, &Group)> {
        self.groups.iter().find(|(_, g)| g.group_id == group_id)
    }

    pub fn find_group_mut(&mut self, group_id: &str) -> Option<&mut Group> {
        self.groups.values_mut().find(|g| g.group_id == group_id)
    }

    /// Default access map for a new group: the first catalogue level is open.
    pub fn default_level_access(&self) -> BTreeMap<String, bool> {
        self.levels
            .keys()
            .enumerate()
            .map(|(i, key)| (key.clone(), i == 0))
            .collect()
    }

    /// Inserts a new group and returns its `(key, group_id)`.
    pub fn create_group(&mut self, group_name: String) -> (String, String) {
        let mut group_id = generate_group_id();
        while self.find_group(&group_id).is_some() {
            group_id = generate_group_id();
        }

        let key = push_key();
        let group = Group {
            group_id: group_id.clone(),
            group_name,
            levels: self.default_level_access(),
        };
        self.groups.insert(key.clone(), group);
        debug!("Created group {} under key {}", group_id, key);
        (key, group_id)
    }

    /// Links a professor to a group. Existing links are not checked, so the same pair can be
    /// stored more than once.
    pub fn attach_professor(
        &mut self,
        group_id: &str,
        professor_id: &str,
        professor_email: &str,
    ) -> String {
        let key = push_key();
        self.group_professors.insert(
            key.clone(),
            GroupProfessor {
                group_id: group_id.to_string(),
                professor_id: professor_id.to_string(),
                professor_email: professor_email.to_string(),
            },
        );
        key
    }

    pub fn detach_professor(&mut self, group_id: &str, professor_id: &str) -> usize {
        let before = self.group_professors.len();
        self.group_professors
            .retain(|_, gp| !(gp.group_id == group_id && gp.professor_id == professor_id));
        before - self.group_professors.len()
    }

    /// Removes a group row, every professor link to it, and detaches its students.
    /// Returns `None` when no group has this `group_id`.
    pub fn delete_group(&mut self, group_id: &str) -> Option<GroupDeletion> {
        let key = self.find_group(group_id).map(|(key, _)| key.clone())?;
        self.groups.remove(&key);

        let before = self.group_professors.len();
        self.group_professors.retain(|_, gp| gp.group_id != group_id);
        let removed_assignments = before - self.group_professors.len();

        let mut detached_students = 0;
        for user in self.users.values_mut().filter(|u| u.group == group_id) {
            user.group.clear();
            detached_students += 1;
        }

        info!(
            "Deleted group {}: {} professor links removed, {} students detached",
            group_id, removed_assignments, detached_students
        );
        Some(GroupDeletion {
            removed_assignments,
            detached_students,
        })
    }

    /// Group ids linked to a professor, without duplicates.
    pub fn professor_group_ids(&self, professor_id: &str) -> BTreeSet<String> {
        self.group_professors
            .values()
            .filter(|gp| gp.professor_id == professor_id)
            .map(|gp| gp.group_id.clone())
            .collect()
    }

    pub fn group_professor_ids(&self, group_id: &str) -> BTreeSet<String> {
        self.group_professors
            .values()
            .filter(|gp| gp.group_id == group_id)
            .map(|gp| gp.professor_id.clone())
            .collect()
    }

    pub fn professor_in_group(&self, professor_id: &str, group_id: &str) -> bool {
        self.group_professors
            .values()
            .any(|gp| gp.professor_id == professor_id && gp.group_id == group_id)
    }

    pub fn students_in_group<'a>(
        &'a self,
        group_id: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a User)> + 'a {
        self.users.iter().filter(move |(_, u)| u.group == group_id)
    }

    pub fn delete_professor(&mut self, professor_id: &str) -> bool {
        if self.professors.remove(professor_id).is_none() {
            return false;
        }
        self.group_professors
            .retain(|_, gp| gp.professor_id != professor_id);
        true
    }

    pub fn delete_student(&mut self, student_id: &str) -> bool {
        if self.users.remove(student_id).is_none() {
            return false;
        }
        self.progress.remove(student_id);
        true
    }

    pub fn uid_exists(&self, uid: &str) -> bool {
        self.users.contains_key(uid)
            || self.professors.contains_key(uid)
            || self.admin.contains_key(uid)
    }
}

pub struct Database {
    path: Option<PathBuf>,
    tree: DataTree,
}

impl Database {
    pub fn in_memory() -> Self {
        Database {
            path: None,
            tree: DataTree::default(),
        }
    }

    /// Loads the tree from `path`, or creates the file with an empty tree.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read data file {}", path.display()))?;
            let tree: DataTree = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse data file {}", path.display()))?;
            info!("Loaded data tree from {}", path.display());
            return Ok(Database {
                path: Some(path),
                tree,
            });
        }

        info!(
            "Data file {} not found, starting with an empty tree",
            path.display()
        );
        let db = Database {
            path: Some(path),
            tree: DataTree::default(),
        };
        db.persist()?;
        Ok(db)
    }

    pub fn tree(&self) -> &DataTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DataTree {
        &mut self.tree
    }

    /// Writes the tree to the backing file. No-op for in-memory databases.
    pub fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let contents =
            serde_json::to_string_pretty(&self.tree).context("Failed to serialize data tree")?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace data file {}", path.display()))?;
        debug!("Persisted data tree to {}", path.display());
        Ok(())
    }

    /// Runs `f` against the tree as one unit: on error, or if persisting fails, the tree is
    /// restored to its state before the call.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut DataTree) -> Result<T, E>,
        E: From<anyhow::Error>,
    {
        let snapshot = self.tree.clone();

        match f(&mut self.tree) {
            Ok(value) => {
                if let Err(e) = self.persist() {
                    self.tree = snapshot;
                    return Err(E::from(e));
                }
                Ok(value)
            }
            Err(e) => {
                self.tree = snapshot;
                Err(e)
            }
        }
    }
}
