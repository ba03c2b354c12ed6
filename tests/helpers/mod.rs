use andromeda_server::init_test_router;
use andromeda_server::model::entities::{
    AccountStatus, Admin, GameSession, PhysicsParameters, Professor, SectionResult, User,
};
use andromeda_server::store::{Database, Store, new_store};
use axum::Router;
pub(crate) use axum_test::TestServer;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// test infra setup

pub async fn setup_test_environment() -> (TestServer, Store) {
    let store = new_store(Database::in_memory());
    let app: Router = init_test_router(store.clone());
    let server = TestServer::new(app).expect("Failed to create TestServer");
    (server, store)
}

/// Same as `setup_test_environment`, but the store is backed by `data.json` under `dir`.
pub async fn setup_file_backed_environment(dir: &Path) -> (TestServer, Store, PathBuf) {
    let path = dir.join("data.json");
    let db = Database::open(&path).expect("Failed to open test data file");
    let store = new_store(db);
    let app: Router = init_test_router(store.clone());
    let server = TestServer::new(app).expect("Failed to create TestServer");
    (server, store, path)
}

/// Makes every later write to the data file fail: the temp file it writes first is replaced
/// by a directory.
pub fn block_data_file_writes(path: &Path) {
    std::fs::create_dir(path.with_extension("tmp")).expect("Failed to block data file writes");
}

// endpoint helpers

pub async fn create_test_admin(store: &Store, uid: &str) {
    let mut db = store.write().await;
    db.tree_mut().admin.insert(
        uid.to_string(),
        Admin {
            email: format!("{}@test.com", uid),
            name: "Test Admin".to_string(),
        },
    );
}

pub async fn create_test_professor(store: &Store, uid: &str, status: AccountStatus) {
    let mut db = store.write().await;
    db.tree_mut().professors.insert(
        uid.to_string(),
        Professor {
            email: format!("{}@test.com", uid),
            name: "Test".to_string(),
            last_name: "Professor".to_string(),
            status,
            first_log_time: None,
        },
    );
}

pub async fn create_test_student(store: &Store, uid: &str, group_id: &str) {
    let mut db = store.write().await;
    db.tree_mut().users.insert(
        uid.to_string(),
        User {
            email: format!("{}@test.com", uid),
            name: "Test".to_string(),
            last_name: "Student".to_string(),
            group: group_id.to_string(),
            validated: true,
            status: AccountStatus::Active,
            demo: false,
        },
    );
}

pub async fn update_student(store: &Store, uid: &str, update: impl FnOnce(&mut User)) {
    let mut db = store.write().await;
    let student = db
        .tree_mut()
        .users
        .get_mut(uid)
        .expect("Student to update must exist");
    update(student);
}

/// Creates a group and returns its public `group_id`.
pub async fn create_test_group(store: &Store, name: &str) -> String {
    let mut db = store.write().await;
    let (_, group_id) = db.tree_mut().create_group(name.to_string());
    group_id
}

pub async fn assign_test_professor(store: &Store, group_id: &str, professor_id: &str) -> String {
    let mut db = store.write().await;
    db.tree_mut()
        .attach_professor(group_id, professor_id, &format!("{}@test.com", professor_id))
}

pub fn section(score: f64, attempts: u32, time: f64) -> SectionResult {
    SectionResult {
        attempts,
        score,
        time,
        list_results: Vec::new(),
    }
}

pub async fn create_test_progress(
    store: &Store,
    student_id: &str,
    level: &str,
    session_key: &str,
    sections: Vec<(&str, SectionResult)>,
) {
    let mut db = store.write().await;
    let session = GameSession {
        data: PhysicsParameters::default(),
        sections: sections
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    };
    db.tree_mut()
        .progress
        .entry(student_id.to_string())
        .or_default()
        .entry(level.to_string())
        .or_default()
        .insert(session_key.to_string(), session);
}

pub async fn count_group_assignments(store: &Store, group_id: &str) -> usize {
    let db = store.read().await;
    db.tree()
        .group_professors
        .values()
        .filter(|gp| gp.group_id == group_id)
        .count()
}

pub async fn student_group(store: &Store, uid: &str) -> Option<String> {
    let db = store.read().await;
    db.tree().users.get(uid).map(|u| u.group.clone())
}
