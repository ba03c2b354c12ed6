use andromeda_server::model::auth::{LoginResponse, Role};
use andromeda_server::model::entities::AccountStatus;
use andromeda_server::payloads::auth::{
    LoginPayload, RegisterProfessorPayload, RegisterStudentPayload,
};
use andromeda_server::response::ApiResponse;
use axum::http::StatusCode;
use serde_json::Value;

mod helpers;
use helpers::{
    block_data_file_writes, create_test_admin, create_test_professor, create_test_student,
    setup_file_backed_environment, setup_test_environment, update_student,
};

fn student_registration(uid: &str) -> RegisterStudentPayload {
    RegisterStudentPayload {
        uid: uid.to_string(),
        email: format!("{}@test.com", uid),
        name: "New".to_string(),
        last_name: "Student".to_string(),
        demo: false,
    }
}

// register_student

#[tokio::test]
async fn test_register_student_success() {
    let (server, store) = setup_test_environment().await;

    let response = server
        .post("/auth/register_student")
        .json(&student_registration("s1"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<bool> = response.json();
    assert_eq!(body.data, Some(true));

    let db = store.read().await;
    let student = db.tree().users.get("s1").expect("Student should be stored");
    assert!(!student.validated);
    assert!(student.group.is_empty());
}

#[tokio::test]
async fn test_register_student_conflict_with_professor() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "taken", AccountStatus::Active).await;

    let response = server
        .post("/auth/register_student")
        .json(&student_registration("taken"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.status_code, 409);
    assert!(body.data.is_none());
}

#[tokio::test]
async fn test_register_student_blank_email() {
    let (server, _store) = setup_test_environment().await;
    let mut payload = student_registration("s1");
    payload.email = "  ".to_string();

    let response = server.post("/auth/register_student").json(&payload).await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

// register_professor

#[tokio::test]
async fn test_register_professor_starts_pending() {
    let (server, store) = setup_test_environment().await;
    let payload = RegisterProfessorPayload {
        uid: "p1".to_string(),
        email: "p1@test.com".to_string(),
        name: "New".to_string(),
        last_name: "Professor".to_string(),
    };

    let response = server.post("/auth/register_professor").json(&payload).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let db = store.read().await;
    assert_eq!(db.tree().professors["p1"].status, AccountStatus::Pending);
}

// login

#[tokio::test]
async fn test_login_admin() {
    let (server, store) = setup_test_environment().await;
    create_test_admin(&store, "root").await;

    let response = server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "root".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<LoginResponse> = response.json();
    let login = body.data.unwrap();
    assert_eq!(login.role, Role::Admin);
    assert!(login.validated);
}

#[tokio::test]
async fn test_login_active_professor_records_first_login() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;

    let response = server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "p1".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<LoginResponse> = response.json();
    assert_eq!(body.data.unwrap().role, Role::Professor);

    let first = store.read().await.tree().professors["p1"].first_log_time;
    assert!(first.is_some());

    server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "p1".to_string(),
        })
        .await;
    let second = store.read().await.tree().professors["p1"].first_log_time;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_login_professor_refused_unless_active() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "pending", AccountStatus::Pending).await;
    create_test_professor(&store, "rejected", AccountStatus::Rejected).await;
    create_test_professor(&store, "blocked", AccountStatus::Blocked).await;

    let mut messages = Vec::new();
    for uid in ["pending", "rejected", "blocked"] {
        let response = server
            .post("/auth/login")
            .json(&LoginPayload {
                uid: uid.to_string(),
            })
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body: ApiResponse<Value> = response.json();
        messages.push(body.status_message);
    }

    assert_ne!(messages[0], messages[1]);
    assert_ne!(messages[1], messages[2]);
    assert!(
        store.read().await.tree().professors["pending"]
            .first_log_time
            .is_none()
    );
}

#[tokio::test]
async fn test_login_unvalidated_student() {
    let (server, store) = setup_test_environment().await;
    create_test_student(&store, "s1", "").await;
    update_student(&store, "s1", |s| s.validated = false).await;

    let response = server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "s1".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<LoginResponse> = response.json();
    let login = body.data.unwrap();
    assert_eq!(login.role, Role::Student);
    assert!(!login.validated);
}

#[tokio::test]
async fn test_login_blocked_student() {
    let (server, store) = setup_test_environment().await;
    create_test_student(&store, "s1", "").await;
    update_student(&store, "s1", |s| s.status = AccountStatus::Blocked).await;

    let response = server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "s1".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_unknown_uid() {
    let (server, _store) = setup_test_environment().await;

    let response = server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "ghost".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_does_not_need_a_writable_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let (server, store, path) = setup_file_backed_environment(dir.path()).await;
    create_test_admin(&store, "root").await;
    create_test_student(&store, "s1", "").await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    store.write().await.tree_mut().professors.get_mut("p1").unwrap().first_log_time =
        Some(1_700_000_000_000);
    block_data_file_writes(&path);

    for uid in ["root", "s1", "p1"] {
        let response = server
            .post("/auth/login")
            .json(&LoginPayload {
                uid: uid.to_string(),
            })
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "login of {}", uid);
    }
}

#[tokio::test]
async fn test_first_professor_login_rolls_back_when_unsaved() {
    let dir = tempfile::tempdir().unwrap();
    let (server, store, path) = setup_file_backed_environment(dir.path()).await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    block_data_file_writes(&path);

    let response = server
        .post("/auth/login")
        .json(&LoginPayload {
            uid: "p1".to_string(),
        })
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        store.read().await.tree().professors["p1"]
            .first_log_time
            .is_none()
    );
}

#[tokio::test]
async fn test_register_student_rolls_back_when_unsaved() {
    let dir = tempfile::tempdir().unwrap();
    let (server, store, path) = setup_file_backed_environment(dir.path()).await;
    block_data_file_writes(&path);

    let response = server
        .post("/auth/register_student")
        .json(&student_registration("s2"))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.status_code, 500);
    assert!(!store.read().await.tree().users.contains_key("s2"));
}

// whoami

#[tokio::test]
async fn test_whoami_student() {
    let (server, store) = setup_test_environment().await;
    create_test_student(&store, "s1", "").await;

    let response = server.get("/auth/whoami?uid=s1").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<Role> = response.json();
    assert_eq!(body.data, Some(Role::Student));
}
