use andromeda_server::model::admin::{GroupSummary, StudentSummary};
use andromeda_server::model::entities::AccountStatus;
use andromeda_server::model::professor::{
    AnnouncementResponse, StudentProgressResponse, StudentStatistics,
};
use andromeda_server::payloads::professor::{
    DeleteAnnouncementPayload, ProfessorPostAnnouncementPayload, ProfessorSetStudentGroupPayload,
    SetGroupLevelsPayload, ValidateStudentPayload,
};
use andromeda_server::response::{ApiResponse, XLSX_CONTENT_TYPE};
use axum::http::{StatusCode, header};
use float_cmp::assert_approx_eq;
use serde_json::Value;
use std::collections::BTreeMap;

mod helpers;
use helpers::{
    assign_test_professor, create_test_group, create_test_professor, create_test_progress,
    create_test_student, section, setup_test_environment, student_group, update_student,
};

// access

#[tokio::test]
async fn test_pending_professor_refused() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Pending).await;

    let response = server.get("/professor/get_groups?professor_id=p1").await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: ApiResponse<Value> = response.json();
    assert_eq!(body.status_code, 403);
}

// get_groups

#[tokio::test]
async fn test_get_groups_only_assigned() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let mine = create_test_group(&store, "Mine").await;
    let _other = create_test_group(&store, "Other").await;
    assign_test_professor(&store, &mine, "p1").await;
    assign_test_professor(&store, &mine, "p1").await;

    let response = server.get("/professor/get_groups?professor_id=p1").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<Vec<GroupSummary>> = response.json();
    let groups = body.data.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_id, mine);
}

// list_students

#[tokio::test]
async fn test_list_students_of_unassigned_group() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Not mine").await;

    let response = server
        .get(&format!(
            "/professor/list_students?professor_id=p1&group_id={}",
            group_id
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_students_success() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;
    create_test_student(&store, "s1", &group_id).await;
    create_test_student(&store, "s2", "").await;

    let response = server
        .get(&format!(
            "/professor/list_students?professor_id=p1&group_id={}",
            group_id
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<Vec<StudentSummary>> = response.json();
    let students = body.data.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].uid, "s1");
}

// validate_student

#[tokio::test]
async fn test_validate_student_in_own_group() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;
    create_test_student(&store, "s1", &group_id).await;
    update_student(&store, "s1", |s| s.validated = false).await;

    let payload = ValidateStudentPayload {
        professor_id: "p1".to_string(),
        student_id: "s1".to_string(),
        validated: true,
    };
    let response = server
        .post("/professor/validate_student")
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(store.read().await.tree().users["s1"].validated);
}

#[tokio::test]
async fn test_validate_student_outside_groups() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Not mine").await;
    create_test_student(&store, "s1", &group_id).await;
    update_student(&store, "s1", |s| s.validated = false).await;

    let payload = ValidateStudentPayload {
        professor_id: "p1".to_string(),
        student_id: "s1".to_string(),
        validated: true,
    };
    let response = server
        .post("/professor/validate_student")
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert!(!store.read().await.tree().users["s1"].validated);
}

// set_student_group

#[tokio::test]
async fn test_claim_ungrouped_student() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;
    create_test_student(&store, "s1", "").await;

    let payload = ProfessorSetStudentGroupPayload {
        professor_id: "p1".to_string(),
        student_id: "s1".to_string(),
        group_id: group_id.clone(),
    };
    let response = server
        .post("/professor/set_student_group")
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(student_group(&store, "s1").await, Some(group_id));
}

#[tokio::test]
async fn test_cannot_take_student_from_foreign_group() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let mine = create_test_group(&store, "Mine").await;
    let foreign = create_test_group(&store, "Foreign").await;
    assign_test_professor(&store, &mine, "p1").await;
    create_test_student(&store, "s1", &foreign).await;

    let payload = ProfessorSetStudentGroupPayload {
        professor_id: "p1".to_string(),
        student_id: "s1".to_string(),
        group_id: mine,
    };
    let response = server
        .post("/professor/set_student_group")
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(student_group(&store, "s1").await, Some(foreign));
}

// set_group_levels

#[tokio::test]
async fn test_set_group_levels_merges() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;

    let mut first = BTreeMap::new();
    first.insert("level_1".to_string(), true);
    first.insert("level_2".to_string(), false);
    let payload = SetGroupLevelsPayload {
        professor_id: "p1".to_string(),
        group_id: group_id.clone(),
        levels: first,
    };
    server
        .post("/professor/set_group_levels")
        .json(&payload)
        .await;

    let mut second = BTreeMap::new();
    second.insert("level_2".to_string(), true);
    let payload = SetGroupLevelsPayload {
        professor_id: "p1".to_string(),
        group_id,
        levels: second,
    };
    let response = server
        .post("/professor/set_group_levels")
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<BTreeMap<String, bool>> = response.json();
    let levels = body.data.unwrap();
    assert_eq!(levels.get("level_1"), Some(&true));
    assert_eq!(levels.get("level_2"), Some(&true));
}

// get_student_progress

#[tokio::test]
async fn test_get_student_progress() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;
    create_test_student(&store, "s1", &group_id).await;
    create_test_progress(
        &store,
        "s1",
        "level_1",
        "level_1_2_3_2024_10_00",
        vec![("section_1", section(100.0, 2, 120.0))],
    )
    .await;
    create_test_progress(
        &store,
        "s1",
        "level_2",
        "level_2_5_3_2024_9_15",
        vec![],
    )
    .await;

    let response = server
        .get("/professor/get_student_progress?professor_id=p1&student_id=s1")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<StudentProgressResponse> = response.json();
    let progress = body.data.unwrap();
    assert_eq!(progress.score.game_sessions, 2);
    assert_eq!(progress.sessions.len(), 2);
    assert_eq!(progress.sessions[0].session_key, "level_2_5_3_2024_9_15");
    assert_eq!(progress.last_game.unwrap().level, "level_2");
    assert_approx_eq!(f64, progress.score.total_score, 100.0);
}

// get_group_statistics

#[tokio::test]
async fn test_group_statistics_sorted_without_demo() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;
    create_test_student(&store, "low", &group_id).await;
    create_test_student(&store, "high", &group_id).await;
    create_test_student(&store, "demo", &group_id).await;
    update_student(&store, "demo", |s| s.demo = true).await;
    create_test_progress(
        &store,
        "high",
        "level_1",
        "level_1_2_3_2024_10_00",
        vec![("section_1", section(100.0, 2, 120.0))],
    )
    .await;

    let response = server
        .get(&format!(
            "/professor/get_group_statistics?professor_id=p1&group_id={}",
            group_id
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: ApiResponse<Vec<StudentStatistics>> = response.json();
    let statistics = body.data.unwrap();
    assert_eq!(statistics.len(), 2);
    assert_eq!(statistics[0].uid, "high");
    assert_approx_eq!(f64, statistics[0].score, 147.0);
    assert_eq!(statistics[1].uid, "low");
    assert_approx_eq!(f64, statistics[1].score, 50.0);
}

// export

#[tokio::test]
async fn test_professor_export_progress() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;
    create_test_student(&store, "s1", &group_id).await;

    let response = server
        .get("/professor/export_progress?professor_id=p1")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        XLSX_CONTENT_TYPE
    );
    assert!(response.as_bytes().starts_with(b"PK"));
}

#[tokio::test]
async fn test_export_filename_ignores_professor_id() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p\"1", AccountStatus::Active).await;

    let response = server
        .get("/professor/export_progress?professor_id=p%221")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let disposition = response.header(header::CONTENT_DISPOSITION);
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"progress_"));
    assert!(!disposition.contains("p\"1"));
}

// announcements

#[tokio::test]
async fn test_post_and_list_announcements() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Mine").await;
    assign_test_professor(&store, &group_id, "p1").await;

    let payload = ProfessorPostAnnouncementPayload {
        professor_id: "p1".to_string(),
        title: "Homework".to_string(),
        content: "Finish level 2".to_string(),
        target_groups: vec![group_id.clone()],
    };
    let response = server
        .post("/professor/post_announcement")
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .get("/professor/list_announcements?professor_id=p1")
        .await;
    let body: ApiResponse<Vec<AnnouncementResponse>> = response.json();
    let announcements = body.data.unwrap();
    assert_eq!(announcements.len(), 1);
    assert!(!announcements[0].is_global);
    assert_eq!(announcements[0].target_groups, vec![group_id]);
}

#[tokio::test]
async fn test_post_announcement_to_foreign_group() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    let foreign = create_test_group(&store, "Foreign").await;

    let payload = ProfessorPostAnnouncementPayload {
        professor_id: "p1".to_string(),
        title: "Homework".to_string(),
        content: "Finish level 2".to_string(),
        target_groups: vec![foreign],
    };
    let response = server
        .post("/professor/post_announcement")
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert!(store.read().await.tree().announcements.is_empty());
}

#[tokio::test]
async fn test_delete_only_own_announcement() {
    let (server, store) = setup_test_environment().await;
    create_test_professor(&store, "p1", AccountStatus::Active).await;
    create_test_professor(&store, "p2", AccountStatus::Active).await;
    let group_id = create_test_group(&store, "Shared").await;
    assign_test_professor(&store, &group_id, "p1").await;
    assign_test_professor(&store, &group_id, "p2").await;

    let payload = ProfessorPostAnnouncementPayload {
        professor_id: "p1".to_string(),
        title: "Quiz".to_string(),
        content: "Friday".to_string(),
        target_groups: vec![group_id],
    };
    let response = server
        .post("/professor/post_announcement")
        .json(&payload)
        .await;
    let body: ApiResponse<String> = response.json();
    let key = body.data.unwrap();

    let payload = DeleteAnnouncementPayload {
        professor_id: "p2".to_string(),
        announcement_key: key.clone(),
    };
    let response = server
        .post("/professor/delete_announcement")
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let payload = DeleteAnnouncementPayload {
        professor_id: "p1".to_string(),
        announcement_key: key,
    };
    let response = server
        .post("/professor/delete_announcement")
        .json(&payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(store.read().await.tree().announcements.is_empty());
}
