use super::helper;
use crate::errors::AppError;
use crate::export::{GroupSectionSummary, write_workbook};
use crate::model::admin::{GroupSummary, StudentSummary};
use crate::model::entities::Announcement;
use crate::model::professor::{
    AnnouncementResponse, SessionSummary, StudentProgressResponse, StudentStatistics,
};
use crate::payloads::professor::{
    DeleteAnnouncementPayload, ProfessorGroupParams, ProfessorParams,
    ProfessorPostAnnouncementPayload, ProfessorSetStudentGroupPayload, ProfessorStudentParams,
    SetGroupLevelsPayload, ValidateStudentPayload,
};
use crate::response::{ApiResponse, XlsxFile};
use crate::scoring::{calculate_user_score, last_game};
use crate::session_key::SessionKey;
use crate::store::{Store, push_key};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};

/// Retrieves the groups the professor is assigned to.
///
/// Query Parameters:
/// * `professor_id`: The calling professor.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<GroupSummary>` (200 OK).
/// * `403 Forbidden`: If the caller is not an active professor.
#[instrument(skip(store, params))]
pub async fn get_groups(
    State(store): State<Store>,
    Query(params): Query<ProfessorParams>,
) -> Result<ApiResponse<Vec<GroupSummary>>, AppError> {
    info!("Fetching groups for professor {}", params.professor_id);

    helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;

        let group_ids = tree.professor_group_ids(&params.professor_id);
        let groups: Vec<GroupSummary> = tree
            .groups
            .iter()
            .filter(|(_, g)| group_ids.contains(&g.group_id))
            .map(|(key, group)| helper::group_summary(tree, key, group))
            .collect();

        info!(
            "Found {} groups for professor {}",
            groups.len(),
            params.professor_id
        );
        Ok(ApiResponse::ok(groups))
    })
    .await
}

/// Lists the students of one of the professor's groups.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<StudentSummary>` (200 OK).
/// * `403 Forbidden`: If the caller is not an active professor or not assigned to the group.
/// * `404 Not Found`: If the group does not exist.
#[instrument(skip(store, params))]
pub async fn list_students(
    State(store): State<Store>,
    Query(params): Query<ProfessorGroupParams>,
) -> Result<ApiResponse<Vec<StudentSummary>>, AppError> {
    info!(
        "Listing students of group {} for professor {}",
        params.group_id, params.professor_id
    );

    helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;
        helper::check_professor_group_permission(tree, &params.professor_id, &params.group_id)?;

        let students: Vec<StudentSummary> = tree
            .students_in_group(&params.group_id)
            .map(|(uid, u)| helper::student_summary(uid, u))
            .collect();

        Ok(ApiResponse::ok(students))
    })
    .await
}

/// Validates (or invalidates) a student of one of the professor's groups.
///
/// Request Body: `ValidateStudentPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: the stored validation flag (200 OK).
/// * `403 Forbidden`: If the student is outside the professor's groups.
/// * `404 Not Found`: If the student does not exist.
#[instrument(skip(store, payload))]
pub async fn validate_student(
    State(store): State<Store>,
    Json(payload): Json<ValidateStudentPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Professor {} setting validated={} on student {}",
        payload.professor_id, payload.validated, payload.student_id
    );

    helper::write(&store, move |tree| {
        helper::check_active_professor(tree, &payload.professor_id)?;
        helper::check_professor_student_permission(
            tree,
            &payload.professor_id,
            &payload.student_id,
        )?;

        if let Some(student) = tree.users.get_mut(&payload.student_id) {
            student.validated = payload.validated;
        }
        Ok(ApiResponse::ok(payload.validated))
    })
    .await
}

/// Moves a student into one of the professor's groups. Students without a group can be
/// claimed; students of another professor's group cannot.
///
/// Request Body: `ProfessorSetStudentGroupPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool` (200 OK).
/// * `403 Forbidden`: If the target group or the student's current group is not the
///   professor's.
/// * `404 Not Found`: If the student or the group does not exist.
#[instrument(skip(store, payload))]
pub async fn set_student_group(
    State(store): State<Store>,
    Json(payload): Json<ProfessorSetStudentGroupPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Professor {} moving student {} to group {}",
        payload.professor_id, payload.student_id, payload.group_id
    );

    helper::write(&store, move |tree| {
        helper::check_active_professor(tree, &payload.professor_id)?;
        helper::check_professor_group_permission(
            tree,
            &payload.professor_id,
            &payload.group_id,
        )?;

        let student = helper::find_student(tree, &payload.student_id)?;
        if student.has_group() && !tree.professor_in_group(&payload.professor_id, &student.group)
        {
            warn!(
                "Student {} belongs to group {}, which professor {} does not manage.",
                payload.student_id, student.group, payload.professor_id
            );
            return Err(AppError::Forbidden(format!(
                "Professor {} has no access to student {}.",
                payload.professor_id, payload.student_id
            )));
        }

        if let Some(student) = tree.users.get_mut(&payload.student_id) {
            student.group = payload.group_id;
        }
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Opens or closes levels for a group. Entries are merged into the existing map.
///
/// Request Body: `SetGroupLevelsPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `BTreeMap<String, bool>`: the group's resulting level map (200 OK).
/// * `403 Forbidden`: If the professor is not assigned to the group.
/// * `404 Not Found`: If the group does not exist.
#[instrument(skip(store, payload))]
pub async fn set_group_levels(
    State(store): State<Store>,
    Json(payload): Json<SetGroupLevelsPayload>,
) -> Result<ApiResponse<BTreeMap<String, bool>>, AppError> {
    info!(
        "Professor {} updating levels of group {}",
        payload.professor_id, payload.group_id
    );
    debug!("Set group levels payload: {:?}", payload);

    helper::write(&store, move |tree| {
        helper::check_active_professor(tree, &payload.professor_id)?;
        helper::check_professor_group_permission(
            tree,
            &payload.professor_id,
            &payload.group_id,
        )?;

        let Some(group) = tree.find_group_mut(&payload.group_id) else {
            error!("Group with ID {} not found.", payload.group_id);
            return Err(AppError::NotFound(format!(
                "Group with ID {} not found.",
                payload.group_id
            )));
        };

        group.levels.extend(payload.levels);
        Ok(ApiResponse::ok(group.levels.clone()))
    })
    .await
}

/// Retrieves a student's score breakdown, last game and every played session.
///
/// Query Parameters:
/// * `professor_id`: The calling professor.
/// * `student_id`: A student of one of the professor's groups.
///
/// Returns (wrapped in `ApiResponse`)
/// * `StudentProgressResponse` (200 OK).
/// * `403 Forbidden`: If the student is outside the professor's groups.
/// * `404 Not Found`: If the student does not exist.
#[instrument(skip(store, params))]
pub async fn get_student_progress(
    State(store): State<Store>,
    Query(params): Query<ProfessorStudentParams>,
) -> Result<ApiResponse<StudentProgressResponse>, AppError> {
    info!(
        "Professor {} fetching progress of student {}",
        params.professor_id, params.student_id
    );

    helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;
        helper::check_professor_student_permission(
            tree,
            &params.professor_id,
            &params.student_id,
        )?;

        let Some(progress) = tree.progress.get(&params.student_id) else {
            debug!("Student {} has no progress yet", params.student_id);
            return Ok(ApiResponse::ok(StudentProgressResponse {
                score: calculate_user_score(&Default::default()),
                last_game: None,
                sessions: Vec::new(),
            }));
        };

        let mut sessions = Vec::new();
        for (level, level_sessions) in progress {
            for (session_key, session) in level_sessions {
                let results = session.sections.values();
                sessions.push(SessionSummary {
                    level: level.clone(),
                    session_key: session_key.clone(),
                    played_at: SessionKey::parse(session_key).ok().map(|k| k.played_at),
                    sections_played: session.sections.len(),
                    score: results.clone().map(|r| r.score).sum(),
                    attempts: results.clone().map(|r| u64::from(r.attempts)).sum(),
                    time: results.map(|r| r.time).sum(),
                });
            }
        }
        sessions.sort_by(|a, b| b.played_at.cmp(&a.played_at));

        Ok(ApiResponse::ok(StudentProgressResponse {
            score: calculate_user_score(progress),
            last_game: last_game(progress),
            sessions,
        }))
    })
    .await
}

/// Ranks the students of a group by final score, highest first. Demo accounts are left
/// out.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<StudentStatistics>` (200 OK).
/// * `403 Forbidden`: If the professor is not assigned to the group.
/// * `404 Not Found`: If the group does not exist.
#[instrument(skip(store, params))]
pub async fn get_group_statistics(
    State(store): State<Store>,
    Query(params): Query<ProfessorGroupParams>,
) -> Result<ApiResponse<Vec<StudentStatistics>>, AppError> {
    info!(
        "Professor {} fetching statistics of group {}",
        params.professor_id, params.group_id
    );

    helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;
        helper::check_professor_group_permission(tree, &params.professor_id, &params.group_id)?;

        let empty = Default::default();
        let mut statistics: Vec<StudentStatistics> = tree
            .students_in_group(&params.group_id)
            .filter(|(_, u)| !u.demo)
            .map(|(uid, user)| {
                let progress = tree.progress.get(uid).unwrap_or(&empty);
                let score = calculate_user_score(progress);
                StudentStatistics {
                    uid: uid.clone(),
                    email: user.email.clone(),
                    name: user.name.clone(),
                    last_name: user.last_name.clone(),
                    validated: user.validated,
                    score: score.final_score,
                    game_sessions: score.game_sessions,
                    last_game: last_game(progress),
                }
            })
            .collect();

        statistics.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ApiResponse::ok(statistics))
    })
    .await
}

/// Per-group, per-section pass counts over the professor's groups.
#[instrument(skip(store, params))]
pub async fn get_export_summary(
    State(store): State<Store>,
    Query(params): Query<ProfessorParams>,
) -> Result<ApiResponse<Vec<GroupSectionSummary>>, AppError> {
    info!(
        "Building export summary for professor {}",
        params.professor_id
    );

    helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;
        let group_ids = tree.professor_group_ids(&params.professor_id);
        let (_, summaries) = helper::build_export(tree, &group_ids);
        Ok(ApiResponse::ok(summaries))
    })
    .await
}

/// Downloads the progress of the professor's groups as an XLSX workbook.
#[instrument(skip(store, params))]
pub async fn export_progress(
    State(store): State<Store>,
    Query(params): Query<ProfessorParams>,
) -> Result<XlsxFile, AppError> {
    info!("Exporting progress for professor {}", params.professor_id);

    let (rows, summaries) = helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;
        let group_ids = tree.professor_group_ids(&params.professor_id);
        Ok(helper::build_export(tree, &group_ids))
    })
    .await?;

    let bytes = write_workbook(&rows, &summaries)?;
    info!("Exported {} progress rows", rows.len());

    Ok(XlsxFile {
        filename: format!("progress_{}.xlsx", Utc::now().format("%Y%m%d")),
        bytes,
    })
}

/// Publishes an announcement to some of the professor's groups.
///
/// Request Body: `ProfessorPostAnnouncementPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `String`: storage key of the announcement (200 OK).
/// * `403 Forbidden`: If a target group is not the professor's.
/// * `404 Not Found`: If a target group does not exist.
/// * `422 Unprocessable Entity`: If the text is blank or no group is targeted.
#[instrument(skip(store, payload))]
pub async fn post_announcement(
    State(store): State<Store>,
    Json(payload): Json<ProfessorPostAnnouncementPayload>,
) -> Result<ApiResponse<String>, AppError> {
    info!(
        "Professor {} posting announcement '{}'",
        payload.professor_id, payload.title
    );
    debug!("Post announcement payload: {:?}", payload);

    helper::validate_announcement_text(&payload.title, &payload.content)?;
    if payload.target_groups.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "An announcement needs at least one target group.".to_string(),
        ));
    }

    helper::write(&store, move |tree| {
        helper::check_active_professor(tree, &payload.professor_id)?;
        for group_id in &payload.target_groups {
            helper::check_professor_group_permission(tree, &payload.professor_id, group_id)?;
        }

        let key = push_key();
        tree.announcements.insert(
            key.clone(),
            Announcement {
                professor_id: payload.professor_id,
                content: payload.content,
                title: payload.title,
                timestamp: Utc::now().timestamp_millis(),
                target_groups: payload.target_groups,
                is_global: false,
            },
        );
        info!("Announcement {} stored", key);
        Ok(ApiResponse::ok(key))
    })
    .await
}

/// Lists the professor's own announcements, newest first.
#[instrument(skip(store, params))]
pub async fn list_announcements(
    State(store): State<Store>,
    Query(params): Query<ProfessorParams>,
) -> Result<ApiResponse<Vec<AnnouncementResponse>>, AppError> {
    helper::read(&store, |tree| {
        helper::check_active_professor(tree, &params.professor_id)?;

        let mut announcements: Vec<AnnouncementResponse> = tree
            .announcements
            .iter()
            .filter(|(_, a)| a.professor_id == params.professor_id)
            .map(|(key, a)| helper::announcement_response(key, a))
            .collect();
        announcements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(ApiResponse::ok(announcements))
    })
    .await
}

/// Deletes one of the professor's own announcements.
///
/// Request Body: `DeleteAnnouncementPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool` (200 OK).
/// * `403 Forbidden`: If the announcement belongs to someone else.
/// * `404 Not Found`: If the announcement does not exist.
#[instrument(skip(store, payload))]
pub async fn delete_announcement(
    State(store): State<Store>,
    Json(payload): Json<DeleteAnnouncementPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Professor {} deleting announcement {}",
        payload.professor_id, payload.announcement_key
    );

    helper::write(&store, move |tree| {
        helper::check_active_professor(tree, &payload.professor_id)?;

        let Some(announcement) = tree.announcements.get(&payload.announcement_key) else {
            error!("Announcement {} not found.", payload.announcement_key);
            return Err(AppError::NotFound(format!(
                "Announcement {} not found.",
                payload.announcement_key
            )));
        };

        if announcement.professor_id != payload.professor_id {
            warn!(
                "Professor {} tried to delete announcement {} of {}",
                payload.professor_id, payload.announcement_key, announcement.professor_id
            );
            return Err(AppError::Forbidden(
                "Only the author can delete an announcement.".to_string(),
            ));
        }

        tree.announcements.remove(&payload.announcement_key);
        Ok(ApiResponse::ok(true))
    })
    .await
}
