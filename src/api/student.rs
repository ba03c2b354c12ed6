use super::helper;
use crate::errors::AppError;
use crate::model::entities::{AccountStatus, GameSession};
use crate::model::professor::AnnouncementResponse;
use crate::model::student::{StudentProfileResponse, StudentScoreResponse};
use crate::payloads::student::{CheckAnswerPayload, SaveGameSessionPayload, StudentParams};
use crate::response::ApiResponse;
use crate::scoring::{Section, calculate_user_score, is_answer_correct, last_game};
use crate::session_key::{SessionKey, level_number};
use crate::store::Store;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Local;
use tracing::{debug, error, info, instrument, warn};

/// Retrieves the student's profile together with the name and level access of their group.
///
/// Query Parameters:
/// * `student_id`: The student to look up.
///
/// Returns (wrapped in `ApiResponse`)
/// * `StudentProfileResponse` (200 OK).
/// * `404 Not Found`: If the student does not exist.
#[instrument(skip(store, params))]
pub async fn get_profile(
    State(store): State<Store>,
    Query(params): Query<StudentParams>,
) -> Result<ApiResponse<StudentProfileResponse>, AppError> {
    info!("Fetching profile of student {}", params.student_id);

    helper::read(&store, |tree| {
        let student = helper::find_student(tree, &params.student_id)?;

        let group = student
            .has_group()
            .then(|| tree.find_group(&student.group))
            .flatten()
            .map(|(_, g)| g);
        if student.has_group() && group.is_none() {
            warn!(
                "Student {} points at missing group {}",
                params.student_id, student.group
            );
        }

        Ok(ApiResponse::ok(StudentProfileResponse {
            email: student.email.clone(),
            name: student.name.clone(),
            last_name: student.last_name.clone(),
            group_id: student.group.clone(),
            group_name: group.map(|g| g.group_name.clone()),
            validated: student.validated,
            levels: group.map(|g| g.levels.clone()).unwrap_or_default(),
        }))
    })
    .await
}

/// Announcements visible to the student: global ones plus those targeting their group,
/// newest first.
#[instrument(skip(store, params))]
pub async fn get_announcements(
    State(store): State<Store>,
    Query(params): Query<StudentParams>,
) -> Result<ApiResponse<Vec<AnnouncementResponse>>, AppError> {
    info!("Fetching announcements for student {}", params.student_id);

    helper::read(&store, |tree| {
        let student = helper::find_student(tree, &params.student_id)?;

        let mut announcements: Vec<AnnouncementResponse> = tree
            .announcements
            .iter()
            .filter(|(_, a)| a.visible_to_group(&student.group))
            .map(|(key, a)| helper::announcement_response(key, a))
            .collect();
        announcements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        debug!(
            "{} announcements visible to student {}",
            announcements.len(),
            params.student_id
        );
        Ok(ApiResponse::ok(announcements))
    })
    .await
}

/// Computes the student's score over their whole progress.
///
/// Returns (wrapped in `ApiResponse`)
/// * `StudentScoreResponse`: score breakdown and last game (200 OK).
/// * `404 Not Found`: If the student does not exist.
#[instrument(skip(store, params))]
pub async fn get_score(
    State(store): State<Store>,
    Query(params): Query<StudentParams>,
) -> Result<ApiResponse<StudentScoreResponse>, AppError> {
    info!("Computing score of student {}", params.student_id);

    helper::read(&store, |tree| {
        helper::find_student(tree, &params.student_id)?;

        let empty = Default::default();
        let progress = tree.progress.get(&params.student_id).unwrap_or(&empty);
        let score = calculate_user_score(progress);

        info!(
            "Student {} scored {} over {} sessions",
            params.student_id, score.final_score, score.game_sessions
        );
        Ok(ApiResponse::ok(StudentScoreResponse {
            score,
            last_game: last_game(progress),
        }))
    })
    .await
}

/// Stores a finished game session under `progress/{student}/{level}/{session_key}`.
///
/// Request Body: `SaveGameSessionPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `String`: the session key the session was stored under (200 OK).
/// * `403 Forbidden`: If progress saving is disabled, the student is blocked, or the
///   student's group has the level closed.
/// * `404 Not Found`: If the student does not exist.
/// * `409 Conflict`: If a session with the same key already exists.
/// * `422 Unprocessable Entity`: If the session key does not parse or names another level, or
///   no key can be derived from the level.
#[instrument(skip(store, payload))]
pub async fn save_game_session(
    State(store): State<Store>,
    Json(payload): Json<SaveGameSessionPayload>,
) -> Result<ApiResponse<String>, AppError> {
    info!(
        "Saving session of level {} for student {}",
        payload.level, payload.student_id
    );
    debug!("Save game session payload: {:?}", payload);

    let session_key = match &payload.session_key {
        Some(key) => {
            let parsed = SessionKey::parse(key)?;
            if let Some(level) = level_number(&payload.level) {
                if parsed.level != level {
                    warn!(
                        "Session key {} does not belong to level {}",
                        key, payload.level
                    );
                    return Err(AppError::UnprocessableEntity(format!(
                        "Session key {} does not belong to level {}.",
                        key, payload.level
                    )));
                }
            }
            key.clone()
        }
        None => {
            let level = level_number(&payload.level).ok_or_else(|| {
                AppError::UnprocessableEntity(format!(
                    "Cannot derive a session key from level '{}'.",
                    payload.level
                ))
            })?;
            SessionKey::new(level, Local::now().naive_local()).to_string()
        }
    };

    helper::write(&store, move |tree| {
        if !tree.db_enabled {
            warn!("Progress saving is disabled, refusing session {}", session_key);
            return Err(AppError::Forbidden(
                "Saving progress is currently disabled.".to_string(),
            ));
        }

        let student = helper::find_student(tree, &payload.student_id)?;
        if student.status == AccountStatus::Blocked {
            warn!("Blocked student {} tried to save a session", payload.student_id);
            return Err(AppError::Forbidden(
                "Your account has been blocked.".to_string(),
            ));
        }

        if student.has_group()
            && tree
                .find_group(&student.group)
                .is_some_and(|(_, g)| !g.level_enabled(&payload.level))
        {
            warn!(
                "Level {} is closed for group {} of student {}",
                payload.level, student.group, payload.student_id
            );
            return Err(AppError::Forbidden(format!(
                "Level {} is not available for your group.",
                payload.level
            )));
        }

        let sessions = tree
            .progress
            .entry(payload.student_id.clone())
            .or_default()
            .entry(payload.level.clone())
            .or_default();
        if sessions.contains_key(&session_key) {
            error!(
                "Session {} already exists for student {}",
                session_key, payload.student_id
            );
            return Err(AppError::Conflict(format!(
                "Session {} already exists.",
                session_key
            )));
        }

        sessions.insert(
            session_key.clone(),
            GameSession {
                data: payload.data,
                sections: payload.sections,
            },
        );
        info!(
            "Session {} stored for student {}",
            session_key, payload.student_id
        );
        Ok(ApiResponse::ok(session_key))
    })
    .await
}

/// Checks a numeric answer against the session parameters using the stored tolerance.
///
/// Request Body: `CheckAnswerPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: whether the answer is within tolerance (200 OK).
/// * `422 Unprocessable Entity`: If the section is unknown.
#[instrument(skip(store, payload))]
pub async fn check_answer(
    State(store): State<Store>,
    Json(payload): Json<CheckAnswerPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    debug!("Check answer payload: {:?}", payload);

    if Section::from_key(&payload.section).is_none() {
        return Err(AppError::UnprocessableEntity(format!(
            "Unknown section '{}'.",
            payload.section
        )));
    }

    helper::read(&store, |tree| {
        let tolerance = tree.global_values.tolerance();
        let correct = is_answer_correct(&payload.section, payload.answer, &payload.data, tolerance);
        info!(
            "Answer {} for {} is {} (tolerance {})",
            payload.answer,
            payload.section,
            if correct { "correct" } else { "incorrect" },
            tolerance
        );
        Ok(ApiResponse::ok(correct))
    })
    .await
}
