use super::helper;
use crate::errors::AppError;
use crate::model::auth::{LoginResponse, Role};
use crate::model::entities::{AccountStatus, Professor, User};
use crate::payloads::auth::{
    LoginPayload, RegisterProfessorPayload, RegisterStudentPayload, WhoAmIParams,
};
use crate::response::ApiResponse;
use crate::store::Store;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

fn check_profile_fields(uid: &str, email: &str, name: &str) -> Result<(), AppError> {
    if uid.trim().is_empty() || email.trim().is_empty() || name.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "uid, email and name must not be empty.".to_string(),
        ));
    }
    Ok(())
}

/// Registers a new student profile for an authenticated uid.
///
/// Request Body: `RegisterStudentPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the profile was created (200 OK).
/// * `409 Conflict`: If the uid already has a profile under any role.
/// * `422 Unprocessable Entity`: If a required field is blank.
#[instrument(skip(store, payload))]
pub async fn register_student(
    State(store): State<Store>,
    Json(payload): Json<RegisterStudentPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!("Attempting to register student {}", payload.uid);
    debug!("Register student payload: {:?}", payload);

    check_profile_fields(&payload.uid, &payload.email, &payload.name)?;

    helper::write(&store, move |tree| {
        if tree.uid_exists(&payload.uid) {
            warn!("Cannot register student: uid {} already exists.", payload.uid);
            return Err(AppError::Conflict(format!(
                "User {} is already registered.",
                payload.uid
            )));
        }

        tree.users.insert(
            payload.uid.clone(),
            User {
                email: payload.email,
                name: payload.name,
                last_name: payload.last_name,
                group: String::new(),
                validated: false,
                status: AccountStatus::Active,
                demo: payload.demo,
            },
        );
        info!("Student {} registered, awaiting validation", payload.uid);
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Registers a new professor profile. Professors start `pending` until an administrator
/// approves them.
///
/// Request Body: `RegisterProfessorPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the profile was created (200 OK).
/// * `409 Conflict`: If the uid already has a profile under any role.
/// * `422 Unprocessable Entity`: If a required field is blank.
#[instrument(skip(store, payload))]
pub async fn register_professor(
    State(store): State<Store>,
    Json(payload): Json<RegisterProfessorPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!("Attempting to register professor {}", payload.uid);
    debug!("Register professor payload: {:?}", payload);

    check_profile_fields(&payload.uid, &payload.email, &payload.name)?;

    helper::write(&store, move |tree| {
        if tree.uid_exists(&payload.uid) {
            warn!(
                "Cannot register professor: uid {} already exists.",
                payload.uid
            );
            return Err(AppError::Conflict(format!(
                "User {} is already registered.",
                payload.uid
            )));
        }

        tree.professors.insert(
            payload.uid.clone(),
            Professor {
                email: payload.email,
                name: payload.name,
                last_name: payload.last_name,
                status: AccountStatus::Pending,
                first_log_time: None,
            },
        );
        info!("Professor {} registered as pending", payload.uid);
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Resolves the role of an authenticated uid and admits it into the platform.
///
/// Professors are admitted only when active; their first admission is recorded. No other
/// login touches the data file.
///
/// Request Body: `LoginPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `LoginResponse` (200 OK).
/// * `403 Forbidden`: If the professor is pending, rejected or blocked, or the student is blocked.
/// * `404 Not Found`: If the uid has no profile.
#[instrument(skip(store, payload))]
pub async fn login(
    State(store): State<Store>,
    Json(payload): Json<LoginPayload>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let uid = payload.uid;
    info!("Login attempt for uid {}", uid);

    let (login, first_login) = helper::read(&store, |tree| {
        if let Some(admin) = tree.admin.get(&uid) {
            info!("Administrator {} logged in", uid);
            let login = LoginResponse {
                uid: uid.clone(),
                role: Role::Admin,
                email: admin.email.clone(),
                name: admin.name.clone(),
                last_name: String::new(),
                validated: true,
            };
            return Ok((login, false));
        }

        if let Some(professor) = tree.professors.get(&uid) {
            let message = match professor.status {
                AccountStatus::Active => None,
                AccountStatus::Pending => Some("Your account is awaiting approval."),
                AccountStatus::Rejected => Some("Your registration was rejected."),
                AccountStatus::Blocked => Some("Your account has been blocked."),
            };
            if let Some(message) = message {
                warn!(
                    "Professor {} refused at login: status {}",
                    uid,
                    professor.status.as_str()
                );
                return Err(AppError::Forbidden(message.to_string()));
            }

            info!("Professor {} logged in", uid);
            let login = LoginResponse {
                uid: uid.clone(),
                role: Role::Professor,
                email: professor.email.clone(),
                name: professor.name.clone(),
                last_name: professor.last_name.clone(),
                validated: true,
            };
            return Ok((login, professor.first_log_time.is_none()));
        }

        if let Some(student) = tree.users.get(&uid) {
            if student.status == AccountStatus::Blocked {
                warn!("Blocked student {} refused at login", uid);
                return Err(AppError::Forbidden(
                    "Your account has been blocked.".to_string(),
                ));
            }

            info!("Student {} logged in (validated: {})", uid, student.validated);
            let login = LoginResponse {
                uid: uid.clone(),
                role: Role::Student,
                email: student.email.clone(),
                name: student.name.clone(),
                last_name: student.last_name.clone(),
                validated: student.validated,
            };
            return Ok((login, false));
        }

        error!("Login failed: uid {} has no profile.", uid);
        Err(AppError::NotFound(format!("User {} not found.", uid)))
    })
    .await?;

    if first_login {
        helper::write(&store, |tree| {
            if let Some(professor) = tree.professors.get_mut(&uid) {
                if professor.first_log_time.is_none() {
                    professor.first_log_time = Some(Utc::now().timestamp_millis());
                    info!("Recorded first login of professor {}", uid);
                }
            }
            Ok(())
        })
        .await?;
    }

    Ok(ApiResponse::ok(login))
}

/// Looks up which role a uid holds.
///
/// Query Parameters:
/// * `uid`: The authenticated user id.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Role` (200 OK).
/// * `404 Not Found`: If the uid has no profile.
#[instrument(skip(store, params))]
pub async fn whoami(
    State(store): State<Store>,
    Query(params): Query<WhoAmIParams>,
) -> Result<ApiResponse<Role>, AppError> {
    debug!("Who am I params: {:?}", params);

    helper::read(&store, |tree| {
        let role = if tree.admin.contains_key(&params.uid) {
            Role::Admin
        } else if tree.professors.contains_key(&params.uid) {
            Role::Professor
        } else if tree.users.contains_key(&params.uid) {
            Role::Student
        } else {
            return Err(AppError::NotFound(format!("User {} not found.", params.uid)));
        };

        Ok(ApiResponse::ok(role))
    })
    .await
}
