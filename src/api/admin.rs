use super::helper;
use crate::errors::AppError;
use crate::export::{GroupSectionSummary, write_workbook};
use crate::model::admin::{CreatedGroupResponse, GroupSummary, ProfessorSummary, StudentSummary};
use crate::model::entities::{Announcement, Level};
use crate::payloads::admin::{
    AdminListStudentsParams, AdminParams, AdminPostAnnouncementPayload,
    AdminSetStudentGroupPayload, AssignProfessorPayload, CreateGroupPayload,
    DeleteGroupPayload, DeleteProfessorPayload, DeleteStudentPayload, ListProfessorsParams,
    RenameGroupPayload, SetDbEnabledPayload, SetProfessorStatusPayload, SetTolerancePayload,
    UnassignProfessorPayload, UpsertLevelPayload,
};
use crate::response::{ApiResponse, XlsxFile};
use crate::store::{DataTree, GroupDeletion, Store, push_key};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, error, info, instrument, warn};

/// Lists professors, optionally filtered by account status.
///
/// Query Parameters:
/// * `admin_id`: The calling administrator.
/// * `status`: Optional status filter (`pending`, `active`, `rejected`, `blocked`).
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<ProfessorSummary>` (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
#[instrument(skip(store, params))]
pub async fn list_professors(
    State(store): State<Store>,
    Query(params): Query<ListProfessorsParams>,
) -> Result<ApiResponse<Vec<ProfessorSummary>>, AppError> {
    info!("Listing professors for admin {}", params.admin_id);
    debug!("List professors params: {:?}", params);

    helper::read(&store, |tree| {
        helper::check_admin(tree, &params.admin_id)?;

        let professors: Vec<ProfessorSummary> = tree
            .professors
            .iter()
            .filter(|(_, p)| params.status.is_none_or(|s| p.status == s))
            .map(|(uid, p)| ProfessorSummary {
                uid: uid.clone(),
                email: p.email.clone(),
                name: p.name.clone(),
                last_name: p.last_name.clone(),
                status: p.status,
                first_log_time: p.first_log_time,
            })
            .collect();

        info!("Found {} professors", professors.len());
        Ok(ApiResponse::ok(professors))
    })
    .await
}

/// Approves, rejects, blocks or reactivates a professor.
///
/// Request Body: `SetProfessorStatusPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true once the status is stored (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the professor does not exist.
#[instrument(skip(store, payload))]
pub async fn set_professor_status(
    State(store): State<Store>,
    Json(payload): Json<SetProfessorStatusPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Setting status of professor {} to {} (admin {})",
        payload.professor_id,
        payload.status.as_str(),
        payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        let Some(professor) = tree.professors.get_mut(&payload.professor_id) else {
            error!("Professor with ID {} not found.", payload.professor_id);
            return Err(AppError::NotFound(format!(
                "Professor with ID {} not found.",
                payload.professor_id
            )));
        };

        professor.status = payload.status;
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Deletes a professor and every group assignment they hold.
///
/// Request Body: `DeleteProfessorPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool`: true if the professor was deleted (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the professor does not exist.
#[instrument(skip(store, payload))]
pub async fn delete_professor(
    State(store): State<Store>,
    Json(payload): Json<DeleteProfessorPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Attempting to delete professor {} (admin {})",
        payload.professor_id, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        if !tree.delete_professor(&payload.professor_id) {
            error!("Professor with ID {} not found.", payload.professor_id);
            return Err(AppError::NotFound(format!(
                "Professor with ID {} not found.",
                payload.professor_id
            )));
        }

        info!("Professor {} deleted", payload.professor_id);
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Lists every group with its assigned professors and student count.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<GroupSummary>` (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
#[instrument(skip(store, params))]
pub async fn list_groups(
    State(store): State<Store>,
    Query(params): Query<AdminParams>,
) -> Result<ApiResponse<Vec<GroupSummary>>, AppError> {
    info!("Listing groups for admin {}", params.admin_id);

    helper::read(&store, |tree| {
        helper::check_admin(tree, &params.admin_id)?;

        let groups: Vec<GroupSummary> = tree
            .groups
            .iter()
            .map(|(key, group)| helper::group_summary(tree, key, group))
            .collect();

        Ok(ApiResponse::ok(groups))
    })
    .await
}

/// Creates a group with a fresh `group_id` and the default level access map.
///
/// Request Body: `CreateGroupPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `CreatedGroupResponse`: storage key and public group id (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `422 Unprocessable Entity`: If the group name is blank.
#[instrument(skip(store, payload))]
pub async fn create_group(
    State(store): State<Store>,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<ApiResponse<CreatedGroupResponse>, AppError> {
    info!(
        "Attempting to create group '{}' (admin {})",
        payload.group_name, payload.admin_id
    );

    let group_name = payload.group_name.trim().to_string();
    if group_name.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Group name must not be empty.".to_string(),
        ));
    }

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        let (key, group_id) = tree.create_group(group_name);
        info!("Group {} created under key {}", group_id, key);
        Ok(ApiResponse::ok(CreatedGroupResponse { key, group_id }))
    })
    .await
}

/// Renames a group.
///
/// Request Body: `RenameGroupPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool` (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the group does not exist.
/// * `422 Unprocessable Entity`: If the new name is blank.
#[instrument(skip(store, payload))]
pub async fn rename_group(
    State(store): State<Store>,
    Json(payload): Json<RenameGroupPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Renaming group {} to '{}' (admin {})",
        payload.group_id, payload.group_name, payload.admin_id
    );

    let group_name = payload.group_name.trim().to_string();
    if group_name.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Group name must not be empty.".to_string(),
        ));
    }

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        let Some(group) = tree.find_group_mut(&payload.group_id) else {
            error!("Group with ID {} not found.", payload.group_id);
            return Err(AppError::NotFound(format!(
                "Group with ID {} not found.",
                payload.group_id
            )));
        };

        group.group_name = group_name;
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Deletes a group: removes the group row and its professor assignments, and detaches its
/// students. All three steps are applied together or not at all.
///
/// Request Body: `DeleteGroupPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `GroupDeletion`: counts of removed assignments and detached students (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the group does not exist.
#[instrument(skip(store, payload))]
pub async fn delete_group(
    State(store): State<Store>,
    Json(payload): Json<DeleteGroupPayload>,
) -> Result<ApiResponse<GroupDeletion>, AppError> {
    info!(
        "Attempting to delete group {} (admin {})",
        payload.group_id, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        let deletion = tree.delete_group(&payload.group_id).ok_or_else(|| {
            error!("Group with ID {} not found.", payload.group_id);
            AppError::NotFound(format!("Group with ID {} not found.", payload.group_id))
        })?;

        Ok(ApiResponse::ok(deletion))
    })
    .await
}

/// Assigns a professor to a group. The same assignment may be stored more than once.
///
/// Request Body: `AssignProfessorPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `String`: storage key of the new assignment (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the group or the professor does not exist.
#[instrument(skip(store, payload))]
pub async fn assign_professor(
    State(store): State<Store>,
    Json(payload): Json<AssignProfessorPayload>,
) -> Result<ApiResponse<String>, AppError> {
    info!(
        "Assigning professor {} to group {} (admin {})",
        payload.professor_id, payload.group_id, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;
        helper::find_group(tree, &payload.group_id)?;

        let Some(professor) = tree.professors.get(&payload.professor_id) else {
            error!("Professor with ID {} not found.", payload.professor_id);
            return Err(AppError::NotFound(format!(
                "Professor with ID {} not found.",
                payload.professor_id
            )));
        };
        let email = professor.email.clone();

        if tree.professor_in_group(&payload.professor_id, &payload.group_id) {
            warn!(
                "Professor {} already assigned to group {}, storing another link",
                payload.professor_id, payload.group_id
            );
        }

        let key = tree.attach_professor(&payload.group_id, &payload.professor_id, &email);
        Ok(ApiResponse::ok(key))
    })
    .await
}

/// Removes every assignment of a professor to a group.
///
/// Request Body: `UnassignProfessorPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `usize`: number of assignment rows removed (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If no such assignment exists.
#[instrument(skip(store, payload))]
pub async fn unassign_professor(
    State(store): State<Store>,
    Json(payload): Json<UnassignProfessorPayload>,
) -> Result<ApiResponse<usize>, AppError> {
    info!(
        "Unassigning professor {} from group {} (admin {})",
        payload.professor_id, payload.group_id, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        let removed = tree.detach_professor(&payload.group_id, &payload.professor_id);
        if removed == 0 {
            error!(
                "Professor {} is not assigned to group {}.",
                payload.professor_id, payload.group_id
            );
            return Err(AppError::NotFound(format!(
                "Professor {} is not assigned to group {}.",
                payload.professor_id, payload.group_id
            )));
        }

        Ok(ApiResponse::ok(removed))
    })
    .await
}

/// Lists students, optionally only those of one group.
///
/// Query Parameters:
/// * `admin_id`: The calling administrator.
/// * `group_id`: Optional group filter.
///
/// Returns (wrapped in `ApiResponse`)
/// * `Vec<StudentSummary>` (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the group filter names an unknown group.
#[instrument(skip(store, params))]
pub async fn list_students(
    State(store): State<Store>,
    Query(params): Query<AdminListStudentsParams>,
) -> Result<ApiResponse<Vec<StudentSummary>>, AppError> {
    info!("Listing students for admin {}", params.admin_id);
    debug!("List students params: {:?}", params);

    helper::read(&store, |tree| {
        helper::check_admin(tree, &params.admin_id)?;

        let students: Vec<StudentSummary> = match &params.group_id {
            Some(group_id) => {
                helper::find_group(tree, group_id)?;
                tree.students_in_group(group_id)
                    .map(|(uid, u)| helper::student_summary(uid, u))
                    .collect()
            }
            None => tree
                .users
                .iter()
                .map(|(uid, u)| helper::student_summary(uid, u))
                .collect(),
        };

        Ok(ApiResponse::ok(students))
    })
    .await
}

/// Moves a student into a group, or out of any group with an empty `group_id`.
///
/// Request Body: `AdminSetStudentGroupPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool` (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the student or group does not exist.
#[instrument(skip(store, payload))]
pub async fn set_student_group(
    State(store): State<Store>,
    Json(payload): Json<AdminSetStudentGroupPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Setting group of student {} to '{}' (admin {})",
        payload.student_id, payload.group_id, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;
        if !payload.group_id.is_empty() {
            helper::find_group(tree, &payload.group_id)?;
        }
        helper::find_student(tree, &payload.student_id)?;

        if let Some(student) = tree.users.get_mut(&payload.student_id) {
            student.group = payload.group_id;
        }
        Ok(ApiResponse::ok(true))
    })
    .await
}

/// Deletes a student together with their progress.
///
/// Request Body: `DeleteStudentPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `bool` (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If the student does not exist.
#[instrument(skip(store, payload))]
pub async fn delete_student(
    State(store): State<Store>,
    Json(payload): Json<DeleteStudentPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Attempting to delete student {} (admin {})",
        payload.student_id, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;

        if !tree.delete_student(&payload.student_id) {
            error!("Student with ID {} not found.", payload.student_id);
            return Err(AppError::NotFound(format!(
                "Student with ID {} not found.",
                payload.student_id
            )));
        }

        Ok(ApiResponse::ok(true))
    })
    .await
}

#[instrument(skip(store, params))]
pub async fn get_tolerance(
    State(store): State<Store>,
    Query(params): Query<AdminParams>,
) -> Result<ApiResponse<f64>, AppError> {
    helper::read(&store, |tree| {
        helper::check_admin(tree, &params.admin_id)?;
        Ok(ApiResponse::ok(tree.global_values.tolerance()))
    })
    .await
}

/// Stores the answer tolerance used by every correctness check.
///
/// Request Body: `SetTolerancePayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `f64`: the stored tolerance (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `422 Unprocessable Entity`: If the tolerance is negative or not finite.
#[instrument(skip(store, payload))]
pub async fn set_tolerance(
    State(store): State<Store>,
    Json(payload): Json<SetTolerancePayload>,
) -> Result<ApiResponse<f64>, AppError> {
    info!(
        "Setting tolerance to {} (admin {})",
        payload.tolerance, payload.admin_id
    );

    if !payload.tolerance.is_finite() || payload.tolerance < 0.0 {
        warn!("Rejecting tolerance value {}", payload.tolerance);
        return Err(AppError::UnprocessableEntity(format!(
            "Tolerance must be a non-negative number, got {}.",
            payload.tolerance
        )));
    }

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;
        tree.global_values.tolerance_value = Some(payload.tolerance);
        Ok(ApiResponse::ok(payload.tolerance))
    })
    .await
}

/// Switches game-progress writes on or off.
#[instrument(skip(store, payload))]
pub async fn set_db_enabled(
    State(store): State<Store>,
    Json(payload): Json<SetDbEnabledPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Setting db_enabled to {} (admin {})",
        payload.enabled, payload.admin_id
    );

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;
        tree.db_enabled = payload.enabled;
        Ok(ApiResponse::ok(payload.enabled))
    })
    .await
}

/// Adds a level to the catalogue or renames an existing one. Existing groups keep their
/// access maps; a missing entry means the level is playable.
#[instrument(skip(store, payload))]
pub async fn upsert_level(
    State(store): State<Store>,
    Json(payload): Json<UpsertLevelPayload>,
) -> Result<ApiResponse<bool>, AppError> {
    info!(
        "Upserting level {} as '{}' (admin {})",
        payload.level_key, payload.name, payload.admin_id
    );

    if payload.level_key.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Level key must not be empty.".to_string(),
        ));
    }

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;
        let created = tree
            .levels
            .insert(payload.level_key, Level { name: payload.name })
            .is_none();
        Ok(ApiResponse::ok(created))
    })
    .await
}

/// Publishes an announcement, either global or targeted at specific groups.
///
/// Request Body: `AdminPostAnnouncementPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `String`: storage key of the announcement (200 OK).
/// * `403 Forbidden`: If the caller is not an administrator.
/// * `404 Not Found`: If a target group does not exist.
/// * `422 Unprocessable Entity`: If the text is blank, or it is neither global nor targeted.
#[instrument(skip(store, payload))]
pub async fn post_announcement(
    State(store): State<Store>,
    Json(payload): Json<AdminPostAnnouncementPayload>,
) -> Result<ApiResponse<String>, AppError> {
    info!(
        "Admin {} posting announcement '{}' (global: {})",
        payload.admin_id, payload.title, payload.is_global
    );
    debug!("Post announcement payload: {:?}", payload);

    helper::validate_announcement_text(&payload.title, &payload.content)?;
    if !payload.is_global && payload.target_groups.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "A non-global announcement needs at least one target group.".to_string(),
        ));
    }

    helper::write(&store, move |tree| {
        helper::check_admin(tree, &payload.admin_id)?;
        for group_id in &payload.target_groups {
            helper::find_group(tree, group_id)?;
        }

        let key = push_key();
        tree.announcements.insert(
            key.clone(),
            Announcement {
                professor_id: payload.admin_id,
                content: payload.content,
                title: payload.title,
                timestamp: Utc::now().timestamp_millis(),
                target_groups: payload.target_groups,
                is_global: payload.is_global,
            },
        );
        Ok(ApiResponse::ok(key))
    })
    .await
}

fn all_group_ids(tree: &DataTree) -> BTreeSet<String> {
    tree.groups.values().map(|g| g.group_id.clone()).collect()
}

/// Per-group, per-section pass counts over every group.
#[instrument(skip(store, params))]
pub async fn get_export_summary(
    State(store): State<Store>,
    Query(params): Query<AdminParams>,
) -> Result<ApiResponse<Vec<GroupSectionSummary>>, AppError> {
    info!("Building export summary for admin {}", params.admin_id);

    helper::read(&store, |tree| {
        helper::check_admin(tree, &params.admin_id)?;
        let (_, summaries) = helper::build_export(tree, &all_group_ids(tree));
        Ok(ApiResponse::ok(summaries))
    })
    .await
}

/// Downloads the progress of every group as an XLSX workbook.
#[instrument(skip(store, params))]
pub async fn export_progress(
    State(store): State<Store>,
    Query(params): Query<AdminParams>,
) -> Result<XlsxFile, AppError> {
    info!("Exporting progress of all groups for admin {}", params.admin_id);

    let (rows, summaries) = helper::read(&store, |tree| {
        helper::check_admin(tree, &params.admin_id)?;
        Ok(helper::build_export(tree, &all_group_ids(tree)))
    })
    .await?;

    let bytes = write_workbook(&rows, &summaries)?;
    info!("Exported {} progress rows", rows.len());

    Ok(XlsxFile {
        filename: format!("progress_all_{}.xlsx", Utc::now().format("%Y%m%d")),
        bytes,
    })
}
