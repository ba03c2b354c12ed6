use crate::errors::AppError;
use crate::export::{ExportInput, ExportRow, GroupSectionSummary, flatten_progress, summarize_sections};
use crate::model::admin::{GroupSummary, StudentSummary};
use crate::model::entities::{AccountStatus, Announcement, Group, Professor, User};
use crate::model::professor::AnnouncementResponse;
use crate::store::{DataTree, Store};
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Runs a read-only closure against a consistent snapshot of the tree.
pub(super) async fn read<T, F>(store: &Store, query: F) -> Result<T, AppError>
where
    F: FnOnce(&DataTree) -> Result<T, AppError>,
{
    let db = store.read().await;
    debug!("Read lock obtained on data tree");
    query(db.tree())
}

/// Runs a mutating closure as one transaction: it either applies and persists completely,
/// or leaves the tree untouched.
pub(super) async fn write<T, F>(store: &Store, update: F) -> Result<T, AppError>
where
    F: FnOnce(&mut DataTree) -> Result<T, AppError>,
{
    let mut db = store.write().await;
    debug!("Write lock obtained on data tree");

    db.transaction(update).inspect_err(|e| {
        if let AppError::InternalServerError(source) = e {
            error!("Write transaction failed and was rolled back: {:?}", source);
        } else {
            debug!("Write transaction rejected and rolled back: {}", e);
        }
    })
}

pub(super) fn check_admin(tree: &DataTree, admin_id: &str) -> Result<(), AppError> {
    if tree.admin.contains_key(admin_id) {
        Ok(())
    } else {
        warn!("Caller {} is not an administrator.", admin_id);
        Err(AppError::Forbidden(format!(
            "User {} is not an administrator.",
            admin_id
        )))
    }
}

pub(super) fn check_active_professor<'a>(
    tree: &'a DataTree,
    professor_id: &str,
) -> Result<&'a Professor, AppError> {
    let Some(professor) = tree.professors.get(professor_id) else {
        warn!("Caller {} is not a professor.", professor_id);
        return Err(AppError::Forbidden(format!(
            "User {} is not a professor.",
            professor_id
        )));
    };

    if professor.status != AccountStatus::Active {
        warn!(
            "Professor {} is {} and cannot use the professor API.",
            professor_id,
            professor.status.as_str()
        );
        return Err(AppError::Forbidden(format!(
            "Professor {} account is {}.",
            professor_id,
            professor.status.as_str()
        )));
    }

    Ok(professor)
}

pub(super) fn find_group<'a>(tree: &'a DataTree, group_id: &str) -> Result<(&'a String, &'a Group), AppError> {
    tree.find_group(group_id).ok_or_else(|| {
        error!("Group with ID {} not found.", group_id);
        AppError::NotFound(format!("Group with ID {} not found.", group_id))
    })
}

pub(super) fn find_student<'a>(tree: &'a DataTree, student_id: &str) -> Result<&'a User, AppError> {
    tree.users.get(student_id).ok_or_else(|| {
        error!("Student with ID {} not found.", student_id);
        AppError::NotFound(format!("Student with ID {} not found.", student_id))
    })
}

pub(super) fn check_professor_group_permission(
    tree: &DataTree,
    professor_id: &str,
    group_id: &str,
) -> Result<(), AppError> {
    find_group(tree, group_id)?;

    if tree.professor_in_group(professor_id, group_id) {
        Ok(())
    } else {
        warn!(
            "Professor {} is not assigned to group {}.",
            professor_id, group_id
        );
        Err(AppError::Forbidden(format!(
            "Professor {} is not assigned to group {}.",
            professor_id, group_id
        )))
    }
}

/// A professor may act on a student of any of their groups.
pub(super) fn check_professor_student_permission<'a>(
    tree: &'a DataTree,
    professor_id: &str,
    student_id: &str,
) -> Result<&'a User, AppError> {
    let student = find_student(tree, student_id)?;

    if student.has_group() && tree.professor_in_group(professor_id, &student.group) {
        Ok(student)
    } else {
        warn!(
            "Professor {} has no access to student {}.",
            professor_id, student_id
        );
        Err(AppError::Forbidden(format!(
            "Professor {} has no access to student {}.",
            professor_id, student_id
        )))
    }
}

pub(super) fn validate_announcement_text(title: &str, content: &str) -> Result<(), AppError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Announcement title and content must not be empty.".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn group_summary(tree: &DataTree, key: &str, group: &Group) -> GroupSummary {
    GroupSummary {
        key: key.to_string(),
        group_id: group.group_id.clone(),
        group_name: group.group_name.clone(),
        levels: group.levels.clone(),
        professor_ids: tree.group_professor_ids(&group.group_id),
        student_count: tree.students_in_group(&group.group_id).count(),
    }
}

pub(super) fn student_summary(uid: &str, user: &User) -> StudentSummary {
    StudentSummary {
        uid: uid.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        last_name: user.last_name.clone(),
        group_id: user.group.clone(),
        validated: user.validated,
        status: user.status,
        demo: user.demo,
    }
}

pub(super) fn announcement_response(key: &str, announcement: &Announcement) -> AnnouncementResponse {
    AnnouncementResponse {
        key: key.to_string(),
        professor_id: announcement.professor_id.clone(),
        title: announcement.title.clone(),
        content: announcement.content.clone(),
        timestamp: announcement.timestamp,
        target_groups: announcement.target_groups.clone(),
        is_global: announcement.is_global,
    }
}

/// Export rows and per-section summary over the given groups. Demo accounts are left out.
pub(super) fn build_export(
    tree: &DataTree,
    group_ids: &BTreeSet<String>,
) -> (Vec<ExportRow>, Vec<GroupSectionSummary>) {
    let input = ExportInput {
        groups: tree
            .groups
            .values()
            .filter(|g| group_ids.contains(&g.group_id))
            .collect(),
        students: tree
            .users
            .iter()
            .filter(|(_, u)| !u.demo && u.has_group() && group_ids.contains(&u.group))
            .collect(),
        progress: &tree.progress,
    };

    let rows = flatten_progress(&input);
    let summaries = summarize_sections(&input, &rows);
    (rows, summaries)
}
