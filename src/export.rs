//! Progress export: one row per played section plus a per-group summary, written as XLSX.

use crate::model::entities::{Group, User, UserProgress};
use crate::scoring::Section;
use crate::session_key::SessionKey;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A section counts as passed once it awarded any points.
pub fn section_passed(score: f64) -> bool {
    score > 0.0
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub student_id: String,
    pub email: String,
    pub name: String,
    pub last_name: String,
    pub group_id: String,
    pub group_name: String,
    pub level: String,
    pub session_key: String,
    pub played_at: Option<NaiveDateTime>,
    pub section: String,
    pub attempts: u32,
    pub score: f64,
    pub time: f64,
    pub passed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupSectionSummary {
    pub group_id: String,
    pub group_name: String,
    pub section: Section,
    pub passed: usize,
    pub not_passed: usize,
    pub not_played: usize,
}

/// Everything an export needs, borrowed from one consistent read of the store.
pub struct ExportInput<'a> {
    pub groups: Vec<&'a Group>,
    pub students: Vec<(&'a String, &'a User)>,
    pub progress: &'a BTreeMap<String, UserProgress>,
}

impl ExportInput<'_> {
    fn group_name(&self, group_id: &str) -> String {
        self.groups
            .iter()
            .find(|g| g.group_id == group_id)
            .map(|g| g.group_name.clone())
            .unwrap_or_default()
    }
}

/// Flattens the progress of every exported student into rows.
pub fn flatten_progress(input: &ExportInput<'_>) -> Vec<ExportRow> {
    let mut rows = Vec::new();

    for (uid, user) in &input.students {
        let Some(progress) = input.progress.get(*uid) else {
            continue;
        };
        let group_name = input.group_name(&user.group);

        for (level, sessions) in progress {
            for (session_key, session) in sessions {
                let played_at = SessionKey::parse(session_key).ok().map(|k| k.played_at);

                for (section, result) in &session.sections {
                    rows.push(ExportRow {
                        student_id: (*uid).clone(),
                        email: user.email.clone(),
                        name: user.name.clone(),
                        last_name: user.last_name.clone(),
                        group_id: user.group.clone(),
                        group_name: group_name.clone(),
                        level: level.clone(),
                        session_key: session_key.clone(),
                        played_at,
                        section: section.clone(),
                        attempts: result.attempts,
                        score: result.score,
                        time: result.time,
                        passed: section_passed(result.score),
                    });
                }
            }
        }
    }

    rows
}

/// Counts, for every group and fixed section, the unique students who passed, played
/// without passing, or never played it.
pub fn summarize_sections(input: &ExportInput<'_>, rows: &[ExportRow]) -> Vec<GroupSectionSummary> {
    let mut summaries = Vec::new();

    for group in &input.groups {
        let members: BTreeSet<&str> = input
            .students
            .iter()
            .filter(|(_, u)| u.group == group.group_id)
            .map(|(uid, _)| uid.as_str())
            .collect();

        for section in Section::ALL {
            let section_rows = rows
                .iter()
                .filter(|r| r.group_id == group.group_id && r.section == section.key());

            let mut played = BTreeSet::new();
            let mut passed = BTreeSet::new();
            for row in section_rows {
                played.insert(row.student_id.as_str());
                if row.passed {
                    passed.insert(row.student_id.as_str());
                }
            }

            summaries.push(GroupSectionSummary {
                group_id: group.group_id.clone(),
                group_name: group.group_name.clone(),
                section,
                passed: passed.len(),
                not_passed: played.difference(&passed).count(),
                not_played: members.difference(&played).count(),
            });
        }
    }

    summaries
}

const PROGRESS_HEADERS: [&str; 14] = [
    "Student ID",
    "Email",
    "Name",
    "Last name",
    "Group ID",
    "Group",
    "Level",
    "Session",
    "Played at",
    "Section",
    "Attempts",
    "Score",
    "Time",
    "Passed",
];

const SUMMARY_HEADERS: [&str; 6] = [
    "Group ID",
    "Group",
    "Section",
    "Passed",
    "Not passed",
    "Not played",
];

/// Writes the `Progress` and `Summary` sheets and returns the XLSX bytes.
pub fn write_workbook(
    rows: &[ExportRow],
    summaries: &[GroupSectionSummary],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let progress_sheet = workbook.add_worksheet();
    progress_sheet.set_name("Progress")?;
    for (col, title) in PROGRESS_HEADERS.iter().enumerate() {
        progress_sheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        progress_sheet.write_string(r, 0, &row.student_id)?;
        progress_sheet.write_string(r, 1, &row.email)?;
        progress_sheet.write_string(r, 2, &row.name)?;
        progress_sheet.write_string(r, 3, &row.last_name)?;
        progress_sheet.write_string(r, 4, &row.group_id)?;
        progress_sheet.write_string(r, 5, &row.group_name)?;
        progress_sheet.write_string(r, 6, &row.level)?;
        progress_sheet.write_string(r, 7, &row.session_key)?;
        let played_at = row
            .played_at
            .map(|t| t.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default();
        progress_sheet.write_string(r, 8, &played_at)?;
        progress_sheet.write_string(r, 9, &row.section)?;
        progress_sheet.write_number(r, 10, f64::from(row.attempts))?;
        progress_sheet.write_number(r, 11, row.score)?;
        progress_sheet.write_number(r, 12, row.time)?;
        progress_sheet.write_string(r, 13, if row.passed { "yes" } else { "no" })?;
    }

    let summary_sheet = workbook.add_worksheet();
    summary_sheet.set_name("Summary")?;
    for (col, title) in SUMMARY_HEADERS.iter().enumerate() {
        summary_sheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }
    for (idx, summary) in summaries.iter().enumerate() {
        let r = idx as u32 + 1;
        summary_sheet.write_string(r, 0, &summary.group_id)?;
        summary_sheet.write_string(r, 1, &summary.group_name)?;
        summary_sheet.write_string(r, 2, summary.section.key())?;
        summary_sheet.write_number(r, 3, summary.passed as f64)?;
        summary_sheet.write_number(r, 4, summary.not_passed as f64)?;
        summary_sheet.write_number(r, 5, summary.not_played as f64)?;
    }

    workbook.save_to_buffer()
}
