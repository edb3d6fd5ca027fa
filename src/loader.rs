//! Validation of raw tabular records into pool entries.
//!
//! A whole batch is validated before anything is returned, so a bad row
//! never leaves a half-loaded pool behind. Rows are numbered from 1.

use std::str::FromStr;

use crate::data::{Course, LayoutStyle, RawRow, Room, Student};
use crate::error::PlannerError;

const DEFAULT_SEMESTER: u32 = 1;
const DEFAULT_YEAR: i32 = 2024;
const DEFAULT_CREDITS: u32 = 3;
const DEFAULT_DURATION_MINUTES: u32 = 120;

pub fn load_students(rows: &[RawRow]) -> Result<Vec<Student>, PlannerError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let row_no = i + 1;
            Ok(Student {
                id: required(row, row_no, "StudentID")?,
                name: required(row, row_no, "Name")?,
                course: required(row, row_no, "Course")?,
                semester: optional(row, row_no, "Semester")?.unwrap_or(DEFAULT_SEMESTER),
                year: optional(row, row_no, "Year")?.unwrap_or(DEFAULT_YEAR),
            })
        })
        .collect()
}

pub fn load_courses(rows: &[RawRow]) -> Result<Vec<Course>, PlannerError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let row_no = i + 1;
            Ok(Course {
                id: required(row, row_no, "CourseID")?,
                name: required(row, row_no, "Name")?,
                credits: optional(row, row_no, "Credits")?.unwrap_or(DEFAULT_CREDITS),
                duration_minutes: optional(row, row_no, "Duration")?
                    .unwrap_or(DEFAULT_DURATION_MINUTES),
                prerequisites: list(row, "Prerequisites"),
            })
        })
        .collect()
}

pub fn load_rooms(rows: &[RawRow]) -> Result<Vec<Room>, PlannerError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let row_no = i + 1;
            let id = required(row, row_no, "RoomID")?;
            let name = required(row, row_no, "Name")?;
            let raw_capacity = required(row, row_no, "Capacity")?;
            let capacity = raw_capacity
                .parse::<u32>()
                .ok()
                .filter(|c| *c > 0)
                .ok_or(PlannerError::InvalidField {
                    row: row_no,
                    field: "Capacity",
                    value: raw_capacity,
                })?;
            let layout = match field(row, "Layout") {
                None => LayoutStyle::default(),
                Some(raw) => LayoutStyle::parse(raw).ok_or_else(|| PlannerError::InvalidField {
                    row: row_no,
                    field: "Layout",
                    value: raw.to_string(),
                })?,
            };
            Ok(Room {
                id,
                name,
                capacity,
                layout,
                equipment: list(row, "Equipment"),
            })
        })
        .collect()
}

/// Non-blank trimmed value of a column.
fn field<'a>(row: &'a RawRow, name: &str) -> Option<&'a str> {
    row.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn required(row: &RawRow, row_no: usize, name: &'static str) -> Result<String, PlannerError> {
    field(row, name)
        .map(str::to_string)
        .ok_or(PlannerError::MissingField {
            row: row_no,
            field: name,
        })
}

fn optional<T: FromStr>(
    row: &RawRow,
    row_no: usize,
    name: &'static str,
) -> Result<Option<T>, PlannerError> {
    field(row, name)
        .map(|raw| {
            raw.parse().map_err(|_| PlannerError::InvalidField {
                row: row_no,
                field: name,
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn list(row: &RawRow, name: &str) -> Vec<String> {
    field(row, name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
