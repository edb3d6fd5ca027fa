use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Type aliases for clarity
pub type StudentId = String;
pub type CourseId = String;
pub type RoomId = String;
pub type SeatNumber = u32;
pub type TimeSlot = NaiveDateTime;

/// A student enrolled in exactly one course.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub course: CourseId,
    pub semester: u32,
    pub year: i32,
}

/// A course that may need an exam slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub credits: u32,
    pub duration_minutes: u32,
    /// Informational only, the scheduler never checks these.
    #[serde(default)]
    pub prerequisites: Vec<CourseId>,
}

/// How seats are physically arranged in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStyle {
    #[default]
    Grid,
    #[serde(alias = "island")]
    Clustered,
    Curved,
}

impl LayoutStyle {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grid" => Some(Self::Grid),
            "island" | "clustered" => Some(Self::Clustered),
            "curved" => Some(Self::Curved),
            _ => None,
        }
    }

    /// Rows and columns the layout designer starts from for this style.
    pub fn default_dimensions(self) -> (u32, u32) {
        match self {
            Self::Grid => (8, 10),
            Self::Clustered => (6, 12),
            Self::Curved => (10, 8),
        }
    }
}

impl fmt::Display for LayoutStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Grid => "grid",
            Self::Clustered => "clustered",
            Self::Curved => "curved",
        };
        f.write_str(name)
    }
}

/// Represents a physical exam room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub layout: LayoutStyle,
    #[serde(default)]
    pub equipment: Vec<String>,
}

/// Active scheduling constraints. Only `spacing_constraint` changes behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    /// Halves every room's usable capacity.
    pub spacing_constraint: bool,
    pub equipment_required: bool,
    pub room_capacity_enforced: bool,
    pub no_back_to_back: bool,
}

/// Which assignment engine produces the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    Exact,
}

/// Represents a single scheduled exam.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub course: Course,
    pub room: Room,
    pub time_slot: TimeSlot,
    pub student_count: u32,
    /// Always 0 for now; no conflict detection beyond capacity exists yet.
    pub conflict_count: u32,
}

/// An entry whose enrollment exceeds the room's effective capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverflowIssue {
    pub course: Course,
    pub room: Room,
    pub required_seats: u32,
    pub available_seats: u32,
    pub overflow_amount: u32,
}

impl fmt::Display for OverflowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} students, {} capacity ({} overflow)",
            self.course.name, self.required_seats, self.available_seats, self.overflow_amount
        )
    }
}

/// Advisory split of one overflowing exam across two rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverflowSolution {
    pub course: Course,
    pub primary_room: Room,
    pub secondary_room: Room,
    pub primary_count: u32,
    pub secondary_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    #[default]
    Available,
    Selected,
    Occupied,
    Blocked,
}

/// One seat of a generated layout. `cluster` is 0 outside clustered rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Seat {
    pub number: SeatNumber,
    pub row: u32,
    pub col: u32,
    pub cluster: u32,
    pub state: SeatState,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub student: Student,
    pub seat_number: SeatNumber,
}

/// Result of one seating run in a single room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingOutcome {
    pub assignments: Vec<SeatAssignment>,
    pub seats: Vec<Seat>,
    /// Students for whom no eligible seat remained.
    pub unseated: Vec<StudentId>,
}

/// Restricts which students take part in a seating run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentFilter {
    pub semester: Option<u32>,
    pub year: Option<i32>,
    pub course: Option<CourseId>,
}

impl StudentFilter {
    pub fn matches(&self, student: &Student) -> bool {
        self.semester.is_none_or(|s| student.semester == s)
            && self.year.is_none_or(|y| student.year == y)
            && self.course.as_ref().is_none_or(|c| &student.course == c)
    }

    pub fn apply(&self, students: &[Student]) -> Vec<Student> {
        students.iter().filter(|s| self.matches(s)).cloned().collect()
    }
}

/// A raw tabular record as handed over by an upload, keyed by column name.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeSlotRequest {
    pub duration_minutes: Option<i64>,
    pub break_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRequest {
    pub constraints: Option<Constraints>,
    pub algorithm: Algorithm,
    pub duration_minutes: Option<i64>,
    pub break_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub schedule: Vec<ScheduleEntry>,
    pub overflow: Vec<OverflowIssue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverflowResolution {
    pub solutions: Vec<OverflowSolution>,
    /// Issues for which no second room exists.
    pub unresolved: Vec<OverflowIssue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingRequest {
    pub room_id: RoomId,
    #[serde(default)]
    pub filter: StudentFilter,
    #[serde(default)]
    pub adjacency: Option<crate::seating::AdjacencyRule>,
    /// Seats the caller has already taken out of play.
    #[serde(default)]
    pub pre_marked: BTreeMap<SeatNumber, SeatState>,
}

/// Layout designer input for a new room.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDesign {
    pub name: String,
    #[serde(default)]
    pub layout: LayoutStyle,
    pub rows: Option<u32>,
    pub cols: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDesignResponse {
    pub room: Room,
    pub spacing_capacity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub loaded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub students: usize,
    pub courses: usize,
    pub rooms: usize,
    pub scheduled: usize,
    pub seated: usize,
}
