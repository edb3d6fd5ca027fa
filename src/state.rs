//! In-memory planning state.
//!
//! Pools are only ever replaced wholesale. The planning methods take `&self`
//! and return fresh results; storing a result is a separate `&mut self` call
//! so a run always reads one consistent snapshot of the pools.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capacity::effective_capacity;
use crate::config::PlannerConfig;
use crate::data::{
    Algorithm, Constraints, Course, OverflowIssue, OverflowResolution, RawRow, Room, RoomDesign,
    RoomDesignResponse, RoomId, ScheduleEntry, ScheduleRequest, Seat, SeatAssignment,
    SeatingOutcome, SeatingRequest, Statistics, Student, TimeSlot,
};
use crate::error::PlannerError;
use crate::layout::generate_seat_layout;
use crate::overflow::{detect_overflow, resolve_overflow, unresolved};
use crate::seating::{AdjacencyRule, assign_seats};
use crate::timeslots::generate_time_slots;
use crate::{loader, solver};

#[derive(Debug, Default)]
pub struct AppState {
    pub config: PlannerConfig,
    pub students: Vec<Student>,
    pub courses: Vec<Course>,
    pub rooms: Vec<Room>,
    pub schedule: Vec<ScheduleEntry>,
    /// Constraints the stored schedule was built with.
    pub schedule_constraints: Constraints,
    pub seat_assignments: BTreeMap<RoomId, Vec<SeatAssignment>>,
}

/// One scheduling run over owned copies of the pools.
#[derive(Debug, Clone)]
pub struct ScheduleJob {
    algorithm: Algorithm,
    constraints: Constraints,
    slots: Vec<TimeSlot>,
    students: Vec<Student>,
    courses: Vec<Course>,
    rooms: Vec<Room>,
}

impl ScheduleJob {
    pub fn run(self) -> Result<(Vec<ScheduleEntry>, Constraints), PlannerError> {
        let schedule = solver::solve(
            self.algorithm,
            &self.students,
            &self.courses,
            &self.rooms,
            &self.slots,
            &self.constraints,
        )?;
        Ok((schedule, self.constraints))
    }
}

/// Full export document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<'a> {
    pub students: &'a [Student],
    pub courses: &'a [Course],
    pub rooms: &'a [Room],
    pub schedule: &'a [ScheduleEntry],
    pub schedule_constraints: &'a Constraints,
    pub assignments: &'a BTreeMap<RoomId, Vec<SeatAssignment>>,
    pub timestamp: DateTime<Utc>,
}

/// Import document; every key is optional and replaces only its own pool.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SnapshotImport {
    students: Option<Vec<Student>>,
    courses: Option<Vec<Course>>,
    rooms: Option<Vec<Room>>,
    schedule: Option<Vec<ScheduleEntry>>,
    schedule_constraints: Option<Constraints>,
    assignments: Option<BTreeMap<RoomId, Vec<SeatAssignment>>>,
}

impl AppState {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn replace_students(&mut self, students: Vec<Student>) {
        info!("Loaded {} student records", students.len());
        self.students = students;
    }

    pub fn replace_courses(&mut self, courses: Vec<Course>) {
        info!("Loaded {} course records", courses.len());
        self.courses = courses;
    }

    pub fn replace_rooms(&mut self, rooms: Vec<Room>) {
        info!("Loaded {} room records", rooms.len());
        self.rooms = rooms;
    }

    pub fn load_students(&mut self, rows: &[RawRow]) -> Result<usize, PlannerError> {
        let students = loader::load_students(rows)?;
        let count = students.len();
        self.replace_students(students);
        Ok(count)
    }

    pub fn load_courses(&mut self, rows: &[RawRow]) -> Result<usize, PlannerError> {
        let courses = loader::load_courses(rows)?;
        let count = courses.len();
        self.replace_courses(courses);
        Ok(count)
    }

    pub fn load_rooms(&mut self, rows: &[RawRow]) -> Result<usize, PlannerError> {
        let rooms = loader::load_rooms(rows)?;
        let count = rooms.len();
        self.replace_rooms(rooms);
        Ok(count)
    }

    /// Adds a room from the layout designer; capacity is rows x cols.
    pub fn add_room(&mut self, design: RoomDesign) -> Result<RoomDesignResponse, PlannerError> {
        let name = design.name.trim();
        if name.is_empty() {
            return Err(PlannerError::InvalidParameter("room name is required".to_string()));
        }
        let (default_rows, default_cols) = design.layout.default_dimensions();
        let rows = design.rows.unwrap_or(default_rows);
        let cols = design.cols.unwrap_or(default_cols);
        let capacity = rows
            .checked_mul(cols)
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                PlannerError::InvalidParameter(format!("{rows} x {cols} is not a usable room size"))
            })?;

        let room = Room {
            id: self.next_room_id(),
            name: name.to_string(),
            capacity,
            layout: design.layout,
            equipment: Vec::new(),
        };
        info!("Created new room: {} ({} seats)", room.name, room.capacity);
        self.rooms.push(room.clone());
        Ok(RoomDesignResponse {
            spacing_capacity: effective_capacity(
                &room,
                &Constraints {
                    spacing_constraint: true,
                    ..Constraints::default()
                },
            ),
            room,
        })
    }

    fn next_room_id(&self) -> RoomId {
        (self.rooms.len() + 1..)
            .map(|n| format!("R{n:03}"))
            .find(|id| self.rooms.iter().all(|r| &r.id != id))
            .unwrap_or_default()
    }

    pub fn delete_room(&mut self, room_id: &str) -> Result<Room, PlannerError> {
        let pos = self
            .rooms
            .iter()
            .position(|r| r.id == room_id)
            .ok_or_else(|| PlannerError::UnknownRoom(room_id.to_string()))?;
        info!("Deleted room: {room_id}");
        self.seat_assignments.remove(room_id);
        Ok(self.rooms.remove(pos))
    }

    pub fn room(&self, room_id: &str) -> Result<&Room, PlannerError> {
        self.rooms
            .iter()
            .find(|r| r.id == room_id)
            .ok_or_else(|| PlannerError::UnknownRoom(room_id.to_string()))
    }

    /// Slots for the configured horizon; missing durations use config defaults.
    pub fn time_slots(
        &self,
        duration_minutes: Option<i64>,
        break_minutes: Option<i64>,
    ) -> Result<Vec<TimeSlot>, PlannerError> {
        generate_time_slots(
            duration_minutes.unwrap_or(self.config.slot_minutes),
            break_minutes.unwrap_or(self.config.break_minutes),
            &self.config.horizon,
        )
    }

    pub fn plan_schedule(
        &self,
        request: &ScheduleRequest,
    ) -> Result<(Vec<ScheduleEntry>, Constraints), PlannerError> {
        self.schedule_job(request)?.run()
    }

    /// Copies the pools a scheduling run needs, so the run can proceed
    /// without holding on to the state.
    pub fn schedule_job(&self, request: &ScheduleRequest) -> Result<ScheduleJob, PlannerError> {
        Ok(ScheduleJob {
            algorithm: request.algorithm,
            constraints: request.constraints.unwrap_or(self.config.constraints),
            slots: self.time_slots(request.duration_minutes, request.break_minutes)?,
            students: self.students.clone(),
            courses: self.courses.clone(),
            rooms: self.rooms.clone(),
        })
    }

    pub fn set_schedule(&mut self, schedule: Vec<ScheduleEntry>, constraints: Constraints) {
        self.schedule = schedule;
        self.schedule_constraints = constraints;
    }

    pub fn overflow(&self) -> Vec<OverflowIssue> {
        detect_overflow(&self.schedule, &self.schedule_constraints)
    }

    pub fn resolve_overflow(&self) -> OverflowResolution {
        let issues = self.overflow();
        let solutions = resolve_overflow(&self.schedule, &self.rooms, &self.schedule_constraints);
        let unresolved = unresolved(&issues, &solutions).into_iter().cloned().collect();
        OverflowResolution {
            solutions,
            unresolved,
        }
    }

    pub fn seat_layout(&self, room_id: &str) -> Result<Vec<Seat>, PlannerError> {
        Ok(generate_seat_layout(self.room(room_id)?))
    }

    pub fn plan_seating(&self, request: &SeatingRequest) -> Result<SeatingOutcome, PlannerError> {
        let mut layout = self.seat_layout(&request.room_id)?;
        for seat in &mut layout {
            if let Some(&state) = request.pre_marked.get(&seat.number) {
                seat.state = state;
            }
        }
        let rule = request.adjacency.unwrap_or(self.config.adjacency);
        if rule == (AdjacencyRule::FixedWidth { row_width: 0 }) {
            return Err(PlannerError::InvalidParameter(
                "row width must be at least 1".to_string(),
            ));
        }
        let students = request.filter.apply(&self.students);
        info!(
            "Seating {} students in room {} ({} seats)",
            students.len(),
            request.room_id,
            layout.len()
        );
        Ok(assign_seats(&students, &layout, rule))
    }

    /// Replaces the room's previous assignments.
    pub fn set_seating(&mut self, room_id: RoomId, assignments: Vec<SeatAssignment>) {
        self.seat_assignments.insert(room_id, assignments);
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            students: self.students.len(),
            courses: self.courses.len(),
            rooms: self.rooms.len(),
            scheduled: self.schedule.len(),
            seated: self.seat_assignments.values().map(Vec::len).sum(),
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            students: &self.students,
            courses: &self.courses,
            rooms: &self.rooms,
            schedule: &self.schedule,
            schedule_constraints: &self.schedule_constraints,
            assignments: &self.seat_assignments,
            timestamp: Utc::now(),
        }
    }

    /// Applies an exported document. Keys that are absent leave their pool
    /// alone; a malformed document changes nothing.
    pub fn import(&mut self, document: serde_json::Value) -> Result<(), PlannerError> {
        let import: SnapshotImport = serde_json::from_value(document)?;
        let mut replaced = Vec::new();
        if let Some(students) = import.students {
            self.students = students;
            replaced.push("students");
        }
        if let Some(courses) = import.courses {
            self.courses = courses;
            replaced.push("courses");
        }
        if let Some(rooms) = import.rooms {
            self.rooms = rooms;
            replaced.push("rooms");
        }
        if let Some(schedule) = import.schedule {
            self.schedule = schedule;
            self.schedule_constraints = import.schedule_constraints.unwrap_or_default();
            replaced.push("schedule");
        } else if let Some(constraints) = import.schedule_constraints {
            self.schedule_constraints = constraints;
            replaced.push("scheduleConstraints");
        }
        if let Some(assignments) = import.assignments {
            self.seat_assignments = assignments;
            replaced.push("assignments");
        }
        info!("Imported snapshot: {}", replaced.join(", "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LayoutStyle, SeatState, StudentFilter};
    use crate::solver::tests::{reference_pools, room};
    use serde_json::json;

    fn loaded_state() -> AppState {
        let (students, courses, rooms) = reference_pools();
        let mut state = AppState::new(PlannerConfig::default());
        state.replace_students(students);
        state.replace_courses(courses);
        state.replace_rooms(rooms);
        state
    }

    #[test]
    fn schedule_then_overflow_uses_run_constraints() {
        let mut state = loaded_state();
        let request = ScheduleRequest {
            constraints: Some(Constraints {
                spacing_constraint: true,
                ..Constraints::default()
            }),
            ..ScheduleRequest::default()
        };
        let (schedule, constraints) = state.plan_schedule(&request).unwrap();
        state.set_schedule(schedule, constraints);

        let issues = state.overflow();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].overflow_amount, 20);

        let resolution = state.resolve_overflow();
        assert_eq!(resolution.solutions.len(), 1);
        assert_eq!(resolution.solutions[0].secondary_room.id, "R40");
        assert_eq!(resolution.solutions[0].secondary_count, 20);
        assert!(resolution.unresolved.is_empty());
    }

    #[test]
    fn bad_duration_leaves_schedule_untouched() {
        let mut state = loaded_state();
        let (schedule, constraints) = state.plan_schedule(&ScheduleRequest::default()).unwrap();
        state.set_schedule(schedule, constraints);
        let request = ScheduleRequest {
            duration_minutes: Some(0),
            algorithm: Algorithm::RoundRobin,
            ..ScheduleRequest::default()
        };
        assert!(state.plan_schedule(&request).is_err());
        assert_eq!(state.schedule.len(), 3);
    }

    #[test]
    fn failed_load_keeps_previous_pool() {
        let mut state = loaded_state();
        let bad: RawRow = [("StudentID".to_string(), "S1".to_string())].into();
        assert!(state.load_students(&[bad]).is_err());
        assert_eq!(state.students.len(), 65);
    }

    #[test]
    fn seating_applies_filter_and_pre_marks() {
        let mut state = loaded_state();
        let request = SeatingRequest {
            room_id: "R40".to_string(),
            filter: StudentFilter {
                course: Some("C".to_string()),
                ..StudentFilter::default()
            },
            adjacency: None,
            pre_marked: [(1, SeatState::Blocked)].into(),
        };
        let outcome = state.plan_seating(&request).unwrap();
        assert_eq!(outcome.assignments.len(), 5);
        assert!(outcome.assignments.iter().all(|a| a.student.course == "C"));
        assert_eq!(outcome.assignments[0].seat_number, 2);

        state.set_seating("R40".to_string(), outcome.assignments);
        state.set_seating("R40".to_string(), Vec::new());
        assert_eq!(state.statistics().seated, 0);
    }

    #[test]
    fn seating_unknown_room_fails() {
        let state = loaded_state();
        let request = SeatingRequest {
            room_id: "NOPE".to_string(),
            filter: StudentFilter::default(),
            adjacency: None,
            pre_marked: BTreeMap::new(),
        };
        assert!(matches!(
            state.plan_seating(&request),
            Err(PlannerError::UnknownRoom(_))
        ));
    }

    #[test]
    fn zero_row_width_is_rejected() {
        let state = loaded_state();
        let request = SeatingRequest {
            room_id: "R40".to_string(),
            filter: StudentFilter::default(),
            adjacency: Some(AdjacencyRule::FixedWidth { row_width: 0 }),
            pre_marked: BTreeMap::new(),
        };
        assert!(matches!(
            state.plan_seating(&request),
            Err(PlannerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn widest_row_width_seats_in_one_row() {
        let state = loaded_state();
        let request = SeatingRequest {
            room_id: "R40".to_string(),
            filter: StudentFilter {
                course: Some("C".to_string()),
                ..StudentFilter::default()
            },
            adjacency: Some(AdjacencyRule::FixedWidth { row_width: u32::MAX }),
            pre_marked: BTreeMap::new(),
        };
        let outcome = state.plan_seating(&request).unwrap();
        let seats: Vec<_> = outcome.assignments.iter().map(|a| a.seat_number).collect();
        assert_eq!(seats, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn schedule_job_ignores_later_pool_changes() {
        let mut state = loaded_state();
        let job = state.schedule_job(&ScheduleRequest::default()).unwrap();
        state.replace_rooms(Vec::new());
        let (schedule, _) = job.run().unwrap();
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn designer_rooms_use_style_defaults() {
        let mut state = loaded_state();
        let created = state
            .add_room(RoomDesign {
                name: "Annex".to_string(),
                layout: LayoutStyle::Clustered,
                rows: None,
                cols: None,
            })
            .unwrap();
        assert_eq!(created.room.capacity, 72);
        assert_eq!(created.spacing_capacity, 36);
        assert_eq!(created.room.id, "R003");
        assert!(state.room("R003").is_ok());

        assert!(state.delete_room("R003").is_ok());
        assert!(matches!(state.delete_room("R003"), Err(PlannerError::UnknownRoom(_))));
        assert!(state
            .add_room(RoomDesign {
                name: " ".to_string(),
                layout: LayoutStyle::Grid,
                rows: Some(2),
                cols: Some(2),
            })
            .is_err());
    }

    #[test]
    fn import_replaces_only_present_keys() {
        let mut state = loaded_state();
        state
            .import(json!({
                "rooms": [
                    {"id": "R9", "name": "Gym", "capacity": 200, "layout": "grid", "equipment": []}
                ]
            }))
            .unwrap();
        assert_eq!(state.rooms, vec![Room { name: "Gym".to_string(), ..room("R9", 200) }]);
        assert_eq!(state.students.len(), 65);
        assert_eq!(state.courses.len(), 3);
    }

    #[test]
    fn malformed_import_changes_nothing() {
        let mut state = loaded_state();
        let err = state
            .import(json!({ "rooms": [], "students": [{"id": 7}] }))
            .unwrap_err();
        assert!(matches!(err, PlannerError::Snapshot(_)));
        assert_eq!(state.rooms.len(), 2);
    }

    #[test]
    fn export_round_trips_through_import() {
        let mut state = loaded_state();
        let (schedule, constraints) = state.plan_schedule(&ScheduleRequest::default()).unwrap();
        state.set_schedule(schedule, constraints);
        let document = serde_json::to_value(state.snapshot()).unwrap();
        assert!(document.get("timestamp").is_some());

        let mut restored = AppState::new(PlannerConfig::default());
        restored.import(document).unwrap();
        assert_eq!(restored.students, state.students);
        assert_eq!(restored.schedule, state.schedule);
    }

    #[test]
    fn imported_schedule_keeps_its_constraints() {
        let mut state = loaded_state();
        let request = ScheduleRequest {
            constraints: Some(Constraints {
                spacing_constraint: true,
                ..Constraints::default()
            }),
            ..ScheduleRequest::default()
        };
        let (schedule, constraints) = state.plan_schedule(&request).unwrap();
        state.set_schedule(schedule, constraints);
        let document = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(document["scheduleConstraints"]["spacingConstraint"], true);

        let mut restored = AppState::new(PlannerConfig::default());
        restored.import(document).unwrap();
        assert!(restored.schedule_constraints.spacing_constraint);
        assert_eq!(restored.overflow(), state.overflow());
        assert_eq!(restored.overflow().len(), 1);
    }

    #[test]
    fn schedule_without_constraints_imports_with_defaults() {
        let mut state = loaded_state();
        state.schedule_constraints.spacing_constraint = true;
        let mut source = loaded_state();
        let (schedule, constraints) = source.plan_schedule(&ScheduleRequest::default()).unwrap();
        source.set_schedule(schedule, constraints);
        let document = json!({ "schedule": serde_json::to_value(&source.schedule).unwrap() });

        state.import(document).unwrap();
        assert_eq!(state.schedule_constraints, Constraints::default());
        assert!(state.overflow().is_empty());
    }
}
