use crate::capacity::effective_capacity;
use crate::data::{
    Algorithm, Constraints, Course, Room, RoomId, ScheduleEntry, Student, TimeSlot,
};
use crate::error::PlannerError;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
};
use itertools::Itertools;
use log::{info, trace, warn};
use std::cmp::Reverse;
use std::time::Instant;

/// Runs the selected engine. Only the exact engine can fail.
pub fn solve(
    algorithm: Algorithm,
    students: &[Student],
    courses: &[Course],
    rooms: &[Room],
    slots: &[TimeSlot],
    constraints: &Constraints,
) -> Result<Vec<ScheduleEntry>, PlannerError> {
    match algorithm {
        Algorithm::RoundRobin => Ok(build_schedule(students, courses, rooms, slots, constraints)),
        Algorithm::Exact => solve_exact(students, courses, rooms, slots, constraints),
    }
}

/// Assigns every course with enrolled students to a (slot, room) pair.
///
/// Courses are taken in descending enrollment order. Course `i` gets slot
/// `i % slots` and the candidate room `(i / slots) % candidates`, so once
/// courses outnumber slots the rooms rotate. When only one candidate room
/// exists this reuses a (room, slot) pair; such collisions are logged but
/// left in place.
pub fn build_schedule(
    students: &[Student],
    courses: &[Course],
    rooms: &[Room],
    slots: &[TimeSlot],
    constraints: &Constraints,
) -> Vec<ScheduleEntry> {
    let start_time = Instant::now();
    let demand = courses_by_demand(students, courses);
    if demand.is_empty() || rooms.is_empty() || slots.is_empty() {
        info!(
            "Nothing to schedule: {} courses with students, {} rooms, {} time slots.",
            demand.len(),
            rooms.len(),
            slots.len()
        );
        return Vec::new();
    }

    info!(
        "Assigning {} courses across {} rooms and {} time slots...",
        demand.len(),
        rooms.len(),
        slots.len()
    );
    let schedule: Vec<ScheduleEntry> = demand
        .iter()
        .enumerate()
        .map(|(index, &(course, student_count))| {
            let candidates = candidate_rooms(rooms, student_count, constraints);
            let time_slot = slots[index % slots.len()];
            let room = candidates[(index / slots.len()) % candidates.len()];
            trace!(
                "Course {} ({} students) -> room {} at {}",
                course.id, student_count, room.id, time_slot
            );
            ScheduleEntry {
                course: course.clone(),
                room: room.clone(),
                time_slot,
                student_count,
                conflict_count: 0,
            }
        })
        .collect();

    let collisions = double_bookings(&schedule);
    if !collisions.is_empty() {
        warn!(
            "Round-robin schedule reuses {} (room, slot) pairs: {:?}",
            collisions.len(),
            collisions
        );
    }
    info!(
        "Schedule with {} entries built in {:.2?}",
        schedule.len(),
        start_time.elapsed()
    );
    schedule
}

/// Collision-free variant of [`build_schedule`], solved as a binary ILP with HiGHS.
///
/// Uses the same candidate rooms, places each course exactly once and each
/// (room, slot) at most once, preferring earlier slots.
pub fn solve_exact(
    students: &[Student],
    courses: &[Course],
    rooms: &[Room],
    slots: &[TimeSlot],
    constraints: &Constraints,
) -> Result<Vec<ScheduleEntry>, PlannerError> {
    let start_time = Instant::now();
    let demand = courses_by_demand(students, courses);
    if demand.is_empty() || rooms.is_empty() || slots.is_empty() {
        info!("Nothing to schedule exactly: empty course, room or slot pool.");
        return Ok(Vec::new());
    }
    if demand.len() > rooms.len() * slots.len() {
        return Err(PlannerError::Infeasible(format!(
            "{} courses cannot fit into {} rooms x {} slots",
            demand.len(),
            rooms.len(),
            slots.len()
        )));
    }

    // rooms are keyed by position so duplicate ids stay distinct
    let mut all_possible_assignments = Vec::new();
    for (course_idx, &(_, student_count)) in demand.iter().enumerate() {
        for room_idx in candidate_indices(rooms, student_count, constraints) {
            for slot_idx in 0..slots.len() {
                all_possible_assignments.push((course_idx, room_idx, slot_idx));
            }
        }
    }
    info!(
        "Setting up ILP model with {} courses, {} rooms, {} time slots and {} variables...",
        demand.len(),
        rooms.len(),
        slots.len(),
        all_possible_assignments.len()
    );

    let mut problem = ProblemVariables::new();
    let assignment_vars: Vec<Variable> =
        problem.add_vector(variable().binary(), all_possible_assignments.len());

    // earlier slots score higher
    let objective: Expression = all_possible_assignments
        .iter()
        .zip(&assignment_vars)
        .map(|(&(_, _, slot_idx), var)| (slots.len() - slot_idx) as f64 * *var)
        .sum();

    let mut model = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", 1) // limit to 1 thread for reproducibility
        .set_option("random_seed", 1234)
        .set_option("log_to_console", "false");

    let by_course = all_possible_assignments
        .iter()
        .zip(&assignment_vars)
        .into_group_map_by(|((course_idx, _, _), _)| *course_idx);
    for course_idx in 0..demand.len() {
        let scheduled_once: Expression = by_course
            .get(&course_idx)
            .into_iter()
            .flatten()
            .map(|(_, var)| **var)
            .sum();
        model.add_constraint(constraint!(scheduled_once == 1));
    }

    let by_room_slot = all_possible_assignments
        .iter()
        .zip(&assignment_vars)
        .into_group_map_by(|((_, room_idx, slot_idx), _)| (*room_idx, *slot_idx));
    for vars in by_room_slot.values() {
        let room_occupied: Expression = vars.iter().map(|(_, var)| **var).sum();
        model.add_constraint(constraint!(room_occupied <= 1));
    }

    info!("Starting ILP solver...");
    let solution = model.solve().map_err(|e| {
        PlannerError::Infeasible(format!("solver found no assignment: {e}"))
    })?;

    let mut chosen: Vec<Option<(usize, usize)>> = vec![None; demand.len()];
    for (&(course_idx, room_idx, slot_idx), var) in
        all_possible_assignments.iter().zip(&assignment_vars)
    {
        if solution.value(*var) > 0.5 {
            chosen[course_idx] = Some((room_idx, slot_idx));
        }
    }

    let schedule = demand
        .iter()
        .zip(chosen)
        .map(|(&(course, student_count), pick)| {
            let (room_idx, slot_idx) = pick.ok_or_else(|| {
                PlannerError::Infeasible(format!("course {} left unassigned", course.id))
            })?;
            Ok(ScheduleEntry {
                course: course.clone(),
                room: rooms[room_idx].clone(),
                time_slot: slots[slot_idx],
                student_count,
                conflict_count: 0,
            })
        })
        .collect::<Result<Vec<_>, PlannerError>>()?;
    info!(
        "Exact schedule with {} entries found in {:.2?}",
        schedule.len(),
        start_time.elapsed()
    );
    Ok(schedule)
}

/// Courses with at least one student, most students first. Ties keep input order.
pub fn courses_by_demand<'a>(
    students: &[Student],
    courses: &'a [Course],
) -> Vec<(&'a Course, u32)> {
    let counts = students.iter().counts_by(|s| s.course.as_str());
    let mut demand: Vec<(&Course, u32)> = courses
        .iter()
        .filter_map(|c| counts.get(c.id.as_str()).map(|&n| (c, n as u32)))
        .collect();
    demand.sort_by_key(|&(_, n)| Reverse(n));
    demand
}

/// Rooms whose effective capacity holds `student_count`, in input order.
///
/// Falls back to the single largest room (first one on ties) when none fit, so
/// the result is empty only when `rooms` is.
pub fn candidate_rooms<'a>(
    rooms: &'a [Room],
    student_count: u32,
    constraints: &Constraints,
) -> Vec<&'a Room> {
    candidate_indices(rooms, student_count, constraints)
        .into_iter()
        .map(|i| &rooms[i])
        .collect()
}

fn candidate_indices(rooms: &[Room], student_count: u32, constraints: &Constraints) -> Vec<usize> {
    let fitting: Vec<usize> = rooms
        .iter()
        .positions(|r| effective_capacity(r, constraints) >= student_count)
        .collect();
    if !fitting.is_empty() {
        return fitting;
    }
    let largest = rooms
        .iter()
        .enumerate()
        .reduce(|best, cur| if cur.1.capacity > best.1.capacity { cur } else { best });
    if let Some((_, room)) = largest {
        warn!(
            "No room holds {} students; falling back to largest room {} ({} seats)",
            student_count, room.id, room.capacity
        );
    }
    largest.map(|(i, _)| i).into_iter().collect()
}

/// (room, slot) pairs used by more than one entry.
pub fn double_bookings(schedule: &[ScheduleEntry]) -> Vec<(RoomId, TimeSlot)> {
    schedule
        .iter()
        .map(|e| (e.room.id.clone(), e.time_slot))
        .duplicates()
        .collect()
}
