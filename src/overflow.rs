use crate::capacity::effective_capacity;
use crate::data::{Constraints, OverflowIssue, OverflowSolution, Room, ScheduleEntry};
use log::{debug, info, warn};

/// Entries whose student count exceeds their room's effective capacity.
pub fn detect_overflow(
    schedule: &[ScheduleEntry],
    constraints: &Constraints,
) -> Vec<OverflowIssue> {
    let issues: Vec<OverflowIssue> = schedule
        .iter()
        .filter_map(|entry| entry_overflow(entry, constraints))
        .collect();
    if !issues.is_empty() {
        info!("Detected {} capacity overflows", issues.len());
    }
    issues
}

fn entry_overflow(entry: &ScheduleEntry, constraints: &Constraints) -> Option<OverflowIssue> {
    let available = effective_capacity(&entry.room, constraints);
    (entry.student_count > available).then(|| OverflowIssue {
        course: entry.course.clone(),
        room: entry.room.clone(),
        required_seats: entry.student_count,
        available_seats: available,
        overflow_amount: entry.student_count - available,
    })
}

/// Proposes a two-room split for every overflowing entry.
///
/// The second room is the first other room whose nominal capacity covers the
/// overflow, or else the first other room at all. Entries with no other room
/// get no solution. The schedule itself is left untouched.
pub fn resolve_overflow(
    schedule: &[ScheduleEntry],
    rooms: &[Room],
    constraints: &Constraints,
) -> Vec<OverflowSolution> {
    let mut solutions = Vec::new();
    for entry in schedule {
        let Some(issue) = entry_overflow(entry, constraints) else {
            continue;
        };
        let mut others = rooms.iter().filter(|r| r.id != entry.room.id).peekable();
        let Some(&first_other) = others.peek() else {
            warn!(
                "No second room available for {} ({} students over)",
                entry.course.id, issue.overflow_amount
            );
            continue;
        };
        let secondary = others
            .find(|r| r.capacity >= issue.overflow_amount)
            .unwrap_or(first_other);
        debug!(
            "Splitting {}: {} in {}, {} in {}",
            entry.course.id,
            issue.available_seats,
            entry.room.id,
            issue.overflow_amount.min(secondary.capacity),
            secondary.id
        );
        solutions.push(OverflowSolution {
            course: entry.course.clone(),
            primary_room: entry.room.clone(),
            secondary_room: secondary.clone(),
            primary_count: issue.available_seats,
            secondary_count: issue.overflow_amount.min(secondary.capacity),
        });
    }
    solutions
}

/// Issues from `issues` that no solution covers.
pub fn unresolved<'a>(
    issues: &'a [OverflowIssue],
    solutions: &[OverflowSolution],
) -> Vec<&'a OverflowIssue> {
    issues
        .iter()
        .filter(|issue| {
            !solutions
                .iter()
                .any(|s| s.course.id == issue.course.id && s.primary_room.id == issue.room.id)
        })
        .collect()
}
