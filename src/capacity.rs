use crate::data::{Constraints, Room};

/// Seats usable in `room` once active constraints are applied.
///
/// Spacing halves the room (rounded down). Nothing else reduces capacity, so
/// the result never exceeds the nominal capacity.
pub fn effective_capacity(room: &Room, constraints: &Constraints) -> u32 {
    if constraints.spacing_constraint {
        room.capacity / 2
    } else {
        room.capacity
    }
}
