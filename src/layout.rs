//! Seat geometry for the three room styles.
//!
//! Seats are numbered from 1 in emission order and numbering stops as soon as
//! `capacity` seats exist, even part-way through a row or cluster.

use crate::data::{LayoutStyle, Room, Seat, SeatState};
use log::trace;

pub const CLUSTER_SIZE: u32 = 12;
pub const CLUSTER_COLUMNS: u32 = 3;
pub const CURVED_FRONT_ROW: u32 = 15;

pub fn generate_seat_layout(room: &Room) -> Vec<Seat> {
    let seats = match room.layout {
        LayoutStyle::Grid => grid_layout(room.capacity),
        LayoutStyle::Clustered => clustered_layout(room.capacity),
        LayoutStyle::Curved => curved_layout(room.capacity),
    };
    trace!(
        "Room {} ({} layout): {} seats",
        room.id,
        room.layout,
        seats.len()
    );
    seats
}

/// `(rows, cols)` of a grid holding `capacity` seats.
pub fn grid_dimensions(capacity: u32) -> (u32, u32) {
    if capacity == 0 {
        return (0, 0);
    }
    let root = capacity.isqrt();
    let rows = if root * root < capacity { root + 1 } else { root };
    (rows, capacity.div_ceil(rows))
}

fn seat(number: u32, row: u32, col: u32, cluster: u32) -> Seat {
    Seat {
        number,
        row,
        col,
        cluster,
        state: SeatState::Available,
    }
}

fn grid_layout(capacity: u32) -> Vec<Seat> {
    let (rows, cols) = grid_dimensions(capacity);
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .take(capacity as usize)
        .zip(1..)
        .map(|((row, col), number)| seat(number, row, col, 0))
        .collect()
}

fn clustered_layout(capacity: u32) -> Vec<Seat> {
    if capacity == 0 {
        return Vec::new();
    }
    let clusters = capacity.div_ceil(CLUSTER_SIZE);
    let per_cluster = capacity.div_ceil(clusters);
    (0..clusters)
        .flat_map(|cluster| (0..per_cluster).map(move |j| (cluster, j)))
        .take(capacity as usize)
        .zip(1..)
        .map(|((cluster, j), number)| {
            seat(number, j / CLUSTER_COLUMNS, j % CLUSTER_COLUMNS, cluster)
        })
        .collect()
}

/// Rows shrink by one seat each, never below a single seat. Rows beyond
/// `ceil(capacity / 15)` are added when the shrinking rows run short.
fn curved_layout(capacity: u32) -> Vec<Seat> {
    let mut seats = Vec::with_capacity(capacity as usize);
    let mut row = 0;
    while (seats.len() as u32) < capacity {
        let width = CURVED_FRONT_ROW.saturating_sub(row).max(1);
        let remaining = capacity - seats.len() as u32;
        for col in 0..width.min(remaining) {
            let number = seats.len() as u32 + 1;
            seats.push(seat(number, row, col, 0));
        }
        row += 1;
    }
    seats
}
