//! Greedy no-adjacent seat assignment.
//!
//! Students are seated in input order. Each takes the lowest-numbered seat
//! that is still available and has no occupied neighbour; the seat's
//! neighbours are then blocked for everyone after. There is no backtracking,
//! so a student may go unseated even when some other arrangement would fit
//! them. Unseated students are reported, not treated as an error.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::data::{Seat, SeatAssignment, SeatNumber, SeatState, SeatingOutcome, Student};
use log::{debug, info, warn};

pub const DEFAULT_ROW_WIDTH: u32 = 10;

/// Which seats count as neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AdjacencyRule {
    /// Seat numbers laid out in rows of `row_width`, whatever the room's real
    /// geometry: left, right, above, below and the two diagonals above.
    FixedWidth { row_width: u32 },
    /// Seats in the same cluster whose row and column each differ by at most one.
    Geometric,
}

impl Default for AdjacencyRule {
    fn default() -> Self {
        Self::FixedWidth {
            row_width: DEFAULT_ROW_WIDTH,
        }
    }
}

/// Neighbour lookup for one layout under one rule.
pub struct Adjacency {
    rule: AdjacencyRule,
    positions: HashMap<SeatNumber, (u32, u32, u32)>,
    by_position: HashMap<(u32, u32, u32), SeatNumber>,
}

impl Adjacency {
    pub fn new(rule: AdjacencyRule, layout: &[Seat]) -> Self {
        let positions: HashMap<_, _> = layout
            .iter()
            .map(|s| (s.number, (s.cluster, s.row, s.col)))
            .collect();
        let by_position = positions.iter().map(|(&n, &p)| (p, n)).collect();
        Self {
            rule,
            positions,
            by_position,
        }
    }

    /// Neighbours of `seat`. Numbers outside the layout may appear under the
    /// fixed-width rule; callers ignore them.
    pub fn neighbors(&self, seat: SeatNumber) -> Vec<SeatNumber> {
        match self.rule {
            AdjacencyRule::FixedWidth { row_width } => fixed_width_neighbors(seat, row_width),
            AdjacencyRule::Geometric => self.geometric_neighbors(seat),
        }
    }

    /// Symmetric closure of [`Adjacency::neighbors`].
    #[cfg(test)]
    pub fn are_adjacent(&self, a: SeatNumber, b: SeatNumber) -> bool {
        self.neighbors(a).contains(&b) || self.neighbors(b).contains(&a)
    }

    fn geometric_neighbors(&self, seat: SeatNumber) -> Vec<SeatNumber> {
        let Some(&(cluster, row, col)) = self.positions.get(&seat) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for r in row.saturating_sub(1)..=row + 1 {
            for c in col.saturating_sub(1)..=col + 1 {
                if (r, c) == (row, col) {
                    continue;
                }
                if let Some(&n) = self.by_position.get(&(cluster, r, c)) {
                    out.push(n);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

pub fn fixed_width_neighbors(seat: SeatNumber, row_width: u32) -> Vec<SeatNumber> {
    if seat == 0 || row_width == 0 {
        return Vec::new();
    }
    let w = row_width;
    let row = (seat - 1) / w;
    let col = (seat - 1) % w;
    let mut out = Vec::with_capacity(6);
    if col > 0 {
        out.push(seat - 1);
    }
    if col < w - 1 {
        out.extend(seat.checked_add(1));
    }
    if row > 0 {
        out.push(seat - w);
        if col > 0 {
            out.push(seat - w - 1);
        }
        if col < w - 1 {
            out.push(seat - w + 1);
        }
    }
    // past the last representable seat there is no row below
    out.extend(seat.checked_add(w));
    out
}

/// Seats `students` in `layout` so no two occupied seats are adjacent.
///
/// Only seats that start out `Available` are candidates. The returned seats
/// carry the final states; the input layout is not modified.
pub fn assign_seats(students: &[Student], layout: &[Seat], rule: AdjacencyRule) -> SeatingOutcome {
    let adjacency = Adjacency::new(rule, layout);
    let mut seats: Vec<Seat> = layout.to_vec();
    let index: HashMap<SeatNumber, usize> =
        seats.iter().enumerate().map(|(i, s)| (s.number, i)).collect();
    let mut candidates: Vec<usize> = seats
        .iter()
        .enumerate()
        .filter(|(_, s)| s.state == SeatState::Available)
        .map(|(i, _)| i)
        .collect();
    candidates.sort_by_key(|&i| seats[i].number);

    let mut occupied: HashSet<SeatNumber> = HashSet::new();
    let mut assignments = Vec::new();
    let mut unseated = Vec::new();

    for student in students {
        let pick = candidates.iter().copied().find(|&i| {
            seats[i].state == SeatState::Available
                && !adjacency
                    .neighbors(seats[i].number)
                    .iter()
                    .any(|n| occupied.contains(n))
        });
        let Some(i) = pick else {
            debug!("No eligible seat left for student {}", student.id);
            unseated.push(student.id.clone());
            continue;
        };

        let number = seats[i].number;
        seats[i].state = SeatState::Occupied;
        occupied.insert(number);
        for neighbor in adjacency.neighbors(number) {
            if let Some(&j) = index.get(&neighbor) {
                if seats[j].state == SeatState::Available {
                    seats[j].state = SeatState::Blocked;
                }
            }
        }
        assignments.push(SeatAssignment {
            student: student.clone(),
            seat_number: number,
        });
    }

    if unseated.is_empty() {
        info!("Seated all {} students", assignments.len());
    } else {
        warn!(
            "Seated {} of {} students; {} left without an eligible seat",
            assignments.len(),
            students.len(),
            unseated.len()
        );
    }
    SeatingOutcome {
        assignments,
        seats,
        unseated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LayoutStyle, Room};
    use crate::layout::generate_seat_layout;
    use crate::solver::tests::students_for;

    fn single_row(count: u32) -> Vec<Seat> {
        (1..=count)
            .map(|number| Seat {
                number,
                row: 0,
                col: number - 1,
                cluster: 0,
                state: SeatState::Available,
            })
            .collect()
    }

    fn layout_for(capacity: u32, layout: LayoutStyle) -> Vec<Seat> {
        generate_seat_layout(&Room {
            id: "R".to_string(),
            name: "Room".to_string(),
            capacity,
            layout,
            equipment: Vec::new(),
        })
    }

    fn seat_numbers(outcome: &SeatingOutcome) -> Vec<SeatNumber> {
        outcome.assignments.iter().map(|a| a.seat_number).collect()
    }

    fn assert_no_adjacent_pairs(outcome: &SeatingOutcome, adjacency: &Adjacency) {
        let numbers = seat_numbers(outcome);
        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), numbers.len(), "duplicate seats: {numbers:?}");
        for (i, a) in numbers.iter().enumerate() {
            for b in &numbers[i + 1..] {
                assert!(!adjacency.are_adjacent(*a, *b), "{a} and {b} are adjacent");
            }
        }
    }

    #[test]
    fn fixed_width_neighbors_respect_row_edges() {
        assert_eq!(fixed_width_neighbors(1, 10), vec![2, 11]);
        assert_eq!(fixed_width_neighbors(10, 10), vec![9, 20]);
        assert_eq!(fixed_width_neighbors(11, 10), vec![12, 1, 2, 21]);
        assert_eq!(fixed_width_neighbors(15, 10), vec![14, 16, 5, 4, 6, 25]);
        assert!(!fixed_width_neighbors(11, 10).contains(&10));
    }

    #[test]
    fn very_wide_rows_stay_in_range() {
        assert_eq!(fixed_width_neighbors(1, u32::MAX), vec![2]);
        assert_eq!(fixed_width_neighbors(u32::MAX, u32::MAX), vec![u32::MAX - 1]);
        assert_eq!(
            fixed_width_neighbors(u32::MAX, 10),
            vec![u32::MAX - 1, u32::MAX - 10, u32::MAX - 11, u32::MAX - 9]
        );
        let rule = AdjacencyRule::FixedWidth { row_width: u32::MAX };
        let outcome = assign_seats(&students_for("X", 3), &single_row(4), rule);
        assert_eq!(seat_numbers(&outcome), vec![1, 3]);
        assert_eq!(outcome.unseated, vec!["X-S002"]);
    }

    #[test]
    fn five_students_six_seats_in_a_row() {
        let students = students_for("CS101", 5);
        let outcome = assign_seats(&students, &single_row(6), AdjacencyRule::default());
        assert_eq!(seat_numbers(&outcome), vec![1, 3, 5]);
        assert_eq!(outcome.unseated, vec!["CS101-S003", "CS101-S004"]);
        let states: Vec<SeatState> = outcome.seats.iter().map(|s| s.state).collect();
        use SeatState::*;
        assert_eq!(states, vec![Occupied, Blocked, Occupied, Blocked, Occupied, Blocked]);
    }

    #[test]
    fn only_available_seats_are_used() {
        let mut layout = single_row(6);
        layout[0].state = SeatState::Selected;
        layout[3].state = SeatState::Blocked;
        let outcome = assign_seats(&students_for("X", 3), &layout, AdjacencyRule::default());
        assert_eq!(seat_numbers(&outcome), vec![2, 5]);
        assert_eq!(outcome.seats[0].state, SeatState::Selected);
        assert_eq!(outcome.seats[5].state, SeatState::Blocked);
        assert_eq!(outcome.unseated.len(), 1);
    }

    #[test]
    fn input_layout_is_untouched() {
        let layout = layout_for(12, LayoutStyle::Grid);
        let before = layout.clone();
        let _ = assign_seats(&students_for("X", 4), &layout, AdjacencyRule::default());
        assert_eq!(layout, before);
    }

    #[test]
    fn no_students_no_assignments() {
        let outcome = assign_seats(&[], &single_row(4), AdjacencyRule::default());
        assert!(outcome.assignments.is_empty());
        assert!(outcome.unseated.is_empty());
    }

    #[test]
    fn fixed_width_result_never_seats_neighbors() {
        for style in [LayoutStyle::Grid, LayoutStyle::Clustered, LayoutStyle::Curved] {
            let layout = layout_for(80, style);
            let rule = AdjacencyRule::default();
            let outcome = assign_seats(&students_for("X", 80), &layout, rule);
            assert_no_adjacent_pairs(&outcome, &Adjacency::new(rule, &layout));
            assert_eq!(outcome.assignments.len() + outcome.unseated.len(), 80);
        }
    }

    #[test]
    fn geometric_result_never_seats_neighbors() {
        for style in [LayoutStyle::Grid, LayoutStyle::Clustered, LayoutStyle::Curved] {
            let layout = layout_for(80, style);
            let rule = AdjacencyRule::Geometric;
            let outcome = assign_seats(&students_for("X", 80), &layout, rule);
            assert!(!outcome.assignments.is_empty());
            assert_no_adjacent_pairs(&outcome, &Adjacency::new(rule, &layout));
        }
    }

    #[test]
    fn geometric_rule_follows_grid_rows() {
        // 30 seats form a 6 x 5 grid
        let layout = layout_for(30, LayoutStyle::Grid);
        let outcome = assign_seats(&students_for("X", 15), &layout, AdjacencyRule::Geometric);
        assert_eq!(seat_numbers(&outcome), vec![1, 3, 5, 11, 13, 15, 21, 23, 25]);
        assert_eq!(outcome.unseated.len(), 6);
    }

    #[test]
    fn fixed_width_rule_ignores_real_grid_rows() {
        // Seats 1 and 7 touch diagonally in the real 6 x 5 grid, but the
        // width-10 rule puts them in the same row two apart.
        let layout = layout_for(30, LayoutStyle::Grid);
        let outcome = assign_seats(&students_for("X", 15), &layout, AdjacencyRule::default());
        assert_eq!(
            seat_numbers(&outcome),
            vec![1, 3, 5, 7, 9, 21, 23, 25, 27, 29]
        );
        let geometric = Adjacency::new(AdjacencyRule::Geometric, &layout);
        assert!(geometric.are_adjacent(1, 7));
    }

    #[test]
    fn geometric_clusters_do_not_touch() {
        // 24 seats: two clusters of 12; seat 12 ends cluster 0, seat 13 starts cluster 1
        let layout = layout_for(24, LayoutStyle::Clustered);
        let adjacency = Adjacency::new(AdjacencyRule::Geometric, &layout);
        assert!(!adjacency.are_adjacent(12, 13));
        assert!(adjacency.are_adjacent(1, 5));
        assert_eq!(adjacency.neighbors(1), vec![2, 4, 5]);
    }

    #[test]
    fn rule_round_trips_through_json() {
        let rule: AdjacencyRule =
            serde_json::from_str(r#"{"kind":"fixedWidth","rowWidth":6}"#).unwrap();
        assert_eq!(rule, AdjacencyRule::FixedWidth { row_width: 6 });
        let rule: AdjacencyRule = serde_json::from_str(r#"{"kind":"geometric"}"#).unwrap();
        assert_eq!(rule, AdjacencyRule::Geometric);
    }
}
