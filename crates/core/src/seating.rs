//! Exam-hall seating.
//!
//! Students are interleaved across branches so that no two students of the
//! same branch sit next to each other whenever the numbers allow it. Rooms
//! are filled in submission order, seats row-major. Students beyond total
//! capacity are returned as `unplaced`.
//!
//! A greedy pass seats everyone; a room it leaves with same-branch
//! neighbours is then re-seated by a depth-first search over the same
//! students, bounded by [`ROOM_SEARCH_BUDGET`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::normalize::{ExamRoom, Student};

/// Seats the per-room search may try before the greedy layout is kept.
pub const ROOM_SEARCH_BUDGET: u64 = 200_000;

/// Which neighbouring seats count as adjacent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjacencyPolicy {
    /// Left/right in the same row, front/back in the same column.
    #[default]
    #[serde(rename = "orthogonal")]
    Orthogonal,
    /// Orthogonal neighbours plus the four diagonals.
    #[serde(rename = "diagonal")]
    WithDiagonals,
}

/// One occupied seat. `row` and `col` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatAssignment {
    pub room_name: String,
    pub row: usize,
    pub col: usize,
    pub student: Student,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatingPlan {
    pub assignments: Vec<SeatAssignment>,
    pub unplaced: Vec<Student>,
    /// Same-branch adjacent pairs left in the plan.
    pub adjacent_conflicts: usize,
}

/// Seat `students` in `rooms`.
///
/// At each seat the branch with the most students left wins among branches
/// that would not sit next to a same-branch neighbour (ties by branch name).
/// When every branch conflicts, the seat stays empty if the seats after it
/// can still hold everyone left; otherwise the largest branch takes it.
/// A room that still has same-branch neighbours afterwards is re-seated
/// without any when such a layout is found within [`ROOM_SEARCH_BUDGET`].
/// Room names must be unique.
pub fn allocate(students: &[Student], rooms: &[ExamRoom], policy: AdjacencyPolicy) -> SeatingPlan {
    let mut ordered: Vec<&Student> = students.iter().collect();
    ordered.sort_by(|a, b| {
        a.branch
            .cmp(&b.branch)
            .then_with(|| compare_roll_numbers(&a.roll_no, &b.roll_no))
    });

    let mut queues: BTreeMap<&str, VecDeque<&Student>> = BTreeMap::new();
    for s in ordered {
        queues.entry(s.branch.as_str()).or_default().push_back(s);
    }

    let mut remaining_students = students.len();
    let mut remaining_seats: usize = rooms.iter().map(ExamRoom::capacity).sum();
    let mut assignments = Vec::with_capacity(remaining_students.min(remaining_seats));

    'rooms: for room in rooms {
        let mut grid: Vec<Vec<Option<&str>>> = vec![vec![None; room.cols]; room.rows];

        for row in 0..room.rows {
            for col in 0..room.cols {
                if remaining_students == 0 {
                    break 'rooms;
                }
                remaining_seats -= 1;

                let neighbours = placed_neighbours(&grid, row, col, policy);
                let pick = pick_branch(&queues, |branch| !neighbours.iter().any(|&n| n == branch))
                    .or_else(|| {
                        // Leave a gap if later seats can still take everyone.
                        if remaining_seats >= remaining_students {
                            None
                        } else {
                            pick_branch(&queues, |_| true)
                        }
                    });

                let Some(branch) = pick else { continue };
                let Some(student) = queues.get_mut(branch).and_then(VecDeque::pop_front) else {
                    continue;
                };
                grid[row][col] = Some(branch);
                remaining_students -= 1;
                assignments.push(SeatAssignment {
                    room_name: room.name.clone(),
                    row: row + 1,
                    col: col + 1,
                    student: student.clone(),
                });
            }
        }
    }

    let unplaced: Vec<Student> = queues
        .into_values()
        .flatten()
        .map(|s| (*s).clone())
        .collect();

    for room in rooms {
        reseat_room(&mut assignments, room, policy);
    }

    let adjacent_conflicts = count_adjacent_conflicts(&assignments, policy);
    SeatingPlan {
        assignments,
        unplaced,
        adjacent_conflicts,
    }
}

/// Count same-branch pairs of adjacent seats under `policy`.
pub fn count_adjacent_conflicts(assignments: &[SeatAssignment], policy: AdjacencyPolicy) -> usize {
    let seats: HashMap<(&str, usize, usize), &str> = assignments
        .iter()
        .map(|a| ((a.room_name.as_str(), a.row, a.col), a.student.branch.as_str()))
        .collect();

    // Each unordered pair is counted once by only looking right and down.
    let mut forward: Vec<(isize, isize)> = vec![(0, 1), (1, 0)];
    if policy == AdjacencyPolicy::WithDiagonals {
        forward.extend([(1, 1), (1, -1)]);
    }

    seats
        .iter()
        .map(|(&(room, row, col), &branch)| {
            forward
                .iter()
                .filter(|&&(dr, dc)| {
                    let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc))
                    else {
                        return false;
                    };
                    seats.get(&(room, r, c)) == Some(&branch)
                })
                .count()
        })
        .sum()
}

/// Order roll numbers so that embedded numbers compare by value
/// (`CS2` before `CS10`).
pub fn compare_roll_numbers(a: &str, b: &str) -> Ordering {
    let (mut xs, mut ys) = (chunks(a), chunks(b));
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_digits(x), is_digits(y)) {
                    (true, true) => {
                        let (x, y) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
                        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
                    }
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Branches of the already-filled seats adjacent to (row, col): left and
/// front, plus the front diagonals under [`AdjacencyPolicy::WithDiagonals`].
fn placed_neighbours<'a>(
    grid: &[Vec<Option<&'a str>>],
    row: usize,
    col: usize,
    policy: AdjacencyPolicy,
) -> Vec<&'a str> {
    let mut cells = Vec::with_capacity(4);
    if col > 0 {
        cells.push((row, col - 1));
    }
    if row > 0 {
        cells.push((row - 1, col));
        if policy == AdjacencyPolicy::WithDiagonals {
            if col > 0 {
                cells.push((row - 1, col - 1));
            }
            if col + 1 < grid[row].len() {
                cells.push((row - 1, col + 1));
            }
        }
    }
    cells.into_iter().filter_map(|(r, c)| grid[r][c]).collect()
}

/// Replace `room`'s assignments with a conflict-free layout of the same
/// students, if it has conflicts and the search finds one.
///
/// Each branch keeps its roll-number order in row-major seat order.
fn reseat_room(assignments: &mut Vec<SeatAssignment>, room: &ExamRoom, policy: AdjacencyPolicy) {
    let Some(first) = assignments.iter().position(|a| a.room_name == room.name) else {
        return;
    };
    let end = first
        + assignments[first..]
            .iter()
            .take_while(|a| a.room_name == room.name)
            .count();
    let seated: Vec<SeatAssignment> = assignments[first..end].to_vec();
    if count_adjacent_conflicts(&seated, policy) == 0 {
        return;
    }

    let mut left: BTreeMap<&str, usize> = BTreeMap::new();
    for a in &seated {
        *left.entry(a.student.branch.as_str()).or_default() += 1;
    }
    let mut search = RoomSearch {
        cols: room.cols,
        capacity: room.capacity(),
        policy,
        grid: vec![vec![None; room.cols]; room.rows],
        left,
        to_seat: seated.len(),
        budget: ROOM_SEARCH_BUDGET,
    };
    if !search.search(0) {
        return;
    }

    let mut queues: HashMap<&str, VecDeque<&Student>> = HashMap::new();
    for a in &seated {
        queues
            .entry(a.student.branch.as_str())
            .or_default()
            .push_back(&a.student);
    }
    let mut reseated = Vec::with_capacity(seated.len());
    for (row, cells) in search.grid.iter().enumerate() {
        for (col, &cell) in cells.iter().enumerate() {
            let Some(student) = cell.and_then(|b| queues.get_mut(b)?.pop_front()) else {
                continue;
            };
            reseated.push(SeatAssignment {
                room_name: room.name.clone(),
                row: row + 1,
                col: col + 1,
                student: student.clone(),
            });
        }
    }
    assignments.splice(first..end, reseated);
}

/// Depth-first search for a layout of one room with no same-branch
/// neighbours. Seats are visited row-major; a seat may stay empty while the
/// seats after it can still hold everyone left.
struct RoomSearch<'a> {
    cols: usize,
    capacity: usize,
    policy: AdjacencyPolicy,
    grid: Vec<Vec<Option<&'a str>>>,
    left: BTreeMap<&'a str, usize>,
    to_seat: usize,
    budget: u64,
}

impl<'a> RoomSearch<'a> {
    fn search(&mut self, seat: usize) -> bool {
        if self.to_seat == 0 {
            return true;
        }
        if seat == self.capacity || self.budget == 0 {
            return false;
        }
        self.budget -= 1;

        let (row, col) = (seat / self.cols, seat % self.cols);
        let neighbours = placed_neighbours(&self.grid, row, col, self.policy);
        let mut candidates: Vec<(&'a str, usize)> = self
            .left
            .iter()
            .filter(|&(branch, &n)| n > 0 && !neighbours.contains(branch))
            .map(|(&branch, &n)| (branch, n))
            .collect();
        // Largest branch first; the sort is stable so ties stay in name order.
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        for (branch, _) in candidates {
            self.set(row, col, Some(branch));
            if self.search(seat + 1) {
                return true;
            }
            self.set(row, col, None);
        }

        self.capacity - seat - 1 >= self.to_seat && self.search(seat + 1)
    }

    fn set(&mut self, row: usize, col: usize, cell: Option<&'a str>) {
        if let Some(old) = self.grid[row][col].take() {
            *self.left.entry(old).or_default() += 1;
            self.to_seat += 1;
        }
        if let Some(branch) = cell {
            *self.left.entry(branch).or_default() -= 1;
            self.to_seat -= 1;
        }
        self.grid[row][col] = cell;
    }
}

/// The allowed branch with the most students waiting; ties go to the first
/// branch in name order.
fn pick_branch<'a>(
    queues: &BTreeMap<&'a str, VecDeque<&Student>>,
    allowed: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for (&branch, queue) in queues {
        if queue.is_empty() || !allowed(branch) {
            continue;
        }
        if best.map_or(true, |(_, n)| queue.len() > n) {
            best = Some((branch, queue.len()));
        }
    }
    best.map(|(branch, _)| branch)
}

fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digit = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digit)
            .map_or(rest.len(), |(i, _)| i);
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
