//! Canvas coordinates and the coordinate generators effects build paths from.
//!
//! Terminal cells are roughly twice as tall as they are wide, so the shape
//! generators double column distances to keep circles looking round.

use std::collections::HashSet;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// An integer canvas position. Columns grow to the right, rows grow upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub column: i32,
    pub row: i32,
}

impl Coord {
    pub const fn new(column: i32, row: i32) -> Self {
        Coord { column, row }
    }
}

/// Euclidean distance between two coordinates. With `double_row_diff` the row
/// distance counts twice, compensating for the cell aspect ratio.
pub fn find_length_of_line(a: Coord, b: Coord, double_row_diff: bool) -> f64 {
    let column_diff = (b.column - a.column) as f64;
    let mut row_diff = (b.row - a.row) as f64;
    if double_row_diff {
        row_diff *= 2.0;
    }
    column_diff.hypot(row_diff)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Point at progress `t` along the straight line from `start` to `end`,
/// rounded to the nearest cell.
pub fn interpolate_coord(start: Coord, end: Coord, t: f64) -> Coord {
    Coord::new(
        lerp(start.column as f64, end.column as f64, t).round() as i32,
        lerp(start.row as f64, end.row as f64, t).round() as i32,
    )
}

/// `points` evenly spaced coordinates on a circle, counter-clockwise from
/// the positive column axis. With `unique`, coordinates that round onto an
/// already produced cell are dropped.
pub fn find_coords_on_circle(origin: Coord, radius: i32, points: usize, unique: bool) -> Vec<Coord> {
    if points == 0 {
        return Vec::new();
    }
    let step = TAU / points as f64;
    let mut seen = HashSet::new();
    let mut coords = Vec::with_capacity(points);
    for i in 0..points {
        let angle = step * i as f64;
        let column = origin.column as f64 + 2.0 * radius as f64 * angle.cos();
        let row = origin.row as f64 + radius as f64 * angle.sin();
        let coord = Coord::new(column.round() as i32, row.round() as i32);
        if unique && !seen.insert(coord) {
            continue;
        }
        coords.push(coord);
    }
    coords
}

/// Every coordinate in the square of half-size `distance` centred on `origin`.
pub fn find_coords_in_rect(origin: Coord, distance: i32) -> Vec<Coord> {
    let distance = distance.max(0);
    let side = (2 * distance + 1) as usize;
    let mut coords = Vec::with_capacity(side * side);
    for column in origin.column - distance..=origin.column + distance {
        for row in origin.row - distance..=origin.row + distance {
            coords.push(Coord::new(column, row));
        }
    }
    coords
}
