//! Paths and per-tick movement toward waypoints.
//!
//! A character owns a registry of named paths and follows at most one at a
//! time. Reaching a waypoint advances to the next one on the following tick
//! (never more than one waypoint per tick); reaching the last waypoint of a
//! non-looping path completes it and leaves that waypoint as the resting
//! target.
//!
//! Segments without easing move like a Bresenham line: the axis with the
//! longer distance steps `speed` cells per tick, the other axis a fraction
//! of that, accumulated in floats and truncated toward the cell the
//! character came from. Eased segments instead place the character at
//! `ease(step / total_steps)` of the straight line.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::easing::Easing;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{find_length_of_line, interpolate_coord, Coord};

/// Handle of a path inside one character's registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(String);

impl PathId {
    pub fn new(id: impl Into<String>) -> Self {
        PathId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_speed(speed: f64) -> EngineResult<f64> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(EngineError::InvalidSpeed { speed })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub coord: Coord,
    /// Overrides the path speed for the segment ending here.
    pub speed: Option<f64>,
    /// Overrides the path easing for the segment ending here.
    pub ease: Option<Easing>,
}

#[derive(Debug, Clone)]
pub struct Path {
    id: PathId,
    waypoints: Vec<Waypoint>,
    speed: f64,
    ease: Option<Easing>,
    looping: bool,
}

impl Path {
    pub fn new(id: PathId, speed: f64, ease: Option<Easing>) -> EngineResult<Self> {
        Ok(Path {
            id,
            waypoints: Vec::new(),
            speed: check_speed(speed)?,
            ease,
            looping: false,
        })
    }

    pub fn id(&self) -> &PathId {
        &self.id
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn ease(&self) -> Option<Easing> {
        self.ease
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) -> &mut Self {
        self.looping = looping;
        self
    }

    pub fn new_waypoint(&mut self, coord: Coord) -> &mut Self {
        self.waypoints.push(Waypoint {
            coord,
            speed: None,
            ease: None,
        });
        self
    }

    pub fn new_waypoint_with(
        &mut self,
        coord: Coord,
        speed: Option<f64>,
        ease: Option<Easing>,
    ) -> EngineResult<&mut Self> {
        let speed = speed.map(check_speed).transpose()?;
        self.waypoints.push(Waypoint { coord, speed, ease });
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Tweened {
        column: f64,
        row: f64,
        column_delta: f64,
        row_delta: f64,
        column_is_major: bool,
    },
    Eased {
        start: Coord,
        ease: Easing,
        step: usize,
        total_steps: usize,
    },
}

/// Position state and path registry of one character.
#[derive(Debug, Clone)]
pub struct Motion {
    paths: HashMap<PathId, Path>,
    active_path: Option<PathId>,
    waypoint_index: usize,
    segment: Option<Segment>,
    current_coord: Coord,
    previous_coord: Coord,
    target_coord: Coord,
}

impl Motion {
    pub fn new(coord: Coord) -> Self {
        Motion {
            paths: HashMap::new(),
            active_path: None,
            waypoint_index: 0,
            segment: None,
            current_coord: coord,
            previous_coord: coord,
            target_coord: coord,
        }
    }

    pub fn current_coord(&self) -> Coord {
        self.current_coord
    }

    /// Coordinate held before the most recent motion step.
    pub fn previous_coord(&self) -> Coord {
        self.previous_coord
    }

    pub fn target_coord(&self) -> Coord {
        self.target_coord
    }

    /// Teleport to `coord`. Without an active path the target follows, so
    /// the character stays put afterwards.
    pub fn set_coordinate(&mut self, coord: Coord) {
        self.current_coord = coord;
        self.segment = None;
        if self.active_path.is_none() {
            self.target_coord = coord;
        }
    }

    /// Register a new empty path. Without an id the first unused decimal
    /// number is taken. An existing path with the same id is replaced.
    pub fn new_path(
        &mut self,
        id: Option<&str>,
        speed: f64,
        ease: Option<Easing>,
    ) -> EngineResult<&mut Path> {
        let id = match id {
            Some(id) => PathId::new(id),
            None => {
                let mut n = 0usize;
                while self.paths.contains_key(&PathId::new(n.to_string())) {
                    n += 1;
                }
                PathId::new(n.to_string())
            }
        };
        let path = Path::new(id.clone(), speed, ease)?;
        Ok(match self.paths.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(path);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(path),
        })
    }

    pub fn remove_path(&mut self, id: &PathId) -> Option<Path> {
        if self.active_path.as_ref() == Some(id) {
            self.deactivate_path(id);
        }
        self.paths.remove(id)
    }

    pub fn query_path(&self, id: &str) -> EngineResult<PathId> {
        let id = PathId::new(id);
        if self.paths.contains_key(&id) {
            Ok(id)
        } else {
            Err(EngineError::UnknownPath { id: id.0 })
        }
    }

    pub fn has_path(&self, id: &str) -> bool {
        self.paths.contains_key(&PathId::new(id))
    }

    pub fn path(&self, id: &PathId) -> EngineResult<&Path> {
        self.paths.get(id).ok_or_else(|| EngineError::UnknownPath {
            id: id.to_string(),
        })
    }

    pub fn path_mut(&mut self, id: &PathId) -> EngineResult<&mut Path> {
        self.paths.get_mut(id).ok_or_else(|| EngineError::UnknownPath {
            id: id.to_string(),
        })
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active_path.as_ref().and_then(|id| self.paths.get(id))
    }

    /// Start following `id` from its first waypoint.
    pub fn activate_path(&mut self, id: &PathId) -> EngineResult<()> {
        let first = self
            .path(id)?
            .waypoints
            .first()
            .map(|waypoint| waypoint.coord)
            .ok_or_else(|| EngineError::EmptyPath { id: id.to_string() })?;
        self.target_coord = first;
        self.waypoint_index = 0;
        self.segment = None;
        trace!("activate path {id}");
        self.active_path = Some(id.clone());
        Ok(())
    }

    /// Stop following `id` if it is the active path; the character rests
    /// where it is.
    pub fn deactivate_path(&mut self, id: &PathId) {
        if self.active_path.as_ref() == Some(id) {
            self.active_path = None;
            self.segment = None;
            self.target_coord = self.current_coord;
        }
    }

    /// No path is active and the character sits on its target.
    pub fn movement_complete(&self) -> bool {
        self.active_path.is_none() && self.current_coord == self.target_coord
    }

    /// One motion tick. Returns the id of a path that completed this tick.
    pub(crate) fn step(&mut self) -> Option<PathId> {
        self.previous_coord = self.current_coord;
        let id = self.active_path.clone()?;
        let Some(path) = self.paths.get(&id) else {
            self.active_path = None;
            return None;
        };
        let Some(last) = path.waypoints.len().checked_sub(1) else {
            self.active_path = None;
            return None;
        };
        self.waypoint_index = self.waypoint_index.min(last);

        if self.current_coord == self.target_coord {
            if self.waypoint_index < last {
                self.waypoint_index += 1;
            } else if path.looping {
                self.waypoint_index = 0;
            } else {
                self.active_path = None;
                self.segment = None;
                return Some(id);
            }
            self.target_coord = path.waypoints[self.waypoint_index].coord;
            self.segment = None;
        }

        let waypoint = path.waypoints[self.waypoint_index];
        let speed = waypoint.speed.unwrap_or(path.speed);
        let ease = waypoint.ease.or(path.ease);
        let looping = path.looping;
        self.advance(speed, ease);

        if self.current_coord == self.target_coord && self.waypoint_index == last && !looping {
            self.active_path = None;
            self.segment = None;
            return Some(id);
        }
        None
    }

    fn advance(&mut self, speed: f64, ease: Option<Easing>) {
        let current = self.current_coord;
        let target = self.target_coord;
        if current == target {
            return;
        }

        let segment = self.segment.get_or_insert_with(|| match ease {
            Some(ease) => {
                let distance = find_length_of_line(current, target, true);
                Segment::Eased {
                    start: current,
                    ease,
                    step: 0,
                    total_steps: ((distance / speed).ceil() as usize).max(1),
                }
            }
            None => {
                let column_distance = (current.column - target.column).abs() as f64;
                let row_distance = (current.row - target.row).abs() as f64;
                let mut delta = column_distance.min(row_distance)
                    / column_distance.max(row_distance).max(1.0);
                if delta == 0.0 {
                    delta = 1.0;
                }
                let (column_delta, row_delta) = if column_distance < row_distance {
                    (delta, 1.0)
                } else if row_distance < column_distance {
                    (1.0, delta)
                } else {
                    (1.0, 1.0)
                };
                Segment::Tweened {
                    column: current.column as f64,
                    row: current.row as f64,
                    column_delta: column_delta * speed,
                    row_delta: row_delta * speed,
                    column_is_major: column_distance >= row_distance,
                }
            }
        });

        match segment {
            Segment::Eased {
                start,
                ease,
                step,
                total_steps,
            } => {
                *step += 1;
                self.current_coord = if *step >= *total_steps {
                    target
                } else {
                    interpolate_coord(*start, target, ease.apply(*step as f64 / *total_steps as f64))
                };
            }
            Segment::Tweened {
                column,
                row,
                column_delta,
                row_delta,
                column_is_major,
            } => {
                let next_column = tween_axis(column, *column_delta, current.column, target.column);
                let next_row = tween_axis(row, *row_delta, current.row, target.row);
                let major_done = if *column_is_major {
                    next_column == target.column
                } else {
                    next_row == target.row
                };
                self.current_coord = if major_done {
                    target
                } else {
                    Coord::new(next_column, next_row)
                };
            }
        }
    }
}

/// Move one axis by `delta` toward `target`, truncating toward the cell the
/// axis is leaving and never passing the target.
fn tween_axis(tweened: &mut f64, delta: f64, current: i32, target: i32) -> i32 {
    if current < target {
        *tweened += delta;
        (tweened.floor() as i32).min(target)
    } else if current > target {
        *tweened -= delta;
        (tweened.ceil() as i32).max(target)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion_with_path(start: Coord, waypoints: &[Coord], speed: f64, ease: Option<Easing>) -> (Motion, PathId) {
        let mut motion = Motion::new(start);
        let path = motion.new_path(Some("p"), speed, ease).unwrap();
        for coord in waypoints {
            path.new_waypoint(*coord);
        }
        let id = path.id().clone();
        motion.activate_path(&id).unwrap();
        (motion, id)
    }

    #[test]
    fn test_converges_within_major_distance_without_overshoot() {
        let start = Coord::new(3, 4);
        for target in [
            Coord::new(13, 11),
            Coord::new(-7, 9),
            Coord::new(3, -20),
            Coord::new(40, 3),
            Coord::new(10, 11),
            Coord::new(4, 37),
        ] {
            let (mut motion, id) = motion_with_path(start, &[target], 1.0, None);
            let dc = (target.column - start.column).abs();
            let dr = (target.row - start.row).abs();
            let bound = dc.max(dr).max(1);
            let mut completed = None;
            for _ in 0..bound {
                let before = motion.current_coord();
                completed = completed.or(motion.step());
                let now = motion.current_coord();
                assert!((now.column - target.column).abs() <= (before.column - target.column).abs());
                assert!((now.row - target.row).abs() <= (before.row - target.row).abs());
                assert!((now.column - before.column).abs() <= 1);
                assert!((now.row - before.row).abs() <= 1);
            }
            assert_eq!(motion.current_coord(), target, "target {target:?}");
            assert_eq!(completed, Some(id));
            assert!(motion.movement_complete());
        }
    }

    #[test]
    fn test_waypoints_visited_in_order() {
        let a = Coord::new(5, 1);
        let b = Coord::new(5, 6);
        let c = Coord::new(1, 6);
        let (mut motion, id) = motion_with_path(Coord::new(1, 1), &[a, b, c], 1.5, None);
        let mut visited = Vec::new();
        for _ in 0..50 {
            let done = motion.step();
            let coord = motion.current_coord();
            if [a, b, c].contains(&coord) && visited.last() != Some(&coord) {
                visited.push(coord);
            }
            if done.is_some() {
                assert_eq!(done, Some(id.clone()));
                break;
            }
        }
        assert_eq!(visited, vec![a, b, c]);
        assert_eq!(motion.target_coord(), c);
    }

    #[test]
    fn test_one_waypoint_pop_per_tick() {
        let start = Coord::new(1, 1);
        let (mut motion, _) = motion_with_path(start, &[start, start, start], 1.0, None);
        assert_eq!(motion.step(), None);
        assert_eq!(motion.step(), Some(PathId::new("p")));
        assert_eq!(motion.step(), None);
    }

    #[test]
    fn test_looping_path_never_completes() {
        let (mut motion, _) =
            motion_with_path(Coord::new(1, 1), &[Coord::new(3, 1), Coord::new(1, 1)], 1.0, None);
        let completions = (0..40).filter(|_| motion.step().is_some()).count();
        assert_eq!(completions, 1);
        assert!(motion.active_path().is_none());

        let (mut motion, id) =
            motion_with_path(Coord::new(1, 1), &[Coord::new(3, 1), Coord::new(1, 1)], 1.0, None);
        motion.path_mut(&id).unwrap().set_looping(true);
        for _ in 0..40 {
            assert_eq!(motion.step(), None);
        }
        assert!(motion.active_path().is_some());
    }

    #[test]
    fn test_eased_segment_reaches_target() {
        let target = Coord::new(21, 1);
        let (mut motion, id) = motion_with_path(Coord::new(1, 1), &[target], 2.0, Some(Easing::InQuad));
        let mut completed = None;
        let mut ticks = 0;
        while completed.is_none() && ticks < 100 {
            completed = motion.step();
            ticks += 1;
        }
        assert_eq!(completed, Some(id));
        assert_eq!(ticks, 10);
        assert_eq!(motion.current_coord(), target);
    }

    #[test]
    fn test_slow_speed_takes_longer() {
        let target = Coord::new(5, 1);
        let (mut motion, _) = motion_with_path(Coord::new(1, 1), &[target], 0.5, None);
        let ticks = (1..=20).find(|_| motion.step().is_some());
        assert_eq!(ticks, Some(8));
    }

    #[test]
    fn test_previous_coord_tracks_last_step() {
        let (mut motion, _) = motion_with_path(Coord::new(1, 1), &[Coord::new(4, 1)], 1.0, None);
        motion.step();
        assert_eq!(motion.previous_coord(), Coord::new(1, 1));
        assert_eq!(motion.current_coord(), Coord::new(2, 1));
        motion.step();
        assert_eq!(motion.previous_coord(), Coord::new(2, 1));
    }

    #[test]
    fn test_configuration_errors() {
        let mut motion = Motion::new(Coord::new(1, 1));
        assert!(matches!(
            motion.new_path(None, 0.0, None),
            Err(EngineError::InvalidSpeed { .. })
        ));
        let id = motion.new_path(Some("empty"), 1.0, None).unwrap().id().clone();
        assert_eq!(
            motion.activate_path(&id),
            Err(EngineError::EmptyPath { id: "empty".into() })
        );
        assert_eq!(
            motion.query_path("nope"),
            Err(EngineError::UnknownPath { id: "nope".into() })
        );
    }
}
