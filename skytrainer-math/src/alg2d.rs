//! Simple 2D coordinate geometry and linear algebra algorithms.

use bevy_math::{Dir2, Mat2, Vec2};

use crate::{Heading, Length, Position};


/// Solve `(t1, t2)` for `s1 + d1 * t1 == s2 + d2 * t2`.
#[must_use]
pub fn line_intersect(s1: Vec2, d1: Vec2, s2: Vec2, d2: Vec2) -> (f32, f32) {
    let mat = Mat2::from_cols(d1, -d2);
    let t = mat.inverse() * (s2 - s1);
    (t.x, t.y)
}

/// Returns the closest point from `point` on the extended line intersecting `line_start` and `line_end`.
#[must_use]
pub fn point_line_closest(
    point: Position<Vec2>,
    line_start: Position<Vec2>,
    line_end: Position<Vec2>,
) -> Position<Vec2> {
    let line_dir = line_end - line_start;
    let ortho_dir = line_dir.rotate_right_angle_clockwise();

    let (line_t, _ortho_t) = line_intersect(line_start.get(), line_dir.0, point.get(), ortho_dir.0);
    line_start + line_dir * line_t
}

/// Position of a point relative to a straight track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackOffset {
    /// Distance along the track from its origin to abeam the point.
    /// Negative if the point is behind the origin.
    pub along: Length<f32>,
    /// Lateral distance from the track, positive to the right.
    pub cross: Length<f32>,
}

/// Decomposes the displacement of `point` from `origin` along and across `track`.
#[must_use]
pub fn track_offset(origin: Position<Vec2>, track: Heading, point: Position<Vec2>) -> TrackOffset {
    let dir: Dir2 = track.into_dir2();
    let right = Dir2::from_xy_unchecked(dir.y, -dir.x);
    let delta = point - origin;
    TrackOffset { along: delta.project_onto_dir(dir), cross: delta.project_onto_dir(right) }
}
