//! Planar angle helpers shared by the estimators.
//!
//! Image coordinates: x grows to the right, y grows downward, so a vector
//! pointing "down" the body has positive dy.

use nalgebra::{Point2, Vector2};

/// Interior angle at `b` formed by `a-b-c`, in degrees within [0, 180].
///
/// Uses the difference of the two `atan2` headings and reflects anything
/// above 180° so the smaller angle is always reported.
pub fn interior_angle(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    let to_c = c - b;
    let to_a = a - b;
    let radians = to_c.y.atan2(to_c.x) - to_a.y.atan2(to_a.x);
    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

/// Unsigned angle of the line `from -> to` measured from horizontal.
pub fn angle_from_horizontal(from: Point2<f64>, to: Point2<f64>) -> f64 {
    let d = to - from;
    d.y.atan2(d.x).to_degrees().abs()
}

/// Signed heading of `v` from the downward vertical, `atan2(dx, dy)` in degrees.
pub fn heading_from_vertical(v: Vector2<f64>) -> f64 {
    v.x.atan2(v.y).to_degrees()
}

/// Angle of `v` from the downward vertical ignoring its horizontal sign,
/// `atan2(|dx|, dy)` in degrees within [0, 180].
pub fn tilt_from_vertical(v: Vector2<f64>) -> f64 {
    v.x.abs().atan2(v.y).to_degrees()
}

/// Ratio of two lengths, `None` when the denominator is degenerate.
pub fn length_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.abs() < f64::EPSILON || !denominator.is_finite() {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// -1, 0 or +1 with values inside `deadband` collapsing to 0.
pub fn sign_with_deadband(value: f64, deadband: f64) -> i8 {
    if value.abs() <= deadband {
        0
    } else if value > 0.0 {
        1
    } else {
        -1
    }
}
