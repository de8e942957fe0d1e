//! Small geometric helpers shared by the primitives.

use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{Error, Result, ShapeKind};

/// Distances below this are treated as "the query sits on the reference point",
/// at which point directions are no longer defined.
pub const SMALLEST_DISTANCE: f64 = 1.0e-12;

/// Tolerance on the norm of axis vectors passed to shape constructors.
pub const AXIS_TOLERANCE: f64 = 1.0e-9;

pub(crate) fn check_finite_point(kind: ShapeKind, name: &str, point: &Point3<f64>) -> Result<()> {
    if point.coords.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::invalid(kind, format!("{name} must be finite, got {point}")))
    }
}

pub(crate) fn check_finite_pose(kind: ShapeKind, pose: &Isometry3<f64>) -> Result<()> {
    let finite = pose.translation.vector.iter().all(|v| v.is_finite())
        && pose.rotation.coords.iter().all(|v| v.is_finite());

    if finite {
        Ok(())
    } else {
        Err(Error::invalid(kind, "pose must be finite"))
    }
}

pub(crate) fn check_non_negative(kind: ShapeKind, name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(
            kind,
            format!("{name} must be finite and non-negative, got {value}"),
        ))
    }
}

pub(crate) fn check_positive(kind: ShapeKind, name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(
            kind,
            format!("{name} must be finite and strictly positive, got {value}"),
        ))
    }
}

/// Validates that `axis` is unit length within [`AXIS_TOLERANCE`] and renormalizes it.
pub(crate) fn check_unit_axis(kind: ShapeKind, axis: &Vector3<f64>) -> Result<Unit<Vector3<f64>>> {
    let norm = axis.norm();
    if !norm.is_finite() || (norm - 1.0).abs() > AXIS_TOLERANCE {
        return Err(Error::invalid(
            kind,
            format!("axis must be unit length, got norm {norm}"),
        ));
    }

    Ok(Unit::new_normalize(*axis))
}

/// Returns the point on segment `[start, end]` closest to `query`, and its
/// parameter in `[0, 1]` along the segment.
pub fn closest_point_on_segment(
    start: &Point3<f64>,
    end: &Point3<f64>,
    query: &Point3<f64>,
) -> (Point3<f64>, f64) {
    let direction = end - start;
    let length_squared = direction.norm_squared();

    if length_squared < SMALLEST_DISTANCE * SMALLEST_DISTANCE {
        return (*start, 0.0);
    }

    let t = ((query - start).dot(&direction) / length_squared).clamp(0.0, 1.0);
    (start + direction * t, t)
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`.
///
/// When the segments are parallel the closest pair is not unique, the pair
/// closest to `p1` is returned.
pub fn closest_points_between_segments(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> (Point3<f64>, Point3<f64>) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);
    let epsilon = SMALLEST_DISTANCE * SMALLEST_DISTANCE;

    if a <= epsilon && e <= epsilon {
        return (*p1, *p2);
    }

    let (s, t) = if a <= epsilon {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= epsilon {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denominator = a * e - b * b;

            let mut s = if denominator > epsilon {
                ((b * f - c * e) / denominator).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }

            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// A unit vector orthogonal to `v`, chosen deterministically.
///
/// The world axis least aligned with `v` is crossed with it, ties go to the
/// lowest axis index.
#[must_use]
pub fn any_orthogonal(v: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let abs = v.abs();
    let helper = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };

    Unit::try_new(v.cross(&helper), SMALLEST_DISTANCE).unwrap_or_else(Vector3::x_axis)
}

/// Index of the smallest value, ties resolve to the lowest index.
pub(crate) fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate().skip(1) {
        if *value < values[best] {
            best = i;
        }
    }
    best
}

/// `1.0` for non-negative values, `-1.0` otherwise.
///
/// Unlike [`f64::signum`] a zero always maps to `1.0`, keeping tie-breaks deterministic.
pub(crate) fn sign(value: f64) -> f64 {
    if value < 0.0 { -1.0 } else { 1.0 }
}

/// Builds a contact normal pointing from `closest` to `query`, or `fallback` when both coincide.
pub(crate) fn normal_or(
    query: &Point3<f64>,
    closest: &Point3<f64>,
    fallback: Unit<Vector3<f64>>,
) -> (Unit<Vector3<f64>>, f64) {
    let offset = query - closest;
    let distance = offset.norm();

    if distance > SMALLEST_DISTANCE {
        (Unit::new_unchecked(offset / distance), distance)
    } else {
        (fallback, distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_projection_clamps_to_endpoints() {
        let start = Point3::new(0.0, 0.0, 0.0);
        let end = Point3::new(2.0, 0.0, 0.0);

        let (closest, t) = closest_point_on_segment(&start, &end, &Point3::new(1.0, 3.0, 0.0));
        assert_eq!(closest, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(t, 0.5);

        let (closest, t) = closest_point_on_segment(&start, &end, &Point3::new(-4.0, 1.0, 0.0));
        assert_eq!(closest, start);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn crossing_segments_meet() {
        let (a, b) = closest_points_between_segments(
            &Point3::new(-1.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, -1.0, 1.0),
            &Point3::new(0.0, 1.0, 1.0),
        );

        assert!((a - Point3::origin()).norm() < 1e-12);
        assert!((b - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn parallel_segments_report_the_gap() {
        let (a, b) = closest_points_between_segments(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 2.0, 0.0),
            &Point3::new(1.0, 2.0, 0.0),
        );

        assert!(((b - a).norm() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_is_orthogonal() {
        for v in [Vector3::x(), Vector3::new(1.0, 1.0, 1.0), Vector3::new(0.0, 0.0, -3.0)] {
            let o = any_orthogonal(&v);
            assert!(o.dot(&v).abs() < 1e-12);
            assert!((o.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn argmin_prefers_lowest_index() {
        assert_eq!(argmin(&[1.0, 1.0, 1.0]), 0);
        assert_eq!(argmin(&[2.0, 1.0, 1.0]), 1);
        assert_eq!(argmin(&[2.0, 3.0, 1.0]), 2);
    }
}
