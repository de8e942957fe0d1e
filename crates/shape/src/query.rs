//! Intersection queries between pairs of shapes.
//!
//! Pairs are dispatched through an explicit table keyed by the ordered pair of [`ShapeKind`]s,
//! see [`pair_query`]. Closed form queries come first, the remaining convex pairs use GJK and EPA.
//! Pairs missing from the table fail with [`Error::UnsupportedShapePair`].

use nalgebra::{Point3, Unit, Vector3};
use strum::IntoEnumIterator;

use crate::{Capsule, Error, PointQuery, Result, Shape, ShapeKind, Sphere, gjk, tools};

/// Overlap between two intersecting shapes.
///
/// Moving the second shape by `depth` along `normal` brings the two shapes in touching contact.
/// Touching shapes intersect with a depth of zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    pub depth: f64,
    /// Unit direction pointing from the first shape towards the second.
    pub normal: Unit<Vector3<f64>>,
}

impl Penetration {
    /// The same overlap, seen from the second shape.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            depth: self.depth,
            normal: -self.normal,
        }
    }
}

/// The algorithm used for an ordered pair of shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairQuery {
    /// The sphere center is tested against the other shape.
    SphereFirst,
    SphereSecond,
    /// Closest points between the two inner segments.
    CapsuleCapsule,
    /// Separating axis test over face normals and edge cross products.
    SeparatingAxis,
    /// GJK on the support mappings of both shapes, with EPA for the depth.
    ///
    /// Exact for contacts between flat regions, within `1e-4` where both surfaces are curved.
    Gjk,
}

/// Looks up the pair dispatch table.
#[must_use]
pub fn pair_query(first: ShapeKind, second: ShapeKind) -> Option<PairQuery> {
    use ShapeKind::{Capsule, ConvexPolytope, Cuboid, Cylinder, Ellipsoid, Ramp, Sphere};

    match (first, second) {
        (Sphere, _) => Some(PairQuery::SphereFirst),
        (_, Sphere) => Some(PairQuery::SphereSecond),
        (Capsule, Capsule) => Some(PairQuery::CapsuleCapsule),
        (Cuboid | Ramp | ConvexPolytope, Cuboid | Ramp | ConvexPolytope) => {
            Some(PairQuery::SeparatingAxis)
        }
        (
            Cuboid | Capsule | Cylinder | Ramp | Ellipsoid | ConvexPolytope,
            Cuboid | Capsule | Cylinder | Ramp | Ellipsoid | ConvexPolytope,
        ) => Some(PairQuery::Gjk),
        _ => None,
    }
}

/// Every ordered pair of kinds that [`intersects`] and [`penetration`] can test.
#[must_use]
pub fn supported_pairs() -> Vec<(ShapeKind, ShapeKind)> {
    ShapeKind::iter()
        .flat_map(|first| ShapeKind::iter().map(move |second| (first, second)))
        .filter(|(first, second)| pair_query(*first, *second).is_some())
        .collect()
}

/// Whether the two shapes overlap or touch.
///
/// # Errors
///
/// Fails with [`Error::UnsupportedShapePair`] when no query exists for this pair of kinds.
pub fn intersects(first: &Shape, second: &Shape) -> Result<bool> {
    penetration(first, second).map(|penetration| penetration.is_some())
}

/// Depth and direction of the overlap between two shapes, `None` when they are apart.
///
/// # Errors
///
/// Fails with [`Error::UnsupportedShapePair`] when no query exists for this pair of kinds.
pub fn penetration(first: &Shape, second: &Shape) -> Result<Option<Penetration>> {
    let unsupported = || Error::UnsupportedShapePair {
        first: first.kind(),
        second: second.kind(),
    };
    let query = pair_query(first.kind(), second.kind()).ok_or_else(unsupported)?;

    match (query, first, second) {
        (PairQuery::SphereFirst, Shape::Sphere(sphere), other) => Ok(sphere_against(sphere, other)),
        (PairQuery::SphereSecond, other, Shape::Sphere(sphere)) => {
            Ok(sphere_against(sphere, other).map(Penetration::reversed))
        }
        (PairQuery::CapsuleCapsule, Shape::Capsule(a), Shape::Capsule(b)) => {
            Ok(capsule_against_capsule(a, b))
        }
        (PairQuery::SeparatingAxis, _, _) => match (first.polyhedron(), second.polyhedron()) {
            (Some(a), Some(b)) => Ok(separating_axis(&a, &b)),
            _ => Err(unsupported()),
        },
        (PairQuery::Gjk, _, _) => match (first.support_map(), second.support_map()) {
            (Some(a), Some(b)) => Ok(gjk::penetration(a, b)),
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}

/// Penetration from the sphere into `other`, found from the contact of `other` with the center.
fn sphere_against(sphere: &Sphere, other: &impl PointQuery) -> Option<Penetration> {
    let contact = other.point_contact(&sphere.center());
    let depth = sphere.radius() - contact.signed_distance;

    (depth >= 0.0).then_some(Penetration {
        depth,
        normal: -contact.normal,
    })
}

fn capsule_against_capsule(a: &Capsule, b: &Capsule) -> Option<Penetration> {
    let (start_a, end_a) = a.endpoints();
    let (start_b, end_b) = b.endpoints();
    let (on_a, on_b) = tools::closest_points_between_segments(&start_a, &end_a, &start_b, &end_b);

    let offset = on_b - on_a;
    let distance = offset.norm();
    let depth = a.radius() + b.radius() - distance;
    if depth < 0.0 {
        return None;
    }

    // Crossing segments give no direction, fall back to the common normal of both axes.
    let normal = Unit::try_new(offset, tools::SMALLEST_DISTANCE)
        .or_else(|| Unit::try_new(a.axis().cross(&b.axis()), tools::SMALLEST_DISTANCE))
        .unwrap_or_else(|| tools::any_orthogonal(&a.axis()));

    Some(Penetration { depth, normal })
}

/// A convex shape bounded by flat faces, in the form needed by the separating axis test.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polyhedron {
    pub vertices: Vec<Point3<f64>>,
    pub face_normals: Vec<Unit<Vector3<f64>>>,
    pub edge_directions: Vec<Unit<Vector3<f64>>>,
}

impl Polyhedron {
    fn project(&self, axis: &Unit<Vector3<f64>>) -> (f64, f64) {
        self.vertices
            .iter()
            .map(|vertex| axis.dot(&vertex.coords))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
                (min.min(value), max.max(value))
            })
    }
}

/// Separating axis test between two convex polyhedra.
///
/// The candidate axes are the face normals of `a`, then those of `b`, then the cross products
/// of their edge directions. The axis with the smallest overlap gives the penetration, ties go
/// to the first candidate.
fn separating_axis(a: &Polyhedron, b: &Polyhedron) -> Option<Penetration> {
    let edge_axes = a.edge_directions.iter().flat_map(|edge_a| {
        b.edge_directions
            .iter()
            .filter_map(move |edge_b| Unit::try_new(edge_a.cross(edge_b), tools::AXIS_TOLERANCE))
    });
    let axes = a
        .face_normals
        .iter()
        .chain(&b.face_normals)
        .copied()
        .chain(edge_axes);

    let mut best: Option<Penetration> = None;
    for axis in axes {
        let (min_a, max_a) = a.project(&axis);
        let (min_b, max_b) = b.project(&axis);

        let forward = max_a - min_b;
        let backward = max_b - min_a;
        let overlap = forward.min(backward);
        if overlap < 0.0 {
            return None;
        }

        if best.is_none_or(|best| overlap < best.depth) {
            best = Some(Penetration {
                depth: overlap,
                normal: if forward <= backward { axis } else { -axis },
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_4;

    use nalgebra::{Isometry3, Point3, Vector3};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{ConvexPolytope, Cuboid, Cylinder, Ellipsoid, Ramp, Torus};

    fn unit_box_at(x: f64) -> Shape {
        Cuboid::new(Isometry3::translation(x, 0.0, 0.0), Vector3::repeat(1.0))
            .unwrap()
            .into()
    }

    fn sphere(x: f64, y: f64, z: f64, radius: f64) -> Shape {
        Sphere::new(Point3::new(x, y, z), radius).unwrap().into()
    }

    #[test]
    fn boxes_apart_and_overlapping() {
        let origin = unit_box_at(0.0);

        assert!(!intersects(&origin, &unit_box_at(3.0)).unwrap());
        assert!(intersects(&origin, &unit_box_at(1.5)).unwrap());

        let penetration = penetration(&origin, &unit_box_at(1.5)).unwrap().unwrap();
        assert!((penetration.depth - 0.5).abs() < 1e-12);
        assert_eq!(penetration.normal, Vector3::x_axis());
    }

    #[test]
    fn touching_boxes_intersect() {
        let penetration = penetration(&unit_box_at(0.0), &unit_box_at(2.0)).unwrap().unwrap();
        assert!(penetration.depth.abs() < 1e-12);
    }

    #[test]
    fn rotated_boxes() {
        let a = Cuboid::new(
            Isometry3::new(Vector3::zeros(), Vector3::z() * FRAC_PI_4),
            Vector3::repeat(1.0),
        )
        .unwrap();
        let b = |x: f64| -> Shape {
            Cuboid::new(
                Isometry3::new(Vector3::new(x, 0.0, 0.0), Vector3::x() * FRAC_PI_4),
                Vector3::repeat(1.0),
            )
            .unwrap()
            .into()
        };
        let contact = 2.0_f64.sqrt() + 1.0;

        assert!(!intersects(&a.into(), &b(contact + 0.01)).unwrap());

        let penetration = penetration(&a.into(), &b(contact - 0.01)).unwrap().unwrap();
        assert!((penetration.depth - 0.01).abs() < 1e-9);
        assert!((penetration.normal.into_inner() - Vector3::x()).norm() < 1e-9);
    }

    #[test]
    fn sphere_pairs() {
        let a = sphere(0.0, 0.0, 0.0, 1.0);
        let b = sphere(1.5, 0.0, 0.0, 1.0);

        let penetration = penetration(&a, &b).unwrap().unwrap();
        assert!((penetration.depth - 0.5).abs() < 1e-12);
        assert!((penetration.normal.into_inner() - Vector3::x()).norm() < 1e-12);

        let reversed = super::penetration(&b, &a).unwrap().unwrap();
        assert!((reversed.normal.into_inner() + Vector3::x()).norm() < 1e-12);

        assert!(!intersects(&a, &sphere(2.5, 0.0, 0.0, 1.0)).unwrap());
    }

    #[test]
    fn sphere_against_every_kind() {
        let ball = sphere(0.0, 0.0, 2.0, 1.0);
        let torus: Shape = Torus::new(Isometry3::identity(), 2.0, 0.5).unwrap().into();
        let cylinder: Shape = Cylinder::new(Point3::origin(), Vector3::z(), 1.0, 1.0).unwrap().into();

        assert!(!intersects(&ball, &torus).unwrap());
        assert!(intersects(&cylinder, &ball).unwrap());

        let penetration = penetration(&cylinder, &ball).unwrap().unwrap();
        assert!(penetration.depth.abs() < 1e-12);
        assert!((penetration.normal.into_inner() - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn crossing_capsules() {
        let a: Shape = Capsule::new(Point3::origin(), Vector3::x(), 2.0, 0.5).unwrap().into();
        let b: Shape = Capsule::new(Point3::new(0.0, 0.0, 0.8), Vector3::y(), 2.0, 0.5)
            .unwrap()
            .into();

        let penetration = penetration(&a, &b).unwrap().unwrap();
        assert!((penetration.depth - 0.2).abs() < 1e-12);
        assert!((penetration.normal.into_inner() - Vector3::z()).norm() < 1e-12);

        let far: Shape = Capsule::new(Point3::new(0.0, 0.0, 1.2), Vector3::y(), 2.0, 0.5)
            .unwrap()
            .into();
        assert!(!intersects(&a, &far).unwrap());
    }

    #[test]
    fn intersecting_capsule_axes_use_common_normal() {
        let a = Capsule::new(Point3::origin(), Vector3::x(), 1.0, 0.5).unwrap();
        let b = Capsule::new(Point3::origin(), Vector3::y(), 1.0, 0.5).unwrap();

        let penetration = capsule_against_capsule(&a, &b).unwrap();
        assert!((penetration.depth - 1.0).abs() < 1e-12);
        assert_eq!(penetration.normal, Vector3::z_axis());
    }

    #[test]
    fn ramp_and_polytope_use_separating_axes() {
        let ramp: Shape = Ramp::new(Isometry3::identity(), Vector3::new(2.0, 1.0, 2.0))
            .unwrap()
            .into();
        let above_slope = unit_box_at(0.0).transformed(&Isometry3::translation(0.0, 0.0, 2.5));
        assert!(!intersects(&ramp, &above_slope).unwrap());

        let tetrahedron: Shape = ConvexPolytope::from_points(&[
            Point3::new(1.5, 0.0, 0.5),
            Point3::new(2.5, 0.0, 0.5),
            Point3::new(2.0, 0.5, 0.5),
            Point3::new(2.0, 0.0, 1.5),
        ])
        .unwrap()
        .into();
        assert!(intersects(&ramp, &tetrahedron).unwrap());
    }

    #[test]
    fn unsupported_pairs_fail() {
        let torus: Shape = Torus::new(Isometry3::identity(), 2.0, 0.5).unwrap().into();

        let error = intersects(&torus, &unit_box_at(0.0)).unwrap_err();
        assert_eq!(
            error,
            Error::UnsupportedShapePair {
                first: ShapeKind::Torus,
                second: ShapeKind::Cuboid,
            }
        );
        assert!(penetration(&unit_box_at(0.0), &torus).is_err());
    }

    fn capsule_along_x(z: f64) -> Shape {
        Capsule::new(Point3::new(0.0, 0.0, z), Vector3::x(), 1.0, 0.5)
            .unwrap()
            .into()
    }

    fn cylinder(center: Point3<f64>, axis: Vector3<f64>, half_length: f64, radius: f64) -> Shape {
        Cylinder::new(center, axis, half_length, radius).unwrap().into()
    }

    /// Checks that both argument orders agree, and returns the penetration of `b` into `a`.
    fn symmetric_penetration(a: &Shape, b: &Shape) -> Option<Penetration> {
        let forward = penetration(a, b).unwrap();
        let backward = penetration(b, a).unwrap();
        assert_eq!(forward.is_some(), backward.is_some());
        assert_eq!(intersects(a, b).unwrap(), intersects(b, a).unwrap());

        if let (Some(forward), Some(backward)) = (forward, backward) {
            assert!((forward.depth - backward.depth).abs() < 1e-9);
            assert!((forward.normal.into_inner() + backward.normal.into_inner()).norm() < 1e-6);
        }

        forward
    }

    #[test]
    fn capsule_resting_in_a_box() {
        let cube = unit_box_at(0.0);

        let penetration = symmetric_penetration(&cube, &capsule_along_x(1.3)).unwrap();
        assert!((penetration.depth - 0.2).abs() < 1e-9);
        assert!((penetration.normal.into_inner() - Vector3::z()).norm() < 1e-9);

        assert!(symmetric_penetration(&cube, &capsule_along_x(1.6)).is_none());
    }

    #[test]
    fn cylinder_pairs() {
        let upright = cylinder(Point3::origin(), Vector3::z(), 1.0, 1.0);

        let stacked = cylinder(Point3::new(0.0, 0.0, 1.5), Vector3::z(), 1.0, 1.0);
        let penetration = symmetric_penetration(&upright, &stacked).unwrap();
        assert!((penetration.depth - 0.5).abs() < 1e-9);
        assert!((penetration.normal.into_inner() - Vector3::z()).norm() < 1e-9);

        let lying = cylinder(Point3::new(0.0, 0.0, 1.4), Vector3::x(), 1.0, 0.5);
        let penetration = symmetric_penetration(&upright, &lying).unwrap();
        assert!((penetration.depth - 0.1).abs() < 1e-9);
        assert!((penetration.normal.into_inner() - Vector3::z()).norm() < 1e-6);

        let beside = cylinder(Point3::new(2.5, 0.0, 0.0), Vector3::z(), 1.0, 1.0);
        assert!(symmetric_penetration(&upright, &beside).is_none());
    }

    #[test]
    fn ellipsoid_against_box() {
        let ellipsoid = |x: f64| -> Shape {
            Ellipsoid::new(Isometry3::translation(x, 0.0, 0.0), Vector3::new(2.0, 1.0, 1.0))
                .unwrap()
                .into()
        };

        let penetration = symmetric_penetration(&unit_box_at(0.0), &ellipsoid(2.9)).unwrap();
        assert!((penetration.depth - 0.1).abs() < 1e-9);
        assert!((penetration.normal.into_inner() - Vector3::x()).norm() < 1e-9);

        assert!(symmetric_penetration(&unit_box_at(0.0), &ellipsoid(3.1)).is_none());
    }

    /// On boxes the support mapping path must reproduce the separating axis test.
    #[test]
    fn gjk_agrees_with_separating_axes_on_boxes() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut vector = |range: f64| {
            Vector3::new(
                rng.random_range(-range..range),
                rng.random_range(-range..range),
                rng.random_range(-range..range),
            )
        };

        let mut overlapping = 0;
        for _ in 0..500 {
            let a = Cuboid::new(
                Isometry3::new(vector(1.5), vector(2.0)),
                vector(0.5).abs() + Vector3::repeat(0.2),
            )
            .unwrap();
            let b = Cuboid::new(
                Isometry3::new(vector(1.5), vector(2.0)),
                vector(0.5).abs() + Vector3::repeat(0.2),
            )
            .unwrap();

            let expected = separating_axis(&a.polyhedron(), &b.polyhedron());
            let actual = gjk::penetration(&a, &b);

            match (expected, actual) {
                (Some(expected), Some(actual)) => {
                    assert!((expected.depth - actual.depth).abs() < 1e-6);
                    overlapping += 1;
                }
                (None, None) => {}
                (Some(touching), None) | (None, Some(touching)) => {
                    assert!(touching.depth < 1e-6);
                }
            }
        }

        assert!(overlapping > 0);
    }

    #[test]
    fn supported_pairs_follow_the_table() {
        let pairs = supported_pairs();

        assert!(pairs.contains(&(ShapeKind::Sphere, ShapeKind::Torus)));
        assert!(pairs.contains(&(ShapeKind::Ellipsoid, ShapeKind::Sphere)));
        assert!(pairs.contains(&(ShapeKind::Ramp, ShapeKind::ConvexPolytope)));
        assert!(pairs.contains(&(ShapeKind::Capsule, ShapeKind::Cuboid)));
        assert_eq!(
            pair_query(ShapeKind::Cylinder, ShapeKind::Ellipsoid),
            Some(PairQuery::Gjk)
        );
        assert!(!pairs.contains(&(ShapeKind::Torus, ShapeKind::Cuboid)));
        assert!(!pairs.contains(&(ShapeKind::Capsule, ShapeKind::Torus)));
        assert!(!pairs.contains(&(ShapeKind::Torus, ShapeKind::Torus)));
        assert!(
            pairs
                .iter()
                .all(|(first, second)| pair_query(*first, *second).is_some())
        );
    }
}
