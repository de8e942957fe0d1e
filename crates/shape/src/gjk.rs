//! Intersection of two convex shapes given only their support mappings.
//!
//! GJK looks for a simplex of the Minkowski difference `a - b` that encloses the origin, which
//! exists exactly when the shapes overlap. EPA then grows that simplex into a polytope until its
//! face closest to the origin lies on the boundary of the difference, which gives the smallest
//! translation separating the shapes.

use nalgebra::{Point3, Unit, Vector3};

use crate::{Penetration, SupportMap, tools};

/// Support values within this distance of the origin count as touching.
const TOLERANCE: f64 = 1.0e-9;

const GJK_MAX_ITERATIONS: usize = 64;

/// EPA stops once a new support point improves the closest face by less than this.
const EPA_TOLERANCE: f64 = 1.0e-8;

const EPA_MAX_ITERATIONS: usize = 128;

const EPA_MAX_FACES: usize = 512;

/// The point of `a - b` farthest along `direction`.
fn support(a: &dyn SupportMap, b: &dyn SupportMap, direction: &Vector3<f64>) -> Point3<f64> {
    Point3::from(a.support(direction) - b.support(&-direction))
}

/// `(a × b) × c`, which for `(ab, ao, ab)` is orthogonal to `ab` and points towards `ao`.
fn triple_product(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> Vector3<f64> {
    b * a.dot(c) - a * b.dot(c)
}

/// Penetration of `b` into `a`, `None` when they are apart.
pub(crate) fn penetration(a: &dyn SupportMap, b: &dyn SupportMap) -> Option<Penetration> {
    let simplex = enclosing_simplex(a, b)?;

    // A difference without interior has no face to expand, the shapes only touch.
    Some(expand(a, b, simplex).unwrap_or(Penetration {
        depth: 0.0,
        normal: Vector3::x_axis(),
    }))
}

/// Runs GJK, returning the final simplex when the difference contains the origin.
///
/// The newest point is always kept first.
fn enclosing_simplex(a: &dyn SupportMap, b: &dyn SupportMap) -> Option<Vec<Point3<f64>>> {
    let first = support(a, b, &Vector3::x());
    let mut simplex = vec![first];
    let mut direction = -first.coords;

    for _ in 0..GJK_MAX_ITERATIONS {
        let Some(unit) = direction.try_normalize(TOLERANCE) else {
            // The origin lies on the current simplex.
            return Some(simplex);
        };

        let point = support(a, b, &unit);
        if point.coords.dot(&unit) < -TOLERANCE {
            return None;
        }

        simplex.insert(0, point);
        if reduce(&mut simplex, &mut direction) {
            return Some(simplex);
        }
    }

    None
}

/// Reduces `simplex` to the feature closest to the origin and points `direction` at the origin.
///
/// Returns `true` once a tetrahedron encloses the origin.
fn reduce(simplex: &mut Vec<Point3<f64>>, direction: &mut Vector3<f64>) -> bool {
    match simplex.len() {
        2 => {
            let (a, b) = (simplex[0], simplex[1]);
            edge_or_vertex(simplex, direction, a, b);
            false
        }
        3 => {
            triangle(simplex, direction);
            false
        }
        _ => tetrahedron(simplex, direction),
    }
}

fn edge_or_vertex(
    simplex: &mut Vec<Point3<f64>>,
    direction: &mut Vector3<f64>,
    a: Point3<f64>,
    b: Point3<f64>,
) {
    let ab = b - a;
    let ao = -a.coords;

    if ab.dot(&ao) > 0.0 {
        *simplex = vec![a, b];
        *direction = triple_product(&ab, &ao, &ab);
    } else {
        *simplex = vec![a];
        *direction = ao;
    }
}

fn triangle(simplex: &mut Vec<Point3<f64>>, direction: &mut Vector3<f64>) {
    let (a, b, c) = (simplex[0], simplex[1], simplex[2]);
    let ab = b - a;
    let ac = c - a;
    let ao = -a.coords;
    let abc = ab.cross(&ac);

    if abc.cross(&ac).dot(&ao) > 0.0 {
        if ac.dot(&ao) > 0.0 {
            *simplex = vec![a, c];
            *direction = triple_product(&ac, &ao, &ac);
        } else {
            edge_or_vertex(simplex, direction, a, b);
        }
    } else if ab.cross(&abc).dot(&ao) > 0.0 {
        edge_or_vertex(simplex, direction, a, b);
    } else if abc.dot(&ao) > 0.0 {
        *direction = abc;
    } else {
        // Keep the winding so that `abc` faces the origin.
        *simplex = vec![a, c, b];
        *direction = -abc;
    }
}

fn tetrahedron(simplex: &mut Vec<Point3<f64>>, direction: &mut Vector3<f64>) -> bool {
    let (a, b, c, d) = (simplex[0], simplex[1], simplex[2], simplex[3]);
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a.coords;

    for (face, [p, q, r]) in [
        (ab.cross(&ac), [a, b, c]),
        (ac.cross(&ad), [a, c, d]),
        (ad.cross(&ab), [a, d, b]),
    ] {
        if face.dot(&ao) > 0.0 {
            *simplex = vec![p, q, r];
            triangle(simplex, direction);
            return false;
        }
    }

    true
}

/// A triangle of the EPA polytope, wound so that `normal` points away from the origin.
#[derive(Debug, Clone, Copy)]
struct Face {
    vertices: [usize; 3],
    normal: Unit<Vector3<f64>>,
    distance: f64,
}

impl Face {
    fn new(points: &[Point3<f64>], vertices: [usize; 3]) -> Option<Self> {
        let [a, b, c] = vertices.map(|index| points[index]);
        let normal = Unit::try_new((b - a).cross(&(c - a)), TOLERANCE)?;

        Some(Self {
            vertices,
            normal,
            distance: normal.dot(&a.coords),
        })
    }

    /// Flips the face if its normal points towards `inside`.
    fn facing_away_from(mut self, points: &[Point3<f64>], inside: &Point3<f64>) -> Self {
        if self.normal.dot(&(inside - points[self.vertices[0]])) > 0.0 {
            self.vertices.swap(1, 2);
            self.normal = -self.normal;
            self.distance = -self.distance;
        }
        self
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }
}

/// Whether `point` raises the dimension of the simplex spanned by `points`.
fn is_independent(points: &[Point3<f64>], point: &Point3<f64>) -> bool {
    match points {
        [a] => (point - a).norm() > TOLERANCE,
        [a, b] => (b - a).cross(&(point - a)).norm() > TOLERANCE,
        [a, b, c] => (b - a).cross(&(c - a)).dot(&(point - a)).abs() > TOLERANCE,
        _ => true,
    }
}

/// Adds `edge` to the horizon, or removes it when the face on its other side was removed too.
fn toggle_edge(horizon: &mut Vec<(usize, usize)>, (from, to): (usize, usize)) {
    if let Some(index) = horizon.iter().position(|&edge| edge == (to, from)) {
        horizon.swap_remove(index);
    } else {
        horizon.push((from, to));
    }
}

fn closest_face(faces: &[Face]) -> Option<Face> {
    faces
        .iter()
        .copied()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn from_face(face: Face) -> Penetration {
    Penetration {
        depth: face.distance.max(0.0),
        normal: face.normal,
    }
}

/// Runs EPA from a simplex enclosing the origin.
///
/// Lower dimensional simplices are first completed to a tetrahedron with supports along the
/// coordinate axes.
fn expand(
    a: &dyn SupportMap,
    b: &dyn SupportMap,
    simplex: Vec<Point3<f64>>,
) -> Option<Penetration> {
    let axes = [
        Vector3::x(),
        Vector3::y(),
        Vector3::z(),
        -Vector3::x(),
        -Vector3::y(),
        -Vector3::z(),
    ];

    let mut points: Vec<Point3<f64>> = Vec::with_capacity(EPA_MAX_ITERATIONS + 4);
    let candidates = simplex
        .into_iter()
        .chain(axes.iter().map(|axis| support(a, b, axis)));
    for candidate in candidates {
        if points.len() == 4 {
            break;
        }
        if is_independent(&points, &candidate) {
            points.push(candidate);
        }
    }
    if points.len() < 4 {
        return None;
    }

    let centroid: Vector3<f64> = points.iter().map(|point| point.coords).sum();
    let centroid = Point3::from(centroid / 4.0);
    let mut faces: Vec<Face> = [[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]]
        .into_iter()
        .filter_map(|vertices| Face::new(&points, vertices))
        .map(|face| face.facing_away_from(&points, &centroid))
        .collect();

    for _ in 0..EPA_MAX_ITERATIONS {
        let closest = closest_face(&faces)?;
        let point = support(a, b, &closest.normal.into_inner());
        if point.coords.dot(&closest.normal) - closest.distance < EPA_TOLERANCE {
            return Some(from_face(closest));
        }

        let index = points.len();
        points.push(point);

        let before = faces.len();
        let mut horizon = Vec::new();
        faces.retain(|face| {
            let height = face.normal.dot(&(point - points[face.vertices[0]]));
            let visible = height > tools::SMALLEST_DISTANCE;
            if visible {
                for edge in face.edges() {
                    toggle_edge(&mut horizon, edge);
                }
            }
            !visible
        });

        // The visible faces must form a disk bounded by a single loop of edges. Rounding can break
        // that, the closest face so far then remains a lower bound of the depth.
        let removed = before - faces.len();
        let new_faces: Option<Vec<Face>> = horizon
            .iter()
            .map(|&(from, to)| Face::new(&points, [index, from, to]))
            .collect();
        match new_faces {
            Some(new_faces) if horizon.len() == removed + 2 => faces.extend(new_faces),
            _ => return Some(from_face(closest)),
        }

        if faces.len() > EPA_MAX_FACES {
            break;
        }
    }

    closest_face(&faces).map(from_face)
}

#[cfg(test)]
mod tests {
    use nalgebra::Isometry3;

    use super::*;
    use crate::{Cuboid, Sphere};

    #[test]
    fn overlapping_spheres_match_closed_form() {
        let a = Sphere::new(Point3::origin(), 1.0).unwrap();
        let b = Sphere::new(Point3::new(0.0, 1.5, 0.0), 1.0).unwrap();

        let penetration = penetration(&a, &b).unwrap();
        assert!((penetration.depth - 0.5).abs() < 1e-3);
        assert!((penetration.normal.into_inner() - Vector3::y()).norm() < 1e-2);
    }

    #[test]
    fn separated_shapes_have_no_simplex() {
        let a = Cuboid::centered(Vector3::repeat(1.0)).unwrap();
        let b = Cuboid::new(Isometry3::translation(0.0, 0.0, 2.5), Vector3::repeat(1.0)).unwrap();

        assert!(enclosing_simplex(&a, &b).is_none());
        assert!(enclosing_simplex(&a, &a).is_some());
    }

    #[test]
    fn face_contact_is_exact() {
        let a = Cuboid::centered(Vector3::repeat(1.0)).unwrap();
        let b = Cuboid::new(Isometry3::translation(0.3, 0.2, 1.75), Vector3::repeat(1.0)).unwrap();

        let penetration = penetration(&a, &b).unwrap();
        assert!((penetration.depth - 0.25).abs() < 1e-9);
        assert!((penetration.normal.into_inner() - Vector3::z()).norm() < 1e-9);
    }

    #[test]
    fn horizon_edges_cancel_in_pairs() {
        let mut horizon = vec![(0, 1), (1, 2)];
        toggle_edge(&mut horizon, (2, 1));
        toggle_edge(&mut horizon, (2, 3));

        assert_eq!(horizon, vec![(0, 1), (2, 3)]);
    }
}
