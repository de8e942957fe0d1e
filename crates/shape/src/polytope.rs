//! Convex polytopes built as the convex hull of a point cloud.

use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{
    Aabb, Error, PointContact, PointQuery, Result, ShapeKind,
    query::Polyhedron,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// Relative tolerance used to decide whether points lie on a plane, scaled by the extent of the
/// point cloud.
const HULL_TOLERANCE: f64 = 1.0e-9;

/// A face of a [`ConvexPolytope`]: the half-space `normal · x <= offset`, and the indices of its
/// vertices in counter-clockwise order around the normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub normal: Unit<Vector3<f64>>,
    pub offset: f64,
    pub vertices: Vec<usize>,
}

impl Face {
    fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }
}

/// The convex hull of a set of points.
///
/// The hull is computed once, at construction, by testing every plane through three of the
/// input points. This is meant for the small hulls used to describe robot parts, not for
/// large point clouds.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolytope {
    vertices: Vec<Point3<f64>>,
    faces: Vec<Face>,
}

impl ConvexPolytope {
    /// Builds the convex hull of `points`.
    ///
    /// # Errors
    ///
    /// Fails when fewer than four points are given, when a point is not finite, or when all
    /// points lie in a single plane.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Self> {
        let kind = ShapeKind::ConvexPolytope;
        if points.len() < 4 {
            return Err(Error::invalid(
                kind,
                format!("at least 4 points are needed, got {}", points.len()),
            ));
        }
        for point in points {
            tools::check_finite_point(kind, "point", point)?;
        }

        let centroid = Point3::from(
            points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / points.len() as f64,
        );
        let scale = points
            .iter()
            .map(|p| (p - centroid).norm())
            .fold(0.0, f64::max)
            .max(tools::SMALLEST_DISTANCE);
        let tolerance = HULL_TOLERANCE * scale;

        let planes = hull_planes(points, tolerance);
        if planes.len() < 4 {
            return Err(Error::invalid(kind, "points must not all lie in a single plane"));
        }

        // Hull vertices are the points where at least three faces meet.
        let mut vertices: Vec<Point3<f64>> = Vec::new();
        for point in points {
            let touching = planes
                .iter()
                .filter(|(normal, offset)| (normal.dot(&point.coords) - offset).abs() <= tolerance)
                .count();
            let duplicate = vertices.iter().any(|v| (v - point).norm() <= tolerance);

            if touching >= 3 && !duplicate {
                vertices.push(*point);
            }
        }

        let faces = planes
            .into_iter()
            .map(|(normal, offset)| {
                let on_face = vertices
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| (normal.dot(&v.coords) - offset).abs() <= tolerance)
                    .map(|(i, _)| i)
                    .collect();

                Face {
                    normal,
                    offset,
                    vertices: sort_around(&vertices, on_face, &normal),
                }
            })
            .collect();

        Ok(Self { vertices, faces })
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Edges of the hull as pairs of vertex indices, each edge listed once.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .faces
            .iter()
            .flat_map(|face| {
                face.vertices
                    .iter()
                    .zip(face.vertices.iter().cycle().skip(1))
                    .map(|(a, b)| (*a.min(b), *a.max(b)))
            })
            .collect();

        edges.sort_unstable();
        edges.dedup();
        edges
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            vertices: self.vertices.iter().map(|v| isometry * v).collect(),
            faces: self
                .faces
                .iter()
                .map(|face| {
                    let normal = isometry.rotation * face.normal;
                    Face {
                        normal,
                        offset: face.offset + normal.dot(&isometry.translation.vector),
                        vertices: face.vertices.clone(),
                    }
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let first = self.vertices[0];
        self.vertices.iter().fold(Aabb::new(first, first), |aabb, vertex| {
            aabb.merged(&Aabb::new(*vertex, *vertex))
        })
    }

    pub(crate) fn polyhedron(&self) -> Polyhedron {
        let mut edge_directions: Vec<Unit<Vector3<f64>>> = Vec::new();
        for (a, b) in self.edges() {
            let Some(direction) = Unit::try_new(self.vertices[b] - self.vertices[a], 0.0) else {
                continue;
            };

            let parallel = edge_directions
                .iter()
                .any(|known| known.cross(&direction).norm() < tools::AXIS_TOLERANCE);
            if !parallel {
                edge_directions.push(direction);
            }
        }

        Polyhedron {
            vertices: self.vertices.clone(),
            face_normals: self.faces.iter().map(|face| face.normal).collect(),
            edge_directions,
        }
    }

    /// Closest point to `point` on the polygon of `face`.
    fn closest_on_face(&self, face: &Face, point: &Point3<f64>) -> Point3<f64> {
        let projected = point - face.normal.into_inner() * face.distance(point);
        let corners = || {
            face.vertices
                .iter()
                .zip(face.vertices.iter().cycle().skip(1))
                .map(|(a, b)| (self.vertices[*a], self.vertices[*b]))
        };

        let inside = corners().all(|(a, b)| (b - a).cross(&(projected - a)).dot(&face.normal) >= 0.0);
        if inside {
            return projected;
        }

        corners()
            .map(|(a, b)| tools::closest_point_on_segment(&a, &b, point).0)
            .min_by(|a, b| (a - point).norm_squared().total_cmp(&(b - point).norm_squared()))
            .unwrap_or(projected)
    }
}

/// Every distinct supporting plane through three of the points, with outward normals.
fn hull_planes(points: &[Point3<f64>], tolerance: f64) -> Vec<(Unit<Vector3<f64>>, f64)> {
    let mut planes: Vec<(Unit<Vector3<f64>>, f64)> = Vec::new();

    for i in 0..points.len() {
        for j in i + 1..points.len() {
            for k in j + 1..points.len() {
                let cross = (points[j] - points[i]).cross(&(points[k] - points[i]));
                let Some(normal) = Unit::try_new(cross, tolerance * tolerance) else {
                    continue;
                };
                let offset = normal.dot(&points[i].coords);

                let distances = points.iter().map(|p| normal.dot(&p.coords) - offset);
                let (normal, offset) = if distances.clone().all(|d| d <= tolerance) {
                    (normal, offset)
                } else if distances.clone().all(|d| d >= -tolerance) {
                    (-normal, -offset)
                } else {
                    continue;
                };

                let known = planes.iter().any(|(n, o)| {
                    n.dot(&normal) > 1.0 - HULL_TOLERANCE && (o - offset).abs() <= tolerance
                });
                if !known {
                    planes.push((normal, offset));
                }
            }
        }
    }

    planes
}

/// Sorts the vertex indices of a face counter-clockwise around its normal.
fn sort_around(
    vertices: &[Point3<f64>],
    mut indices: Vec<usize>,
    normal: &Unit<Vector3<f64>>,
) -> Vec<usize> {
    if indices.is_empty() {
        return indices;
    }

    let center = indices.iter().map(|i| vertices[*i].coords).sum::<Vector3<f64>>()
        / indices.len() as f64;
    let u = tools::any_orthogonal(normal);
    let v = normal.cross(&u);
    let angle = |i: &usize| {
        let offset = vertices[*i].coords - center;
        offset.dot(&v).atan2(offset.dot(&u))
    };

    indices.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
    indices
}

impl PointQuery for ConvexPolytope {
    /// Inside the hull the closest face plane wins, ties go to the first face.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let distances: Vec<f64> = self.faces.iter().map(|face| face.distance(point)).collect();
        let nearest = tools::argmin(&distances.iter().map(|d| -d).collect::<Vec<_>>());
        let face = &self.faces[nearest];
        let deepest = distances[nearest];

        if deepest <= 0.0 {
            return PointContact {
                closest: point - face.normal.into_inner() * deepest,
                normal: face.normal,
                signed_distance: deepest,
            };
        }

        let closest = self
            .faces
            .iter()
            .map(|face| self.closest_on_face(face, point))
            .min_by(|a, b| (a - point).norm_squared().total_cmp(&(b - point).norm_squared()))
            .unwrap_or(*point);
        let (normal, distance) = tools::normal_or(point, &closest, face.normal);

        PointContact {
            closest,
            normal,
            signed_distance: distance,
        }
    }
}

impl RayCast for ConvexPolytope {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        let planes = self.faces.iter().map(|face| (face.normal, face.offset));
        let (distance, normal) = ray::clip_against_planes(ray, planes)?;

        Some(RayHit {
            distance,
            point: ray.point_at(distance),
            normal,
        })
    }
}
