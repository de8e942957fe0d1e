use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    query::Polyhedron,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// A box, given by its pose and its half extents along the local axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    pose: Isometry3<f64>,
    half_extents: Vector3<f64>,
}

impl Cuboid {
    /// # Errors
    ///
    /// Fails when the pose is not finite or any half extent is negative.
    pub fn new(pose: Isometry3<f64>, half_extents: Vector3<f64>) -> Result<Self> {
        tools::check_finite_pose(ShapeKind::Cuboid, &pose)?;
        for (name, value) in ["x", "y", "z"].into_iter().zip(half_extents.iter()) {
            tools::check_non_negative(ShapeKind::Cuboid, &format!("half extent {name}"), *value)?;
        }

        Ok(Self { pose, half_extents })
    }

    /// An axis aligned box centered at the origin.
    ///
    /// # Errors
    ///
    /// Fails when any half extent is negative.
    pub fn centered(half_extents: Vector3<f64>) -> Result<Self> {
        Self::new(Isometry3::identity(), half_extents)
    }

    #[must_use]
    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        self.half_extents
    }

    /// The local x, y and z axes of the box.
    #[must_use]
    pub fn axes(&self) -> [Unit<Vector3<f64>>; 3] {
        [
            self.pose.rotation * Vector3::x_axis(),
            self.pose.rotation * Vector3::y_axis(),
            self.pose.rotation * Vector3::z_axis(),
        ]
    }

    /// The eight corners of the box.
    #[must_use]
    pub fn vertices(&self) -> [Point3<f64>; 8] {
        let h = self.half_extents;
        std::array::from_fn(|i| {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };

            self.pose * Point3::new(sx * h.x, sy * h.y, sz * h.z)
        })
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            pose: isometry * self.pose,
            half_extents: self.half_extents,
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let rotation = self.pose.rotation.to_rotation_matrix();
        let extents = rotation.matrix().abs() * self.half_extents;

        Aabb::from_center(self.pose.translation.vector.into(), extents)
    }

    pub(crate) fn polyhedron(&self) -> Polyhedron {
        let axes = self.axes();

        Polyhedron {
            vertices: self.vertices().to_vec(),
            face_normals: axes.to_vec(),
            edge_directions: axes.to_vec(),
        }
    }

    /// Faces as half-spaces in the local frame, ordered `-x`, `+x`, `-y`, `+y`, `-z`, `+z`.
    fn local_planes(&self) -> impl Iterator<Item = (Unit<Vector3<f64>>, f64)> {
        let h = self.half_extents;

        [
            (-Vector3::x_axis(), h.x),
            (Vector3::x_axis(), h.x),
            (-Vector3::y_axis(), h.y),
            (Vector3::y_axis(), h.y),
            (-Vector3::z_axis(), h.z),
            (Vector3::z_axis(), h.z),
        ]
        .into_iter()
    }

    fn local_contact(&self, query: &Point3<f64>) -> PointContact {
        let h = self.half_extents;
        let outside = (0..3).any(|i| query[i].abs() > h[i]);

        if outside {
            let closest = Point3::from(query.coords.zip_map(&h, |q, h| q.clamp(-h, h)));
            let (normal, distance) = tools::normal_or(query, &closest, Vector3::z_axis());

            return PointContact {
                closest,
                normal,
                signed_distance: distance,
            };
        }

        let depths = [h.x - query.x.abs(), h.y - query.y.abs(), h.z - query.z.abs()];
        let axis = tools::argmin(&depths);
        let side = tools::sign(query[axis]);

        let mut closest = *query;
        closest[axis] = side * h[axis];
        let mut normal = Vector3::zeros();
        normal[axis] = side;

        PointContact {
            closest,
            normal: Unit::new_unchecked(normal),
            signed_distance: -depths[axis],
        }
    }
}

impl PointQuery for Cuboid {
    /// Inside the box the closest face wins, ties go to the lowest axis index.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let local = self.pose.inverse_transform_point(point);
        self.local_contact(&local).transformed(&self.pose)
    }
}

impl RayCast for Cuboid {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        let local = ray.to_local(&self.pose);
        let (distance, normal) = ray::clip_against_planes(&local, self.local_planes())?;

        Some(
            RayHit {
                distance,
                point: local.point_at(distance),
                normal,
            }
            .transformed(&self.pose),
        )
    }
}
