use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    query::Polyhedron,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// A wedge with a rectangular base.
///
/// In its local frame the ramp spans `[0, size.x]` along x and `[-size.y / 2, size.y / 2]`
/// along y. Its slope rises from the bottom edge at `x = 0` to the top edge at
/// `x = size.x, z = size.z`, where the vertical rear face closes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pose: Isometry3<f64>,
    size: Vector3<f64>,
}

impl Ramp {
    /// # Errors
    ///
    /// Fails when the pose is not finite or any size component is not strictly positive.
    pub fn new(pose: Isometry3<f64>, size: Vector3<f64>) -> Result<Self> {
        tools::check_finite_pose(ShapeKind::Ramp, &pose)?;
        tools::check_positive(ShapeKind::Ramp, "length", size.x)?;
        tools::check_positive(ShapeKind::Ramp, "width", size.y)?;
        tools::check_positive(ShapeKind::Ramp, "height", size.z)?;

        Ok(Self { pose, size })
    }

    #[must_use]
    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.size
    }

    /// Length of the slope, from the bottom edge to the top edge.
    #[must_use]
    pub fn slope_length(&self) -> f64 {
        self.size.x.hypot(self.size.z)
    }

    /// Angle between the slope and the base, in radians.
    #[must_use]
    pub fn incline(&self) -> f64 {
        self.size.z.atan2(self.size.x)
    }

    /// The six corners of the ramp.
    #[must_use]
    pub fn vertices(&self) -> [Point3<f64>; 6] {
        let (length, height) = (self.size.x, self.size.z);
        let half_width = 0.5 * self.size.y;

        [
            Point3::new(0.0, -half_width, 0.0),
            Point3::new(0.0, half_width, 0.0),
            Point3::new(length, -half_width, 0.0),
            Point3::new(length, half_width, 0.0),
            Point3::new(length, -half_width, height),
            Point3::new(length, half_width, height),
        ]
        .map(|vertex| self.pose * vertex)
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            pose: isometry * self.pose,
            size: self.size,
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let [first, rest @ ..] = self.vertices();
        rest.iter().fold(Aabb::new(first, first), |aabb, vertex| {
            aabb.merged(&Aabb::new(*vertex, *vertex))
        })
    }

    /// Unit direction of the slope in the local xz plane.
    fn slope_direction(&self) -> Vector3<f64> {
        Vector3::new(self.size.x, 0.0, self.size.z) / self.slope_length()
    }

    /// Outward normal of the slope face, in the local frame.
    fn slope_normal(&self) -> Unit<Vector3<f64>> {
        let direction = self.slope_direction();
        Unit::new_unchecked(Vector3::new(-direction.z, 0.0, direction.x))
    }

    pub(crate) fn polyhedron(&self) -> Polyhedron {
        let rotation = self.pose.rotation;
        let slope_direction = Unit::new_unchecked(self.slope_direction());

        Polyhedron {
            vertices: self.vertices().to_vec(),
            face_normals: [
                -Vector3::y_axis(),
                Vector3::y_axis(),
                Vector3::x_axis(),
                -Vector3::z_axis(),
                self.slope_normal(),
            ]
            .map(|normal| rotation * normal)
            .to_vec(),
            edge_directions: [
                Vector3::x_axis(),
                Vector3::y_axis(),
                Vector3::z_axis(),
                slope_direction,
            ]
            .map(|direction| rotation * direction)
            .to_vec(),
        }
    }

    /// Faces as half-spaces in the local frame, ordered right, left, rear, bottom, slope.
    fn local_planes(&self) -> [(Unit<Vector3<f64>>, f64); 5] {
        let half_width = 0.5 * self.size.y;

        [
            (-Vector3::y_axis(), half_width),
            (Vector3::y_axis(), half_width),
            (Vector3::x_axis(), self.size.x),
            (-Vector3::z_axis(), 0.0),
            (self.slope_normal(), 0.0),
        ]
    }

    fn local_contact(&self, query: &Point3<f64>) -> PointContact {
        let (x, y, z) = (query.x, query.y, query.z);
        let length = self.size.x;
        let height = self.size.z;
        let half_width = 0.5 * self.size.y;

        let direction = self.slope_direction();
        let slope_normal = self.slope_normal();
        let along_slope = x * direction.x + z * direction.z;
        let above_slope = direction.x * z - x * direction.z;
        let clamped_y = y.clamp(-half_width, half_width);
        let on_slope = |y| Point3::new(along_slope * direction.x, y, along_slope * direction.z);

        let from_closest = |closest: Point3<f64>, fallback| {
            let (normal, distance) = tools::normal_or(query, &closest, fallback);
            PointContact {
                closest,
                normal,
                signed_distance: distance,
            }
        };

        if z < 0.0 {
            // Below the base.
            let closest = Point3::new(x.clamp(0.0, length), clamped_y, 0.0);
            if closest.x == x && closest.y == y {
                return PointContact {
                    closest,
                    normal: -Vector3::z_axis(),
                    signed_distance: -z,
                };
            }
            return from_closest(closest, -Vector3::z_axis());
        }

        if x > length || along_slope > self.slope_length() {
            // Behind the rear face.
            let closest = Point3::new(length, clamped_y, z.clamp(0.0, height));
            if closest.y == y && closest.z == z {
                return PointContact {
                    closest,
                    normal: Vector3::x_axis(),
                    signed_distance: x - length,
                };
            }
            return from_closest(closest, Vector3::x_axis());
        }

        if along_slope < 0.0 {
            // In front of the bottom edge.
            return from_closest(Point3::new(0.0, clamped_y, 0.0), slope_normal);
        }

        if y.abs() > half_width {
            if above_slope < 0.0 {
                return PointContact {
                    closest: Point3::new(x, clamped_y, z),
                    normal: Unit::new_unchecked(Vector3::y() * tools::sign(y)),
                    signed_distance: y.abs() - half_width,
                };
            }
            return from_closest(on_slope(clamped_y), slope_normal);
        }

        if above_slope > 0.0 {
            return PointContact {
                closest: on_slope(y),
                normal: slope_normal,
                signed_distance: above_slope,
            };
        }

        let depths = [
            y + half_width,
            half_width - y,
            length - x,
            z,
            -above_slope,
        ];
        let face = tools::argmin(&depths);
        let closest = match face {
            0 => Point3::new(x, -half_width, z),
            1 => Point3::new(x, half_width, z),
            2 => Point3::new(length, y, z),
            3 => Point3::new(x, y, 0.0),
            _ => on_slope(y),
        };

        PointContact {
            closest,
            normal: self.local_planes()[face].0,
            signed_distance: -depths[face],
        }
    }
}

impl PointQuery for Ramp {
    /// Inside the ramp ties between faces resolve in the order right, left, rear, bottom, slope.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let local = self.pose.inverse_transform_point(point);
        self.local_contact(&local).transformed(&self.pose)
    }
}

impl RayCast for Ramp {
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
