use nalgebra::{Isometry3, Point3, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// Upper bound on the number of sphere tracing steps for a single ray.
const MAX_TRACING_STEPS: usize = 512;

/// A torus, lying in the local xy plane around the local z axis.
///
/// `radius` is the distance from the center to the center of the tube, and `tube_radius` the
/// radius of the tube itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torus {
    pose: Isometry3<f64>,
    radius: f64,
    tube_radius: f64,
}

impl Torus {
    /// # Errors
    ///
    /// Fails when a radius is negative or the tube is wider than the torus radius.
    pub fn new(pose: Isometry3<f64>, radius: f64, tube_radius: f64) -> Result<Self> {
        tools::check_finite_pose(ShapeKind::Torus, &pose)?;
        tools::check_non_negative(ShapeKind::Torus, "radius", radius)?;
        tools::check_non_negative(ShapeKind::Torus, "tube radius", tube_radius)?;

        if tube_radius > radius {
            return Err(crate::Error::invalid(
                ShapeKind::Torus,
                format!("tube radius {tube_radius} exceeds the torus radius {radius}"),
            ));
        }

        Ok(Self {
            pose,
            radius,
            tube_radius,
        })
    }

    #[must_use]
    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn tube_radius(&self) -> f64 {
        self.tube_radius
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            pose: isometry * self.pose,
            ..*self
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let axis = self.pose.rotation * Vector3::z();
        let extents = axis.map(|a| self.radius * (1.0 - a * a).max(0.0).sqrt() + self.tube_radius);

        Aabb::from_center(self.pose.translation.vector.into(), extents)
    }

    fn local_contact(&self, query: &Point3<f64>) -> PointContact {
        let planar = Vector3::new(query.x, query.y, 0.0);
        let planar_length = planar.norm();

        // On the axis every point of the tube circle is equally close, the one on +x is used.
        let tube_center = if planar_length < tools::SMALLEST_DISTANCE {
            Point3::new(self.radius, 0.0, 0.0)
        } else {
            Point3::from(planar * (self.radius / planar_length))
        };

        let (normal, distance) = tools::normal_or(query, &tube_center, Vector3::z_axis());

        PointContact {
            closest: tube_center + normal.into_inner() * self.tube_radius,
            normal,
            signed_distance: distance - self.tube_radius,
        }
    }
}

impl PointQuery for Torus {
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let local = self.pose.inverse_transform_point(point);
        self.local_contact(&local).transformed(&self.pose)
    }
}

impl RayCast for Torus {
    /// Sphere traces the ray from where it enters the bounding sphere.
    ///
    /// Rays grazing the surface may need more than [`MAX_TRACING_STEPS`] steps to converge, those
    /// are reported as misses.
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        let local = ray.to_local(&self.pose);
        let bound = self.radius + self.tube_radius;
        let center = Point3::origin();

        let offset = local.origin.coords;
        let b = offset.dot(&local.direction);
        let discriminant = b * b - (offset.norm_squared() - bound * bound);
        if discriminant < 0.0 {
            return None;
        }
        let exit = -b + discriminant.sqrt();
        let mut distance = ray::sphere_entry(&local, &center, bound).unwrap_or(0.0);
        let tolerance = tools::AXIS_TOLERANCE * bound.max(1.0);

        for _ in 0..MAX_TRACING_STEPS {
            if distance > exit {
                return None;
            }

            let step = self.local_contact(&local.point_at(distance)).signed_distance;
            if step < tolerance {
                let point = local.point_at(distance);
                let normal = self.local_contact(&point).normal;

                return Some(
                    RayHit {
                        distance,
                        point,
                        normal,
                    }
                    .transformed(&self.pose),
                );
            }
            distance += step;
        }

        None
    }
}
