use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// A capsule: all points within `radius` of the segment of length `2 * half_length` centered on
/// `center` along `axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    center: Point3<f64>,
    axis: Unit<Vector3<f64>>,
    half_length: f64,
    radius: f64,
}

impl Capsule {
    /// # Errors
    ///
    /// Fails when the axis is not unit length, or the length or radius is negative.
    pub fn new(
        center: Point3<f64>,
        axis: Vector3<f64>,
        half_length: f64,
        radius: f64,
    ) -> Result<Self> {
        tools::check_finite_point(ShapeKind::Capsule, "center", &center)?;
        let axis = tools::check_unit_axis(ShapeKind::Capsule, &axis)?;
        tools::check_non_negative(ShapeKind::Capsule, "half length", half_length)?;
        tools::check_non_negative(ShapeKind::Capsule, "radius", radius)?;

        Ok(Self {
            center,
            axis,
            half_length,
            radius,
        })
    }

    /// Creates the capsule around the segment `[start, end]`.
    ///
    /// Coinciding end points give a sphere, with its axis along `+Z`.
    ///
    /// # Errors
    ///
    /// Fails when an end point is not finite or the radius is negative.
    pub fn from_endpoints(start: Point3<f64>, end: Point3<f64>, radius: f64) -> Result<Self> {
        tools::check_finite_point(ShapeKind::Capsule, "start", &start)?;
        tools::check_finite_point(ShapeKind::Capsule, "end", &end)?;

        let segment = end - start;
        let length = segment.norm();
        let axis = if length > tools::SMALLEST_DISTANCE {
            segment / length
        } else {
            Vector3::z()
        };

        Self::new(nalgebra::center(&start, &end), axis, length * 0.5, radius)
    }

    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    #[must_use]
    pub fn axis(&self) -> Unit<Vector3<f64>> {
        self.axis
    }

    #[must_use]
    pub fn half_length(&self) -> f64 {
        self.half_length
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The two end points of the inner segment.
    #[must_use]
    pub fn endpoints(&self) -> (Point3<f64>, Point3<f64>) {
        let offset = self.axis.into_inner() * self.half_length;
        (self.center - offset, self.center + offset)
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            center: isometry * self.center,
            axis: isometry.rotation * self.axis,
            ..*self
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let (start, end) = self.endpoints();
        Aabb::new(start, end).loosened(self.radius)
    }
}

impl PointQuery for Capsule {
    /// A query on the inner segment takes a normal orthogonal to the axis.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let (start, end) = self.endpoints();
        let (on_segment, _) = tools::closest_point_on_segment(&start, &end, point);
        let (normal, distance) =
            tools::normal_or(point, &on_segment, tools::any_orthogonal(&self.axis));

        PointContact {
            closest: on_segment + normal.into_inner() * self.radius,
            normal,
            signed_distance: distance - self.radius,
        }
    }
}

impl RayCast for Capsule {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        let (start, end) = self.endpoints();
        let side = ray::infinite_cylinder_entry(ray, &self.center, &self.axis, self.radius)
            .filter(|t| self.axis.dot(&(ray.point_at(*t) - self.center)).abs() <= self.half_length);

        let distance = [
            side,
            ray::sphere_entry(ray, &start, self.radius),
            ray::sphere_entry(ray, &end, self.radius),
        ]
        .into_iter()
        .flatten()
        .min_by(f64::total_cmp)?;

        Some(ray::hit_on_surface(self, ray, distance))
    }
}
