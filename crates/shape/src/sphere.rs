use nalgebra::{Isometry3, Point3, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// A sphere, given by its center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Point3<f64>,
    radius: f64,
}

impl Sphere {
    /// # Errors
    ///
    /// Fails when the center is not finite or the radius is negative.
    pub fn new(center: Point3<f64>, radius: f64) -> Result<Self> {
        tools::check_finite_point(ShapeKind::Sphere, "center", &center)?;
        tools::check_non_negative(ShapeKind::Sphere, "radius", radius)?;

        Ok(Self { center, radius })
    }

    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            center: isometry * self.center,
            radius: self.radius,
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_center(self.center, Vector3::repeat(self.radius))
    }
}

impl PointQuery for Sphere {
    /// A query at the exact center is given the normal `+Z`.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let (normal, distance) = tools::normal_or(point, &self.center, Vector3::z_axis());

        PointContact {
            closest: self.center + normal.into_inner() * self.radius,
            normal,
            signed_distance: distance - self.radius,
        }
    }
}

impl RayCast for Sphere {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        let distance = ray::sphere_entry(ray, &self.center, self.radius)?;
        Some(ray::hit_on_surface(self, ray, distance))
    }
}
