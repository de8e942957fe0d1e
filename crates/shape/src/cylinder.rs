use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// A solid cylinder of length `2 * half_length` centered on `center` along `axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    center: Point3<f64>,
    axis: Unit<Vector3<f64>>,
    half_length: f64,
    radius: f64,
}

impl Cylinder {
    /// # Errors
    ///
    /// Fails when the axis is not unit length, or the length or radius is negative.
    pub fn new(
        center: Point3<f64>,
        axis: Vector3<f64>,
        half_length: f64,
        radius: f64,
    ) -> Result<Self> {
        tools::check_finite_point(ShapeKind::Cylinder, "center", &center)?;
        let axis = tools::check_unit_axis(ShapeKind::Cylinder, &axis)?;
        tools::check_non_negative(ShapeKind::Cylinder, "half length", half_length)?;
        tools::check_non_negative(ShapeKind::Cylinder, "radius", radius)?;

        Ok(Self {
            center,
            axis,
            half_length,
            radius,
        })
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
        let extents = self.axis.map(|a| {
            a.abs() * self.half_length + self.radius * (1.0 - a * a).max(0.0).sqrt()
        });

        Aabb::from_center(self.center, extents)
    }
}

impl PointQuery for Cylinder {
    /// Inside the cylinder the side wins ties against the caps.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let axis = self.axis.into_inner();
        let offset = point - self.center;
        let along = axis.dot(&offset);
        let radial = offset - axis * along;
        let from_axis = radial.norm();

        let outward = Unit::try_new(radial, tools::SMALLEST_DISTANCE)
            .unwrap_or_else(|| tools::any_orthogonal(&axis));
        let cap_normal = Unit::new_unchecked(axis * tools::sign(along));
        let on_axis = self.center + axis * along;
        let on_cap = self.center + cap_normal.into_inner() * self.half_length;

        let beyond_cap = along.abs() > self.half_length;
        let beyond_side = from_axis > self.radius;

        match (beyond_cap, beyond_side) {
            (false, false) => {
                let side_depth = self.radius - from_axis;
                let cap_depth = self.half_length - along.abs();

                if side_depth <= cap_depth {
                    PointContact {
                        closest: on_axis + outward.into_inner() * self.radius,
                        normal: outward,
                        signed_distance: -side_depth,
                    }
                } else {
                    PointContact {
                        closest: on_cap + radial,
                        normal: cap_normal,
                        signed_distance: -cap_depth,
                    }
                }
            }
            (false, true) => PointContact {
                closest: on_axis + outward.into_inner() * self.radius,
                normal: outward,
                signed_distance: from_axis - self.radius,
            },
            (true, false) => PointContact {
                closest: on_cap + radial,
                normal: cap_normal,
                signed_distance: along.abs() - self.half_length,
            },
            (true, true) => {
                let closest = on_cap + outward.into_inner() * self.radius;
                let (normal, distance) = tools::normal_or(point, &closest, cap_normal);

                PointContact {
                    closest,
                    normal,
                    signed_distance: distance,
                }
            }
        }
    }
}

impl RayCast for Cylinder {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        let axis = self.axis.into_inner();
        let side = ray::infinite_cylinder_entry(ray, &self.center, &self.axis, self.radius)
            .filter(|t| axis.dot(&(ray.point_at(*t) - self.center)).abs() <= self.half_length);

        let denominator = axis.dot(&ray.direction);
        let caps = [-1.0, 1.0].map(|side: f64| {
            if denominator.abs() < tools::SMALLEST_DISTANCE {
                return None;
            }

            let t = (side * self.half_length - axis.dot(&(ray.origin - self.center))) / denominator;
            let offset = ray.point_at(t) - self.center;
            let radial = offset - axis * axis.dot(&offset);

            (t >= 0.0 && radial.norm() <= self.radius).then_some(t)
        });

        let distance = [side, caps[0], caps[1]]
            .into_iter()
            .flatten()
            .min_by(f64::total_cmp)?;

        Some(ray::hit_on_surface(self, ray, distance))
    }
}
