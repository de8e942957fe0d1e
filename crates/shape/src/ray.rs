//! Ray casting against shapes.

use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{Error, PointQuery, Result, tools::SMALLEST_DISTANCE};

/// A half-line starting at `origin`, with a unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    ///
    /// # Errors
    ///
    /// Fails when the origin is not finite or the direction is (close to) zero.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Result<Self> {
        if !origin.coords.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidRay(format!("origin must be finite, got {origin}")));
        }

        let direction = Unit::try_new(direction, SMALLEST_DISTANCE)
            .filter(|direction| direction.iter().all(|v| v.is_finite()))
            .ok_or_else(|| Error::InvalidRay(format!("direction must be non-zero, got {direction}")))?;

        Ok(Self { origin, direction })
    }

    #[must_use]
    pub fn point_at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction.into_inner() * distance
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Ray {
        Ray {
            origin: isometry * self.origin,
            direction: isometry.rotation * self.direction,
        }
    }

    /// The ray expressed in the local frame of `pose`.
    #[must_use]
    pub(crate) fn to_local(&self, pose: &Isometry3<f64>) -> Ray {
        Ray {
            origin: pose.inverse_transform_point(&self.origin),
            direction: pose.inverse_transform_unit_vector(&self.direction),
        }
    }
}

/// First contact of a ray with a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray, `0.0` when the ray starts inside the shape.
    pub distance: f64,
    pub point: Point3<f64>,
    /// Outward surface normal at `point`.
    pub normal: Unit<Vector3<f64>>,
}

impl RayHit {
    pub(crate) fn transformed(self, isometry: &Isometry3<f64>) -> Self {
        Self {
            distance: self.distance,
            point: isometry * self.point,
            normal: isometry.rotation * self.normal,
        }
    }
}

pub trait RayCast {
    /// First point where `ray` meets the shape, if any.
    ///
    /// A ray starting inside the shape, or on its boundary, hits at distance zero.
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit>;
}

/// Hit at the ray origin when it starts inside `shape`.
pub(crate) fn hit_from_inside(shape: &impl PointQuery, ray: &Ray) -> Option<RayHit> {
    let contact = shape.point_contact(&ray.origin);

    contact.is_inside().then_some(RayHit {
        distance: 0.0,
        point: ray.origin,
        normal: contact.normal,
    })
}

/// Hit at `distance` along the ray, taking the normal from the shape's point query.
pub(crate) fn hit_on_surface(shape: &impl PointQuery, ray: &Ray, distance: f64) -> RayHit {
    let point = ray.point_at(distance);

    RayHit {
        distance,
        point,
        normal: shape.point_contact(&point).normal,
    }
}

/// Entry distance of a ray into a sphere, ignoring entries behind the origin.
pub(crate) fn sphere_entry(ray: &Ray, center: &Point3<f64>, radius: f64) -> Option<f64> {
    let offset = ray.origin - center;
    let b = offset.dot(&ray.direction);
    let c = offset.norm_squared() - radius * radius;
    let discriminant = b * b - c;

    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    (t >= 0.0).then_some(t)
}

/// Entry distance of a ray into the infinite cylinder of `radius` around the line through
/// `center` along `axis`.
pub(crate) fn infinite_cylinder_entry(
    ray: &Ray,
    center: &Point3<f64>,
    axis: &Unit<Vector3<f64>>,
    radius: f64,
) -> Option<f64> {
    let offset = ray.origin - center;
    let offset = offset - axis.into_inner() * axis.dot(&offset);
    let direction = ray.direction.into_inner() - axis.into_inner() * axis.dot(&ray.direction);

    let a = direction.norm_squared();
    if a < SMALLEST_DISTANCE {
        return None;
    }

    let b = offset.dot(&direction);
    let c = offset.norm_squared() - radius * radius;
    let discriminant = b * b - a * c;

    if discriminant < 0.0 {
        return None;
    }

    let t = (-b - discriminant.sqrt()) / a;
    (t >= 0.0).then_some(t)
}

/// Clips a ray against the intersection of half-spaces `normal · x <= offset`.
///
/// Returns the entry distance and the normal of the plane the ray enters through. On ties the
/// first plane wins. The origin is expected to lie outside of the volume.
pub(crate) fn clip_against_planes(
    ray: &Ray,
    planes: impl IntoIterator<Item = (Unit<Vector3<f64>>, f64)>,
) -> Option<(f64, Unit<Vector3<f64>>)> {
    let mut entry = 0.0;
    let mut exit = f64::INFINITY;
    let mut entry_normal = None;

    for (normal, offset) in planes {
        let denominator = normal.dot(&ray.direction);
        let distance = normal.dot(&ray.origin.coords) - offset;

        if denominator.abs() < SMALLEST_DISTANCE {
            if distance > 0.0 {
                return None;
            }
            continue;
        }

        let t = -distance / denominator;
        if denominator < 0.0 {
            if t > entry || (entry_normal.is_none() && t >= entry) {
                entry = t;
                entry_normal = Some(normal);
            }
        } else {
            exit = exit.min(t);
        }

        if entry > exit {
            return None;
        }
    }

    entry_normal.map(|normal| (entry, normal))
}
