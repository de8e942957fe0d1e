//! Support mappings of the convex primitives.

use nalgebra::{Point3, Vector3};

use crate::{Capsule, ConvexPolytope, Cuboid, Cylinder, Ellipsoid, Ramp, Sphere, tools};

/// Convex shapes that report their farthest point along a direction.
///
/// This is all [`crate::intersects`] needs to test a pair of convex shapes without a dedicated
/// query.
pub trait SupportMap {
    /// A point of the shape maximizing the dot product with `direction`.
    ///
    /// `direction` does not have to be normalized. When several points are farthest any of them
    /// may be returned, a zero direction yields some point of the shape.
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64>;
}

/// The vertex farthest along `direction`.
fn farthest_vertex(vertices: &[Point3<f64>], direction: &Vector3<f64>) -> Point3<f64> {
    vertices
        .iter()
        .copied()
        .max_by(|a, b| a.coords.dot(direction).total_cmp(&b.coords.dot(direction)))
        .unwrap_or_else(Point3::origin)
}

/// Offset of `radius` along `direction`, zero for a zero direction.
fn rounding(direction: &Vector3<f64>, radius: f64) -> Vector3<f64> {
    direction
        .try_normalize(tools::SMALLEST_DISTANCE)
        .map_or_else(Vector3::zeros, |unit| unit * radius)
}

impl SupportMap for Sphere {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        self.center() + rounding(direction, self.radius())
    }
}

impl SupportMap for Cuboid {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let local = self.pose().inverse_transform_vector(direction);
        let half_extents = self.half_extents();
        let corner = Point3::new(
            tools::sign(local.x) * half_extents.x,
            tools::sign(local.y) * half_extents.y,
            tools::sign(local.z) * half_extents.z,
        );

        self.pose() * corner
    }
}

impl SupportMap for Capsule {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let (start, end) = self.endpoints();
        let tip = if self.axis().dot(direction) >= 0.0 { end } else { start };

        tip + rounding(direction, self.radius())
    }
}

impl SupportMap for Cylinder {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let axis = self.axis();
        let along = axis.dot(direction);
        let radial = direction - axis.into_inner() * along;
        let rim = radial
            .try_normalize(tools::SMALLEST_DISTANCE)
            .unwrap_or_else(|| tools::any_orthogonal(&axis).into_inner());

        let cap = axis.into_inner() * (tools::sign(along) * self.half_length());

        self.center() + cap + rim * self.radius()
    }
}

impl SupportMap for Ramp {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        farthest_vertex(&self.vertices(), direction)
    }
}

impl SupportMap for Ellipsoid {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        let radii = self.radii();
        let local = self.pose().inverse_transform_vector(direction);

        // The farthest point of the unit sphere, stretched back onto the ellipsoid.
        let scaled = radii.component_mul(&local);
        let norm = scaled.norm();
        if norm < tools::SMALLEST_DISTANCE {
            return self.pose() * Point3::origin();
        }

        self.pose() * Point3::from(radii.component_mul(&scaled) / norm)
    }
}

impl SupportMap for ConvexPolytope {
    fn support(&self, direction: &Vector3<f64>) -> Point3<f64> {
        farthest_vertex(self.vertices(), direction)
    }
}
