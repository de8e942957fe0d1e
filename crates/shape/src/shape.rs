use nalgebra::{Isometry3, Point3, Unit, Vector3};
use strum::{Display, EnumIter};

use crate::{
    Aabb, Capsule, ConvexPolytope, Cuboid, Cylinder, Ellipsoid, Ramp, Sphere, Torus,
    query::Polyhedron,
    ray::{Ray, RayCast, RayHit},
    support::SupportMap,
};

/// The kind of a [`Shape`], used to key the pair dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ShapeKind {
    Sphere,
    Cuboid,
    Capsule,
    Cylinder,
    Ramp,
    Torus,
    Ellipsoid,
    #[strum(to_string = "convex polytope")]
    ConvexPolytope,
}

/// Result of querying a shape with a point.
///
/// `normal` is the outward surface normal at `closest`. For a query outside of the shape it
/// points from `closest` towards the query, for a query inside it points away from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointContact {
    pub closest: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
    pub signed_distance: f64,
}

impl PointContact {
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.signed_distance <= 0.0
    }

    pub(crate) fn transformed(self, isometry: &Isometry3<f64>) -> Self {
        Self {
            closest: isometry * self.closest,
            normal: isometry.rotation * self.normal,
            signed_distance: self.signed_distance,
        }
    }
}

/// Closest point and signed distance queries against a single point.
///
/// The signed distance is negative inside, positive outside and zero on the boundary, and
/// its magnitude always equals the distance between the query and [`PointQuery::closest_point`].
pub trait PointQuery {
    fn point_contact(&self, point: &Point3<f64>) -> PointContact;

    /// The point on the boundary of the shape that is closest to `point`.
    fn closest_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.point_contact(point).closest
    }

    fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.point_contact(point).signed_distance
    }

    /// Distance from `point` to the shape, zero inside.
    fn distance(&self, point: &Point3<f64>) -> f64 {
        self.signed_distance(point).max(0.0)
    }

    /// Whether `point` lies inside the shape, or within `epsilon` of its boundary.
    fn contains(&self, point: &Point3<f64>, epsilon: f64) -> bool {
        self.signed_distance(point) <= epsilon
    }
}

/// Any of the supported primitive shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Sphere(Sphere),
    Cuboid(Cuboid),
    Capsule(Capsule),
    Cylinder(Cylinder),
    Ramp(Ramp),
    Torus(Torus),
    Ellipsoid(Ellipsoid),
    ConvexPolytope(ConvexPolytope),
}

macro_rules! impl_from_primitive {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Shape {
                fn from(value: $variant) -> Self {
                    Shape::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive!(
    Sphere,
    Cuboid,
    Capsule,
    Cylinder,
    Ramp,
    Torus,
    Ellipsoid,
    ConvexPolytope
);

/// Forwards a method call to the primitive held by a [`Shape`].
macro_rules! dispatch {
    ($shape:expr, $primitive:ident => $body:expr) => {
        match $shape {
            Shape::Sphere($primitive) => $body,
            Shape::Cuboid($primitive) => $body,
            Shape::Capsule($primitive) => $body,
            Shape::Cylinder($primitive) => $body,
            Shape::Ramp($primitive) => $body,
            Shape::Torus($primitive) => $body,
            Shape::Ellipsoid($primitive) => $body,
            Shape::ConvexPolytope($primitive) => $body,
        }
    };
}

impl Shape {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Cuboid(_) => ShapeKind::Cuboid,
            Shape::Capsule(_) => ShapeKind::Capsule,
            Shape::Cylinder(_) => ShapeKind::Cylinder,
            Shape::Ramp(_) => ShapeKind::Ramp,
            Shape::Torus(_) => ShapeKind::Torus,
            Shape::Ellipsoid(_) => ShapeKind::Ellipsoid,
            Shape::ConvexPolytope(_) => ShapeKind::ConvexPolytope,
        }
    }

    /// The same shape, moved rigidly by `isometry`.
    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Shape {
        dispatch!(self, shape => shape.transformed(isometry).into())
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        dispatch!(self, shape => shape.bounding_box())
    }

    /// The support mapping of the shape, `None` for the torus which is not convex.
    #[must_use]
    pub fn support_map(&self) -> Option<&dyn SupportMap> {
        match self {
            Shape::Sphere(sphere) => Some(sphere),
            Shape::Cuboid(cuboid) => Some(cuboid),
            Shape::Capsule(capsule) => Some(capsule),
            Shape::Cylinder(cylinder) => Some(cylinder),
            Shape::Ramp(ramp) => Some(ramp),
            Shape::Ellipsoid(ellipsoid) => Some(ellipsoid),
            Shape::ConvexPolytope(polytope) => Some(polytope),
            Shape::Torus(_) => None,
        }
    }

    /// Vertices, face normals and edge directions, for the shapes bounded by flat faces.
    pub(crate) fn polyhedron(&self) -> Option<Polyhedron> {
        match self {
            Shape::Cuboid(cuboid) => Some(cuboid.polyhedron()),
            Shape::Ramp(ramp) => Some(ramp.polyhedron()),
            Shape::ConvexPolytope(polytope) => Some(polytope.polyhedron()),
            _ => None,
        }
    }
}

impl PointQuery for Shape {
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        dispatch!(self, shape => shape.point_contact(point))
    }
}

impl RayCast for Shape {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        dispatch!(self, shape => shape.ray_cast(ray))
    }
}
