//! # shape 🔷
//!
//! shape answers geometric queries on primitive shapes that carry no coordinate frame of their
//! own: closest points, signed distances, ray casts and intersections.
//!
//! All shapes are plain values built on [`nalgebra`] types over `f64`, validated once at
//! construction. Queries never re-validate them.
//!
//! ## Point queries
//!
//! Every shape implements [`PointQuery`]. The signed distance is negative inside a shape, zero on
//! its boundary and positive outside, and its magnitude always matches the distance to
//! [`PointQuery::closest_point`].
//!
//! ```rust
//! use nalgebra::Point3;
//! use shape::{PointQuery, Sphere};
//!
//! let sphere = Sphere::new(Point3::origin(), 1.0).unwrap();
//! let point = Point3::new(2.0, 0.0, 0.0);
//!
//! assert!((sphere.signed_distance(&point) - 1.0).abs() < 1e-9);
//! assert!((sphere.closest_point(&point) - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
//! ```
//!
//! ## Intersections
//!
//! [`intersects`] and [`penetration`] dispatch on the ordered pair of [`ShapeKind`]s. Pairs of
//! convex shapes without a closed form query fall back to GJK and EPA on their [`SupportMap`]s.
//! The torus is not convex, a pair without any query fails with
//! [`Error::UnsupportedShapePair`], see [`supported_pairs`] for the complete table.
//!
//! ```rust
//! use nalgebra::{Isometry3, Vector3};
//! use shape::{Cuboid, Shape, intersects};
//!
//! let boxed = |x: f64| -> Shape {
//!     Cuboid::new(Isometry3::translation(x, 0.0, 0.0), Vector3::repeat(1.0))
//!         .unwrap()
//!         .into()
//! };
//!
//! assert!(!intersects(&boxed(0.0), &boxed(3.0)).unwrap());
//! assert!(intersects(&boxed(0.0), &boxed(1.5)).unwrap());
//! ```
//!
//! ## Degenerate queries
//!
//! When a query point is equally close to several faces, the first face in a fixed order wins:
//! the lowest axis index for boxes, the side before the caps for cylinders, and right, left, rear,
//! bottom, slope for ramps. A query at the exact center of a sphere gets the normal `+Z`.

mod aabb;
mod capsule;
mod cuboid;
mod cylinder;
mod ellipsoid;
pub mod error;
mod gjk;
mod polytope;
mod query;
mod ramp;
mod ray;
mod shape;
mod sphere;
mod support;
pub mod tools;
mod torus;

pub use aabb::Aabb;
pub use capsule::Capsule;
pub use cuboid::Cuboid;
pub use cylinder::Cylinder;
pub use ellipsoid::Ellipsoid;
pub use error::{Error, Result};
pub use polytope::{ConvexPolytope, Face};
pub use query::{PairQuery, Penetration, intersects, pair_query, penetration, supported_pairs};
pub use ramp::Ramp;
pub use ray::{Ray, RayCast, RayHit};
pub use shape::{PointContact, PointQuery, Shape, ShapeKind};
pub use sphere::Sphere;
pub use support::SupportMap;
pub use torus::Torus;
