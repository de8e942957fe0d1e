//! # spatial 🌐
//!
//! spatial keeps track of coordinate frames at runtime and makes sure values expressed in
//! different frames are never mixed by accident.
//!
//! ## [`FrameTree`]
//!
//! Frames live in a [`FrameTree`], rooted in a single world frame. Every frame stores the
//! transform to its parent, and the tree resolves the transform between any two frames through
//! their lowest common ancestor.
//!
//! ### Example
//!
//! ```rust
//! use nalgebra::{Isometry3, Point3};
//! use spatial::FrameTree;
//!
//! let mut tree = FrameTree::new();
//! let robot = tree
//!     .create_frame("robot", tree.world(), Isometry3::translation(1.0, 0.0, 0.0))
//!     .unwrap();
//! let sensor = tree
//!     .create_frame("sensor", robot, Isometry3::translation(0.0, 1.0, 0.0))
//!     .unwrap();
//!
//! let sensor_to_world = tree.transform(sensor, tree.world()).unwrap();
//! let origin = sensor_to_world.inner.transform_point(&Point3::origin());
//!
//! assert!((origin - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-9);
//! ```
//!
//! ## [`InFrame<T>`] and [`BetweenFrames<T>`]
//!
//! spatial introduces [`InFrame<T>`] to denote which frame a value is expressed in. Binary
//! operations between tagged values fail with [`Error::FrameMismatch`] unless both values share a
//! frame, a value has to be moved explicitly with [`InFrame::expressed_in`].
//!
//! Resolved transforms are [`BetweenFrames<T>`], which remember the frames they map between.
//!
//! ### Example
//!
//! ```rust
//! # use nalgebra::{Isometry3, Point3};
//! # use spatial::FrameTree;
//! # let mut tree = FrameTree::new();
//! # let robot = tree
//! #     .create_frame("robot", tree.world(), Isometry3::translation(1.0, 0.0, 0.0))
//! #     .unwrap();
//! use spatial::{Error, InFrame};
//!
//! let in_robot = InFrame::new(robot, Point3::new(0.0, 2.0, 0.0));
//! let in_world = InFrame::new(tree.world(), Point3::origin());
//!
//! // ERROR: the points are expressed in different frames!
//! assert!(matches!(in_robot.distance(&in_world), Err(Error::FrameMismatch { .. })));
//!
//! let moved = in_robot.expressed_in(&tree, tree.world()).unwrap();
//! assert!((moved.distance(&in_world).unwrap() - 5.0_f64.sqrt()).abs() < 1e-9);
//! ```
//!
//! ## Shapes
//!
//! A [`shape::Shape`] tagged with a frame answers queries against points, rays and shapes in any
//! frame of the same tree. The other operand is expressed in the frame of the shape first, and so
//! are the results.
//!
//! ## Sharing a tree
//!
//! Queries on a [`FrameTree`] take `&self` and can run concurrently, changes take `&mut self`.
//! Share a tree between threads as a [`SharedFrameTree`].

pub mod config;
pub mod error;
mod frame_shape;
pub mod space;
pub mod transform;
pub mod tree;
pub mod types;

pub use config::{Config, SpatialConfig};
pub use error::{Error, Result};
pub use space::{EpsilonEq, InFrame, Interpolate};
pub use transform::{BetweenFrames, FrameTransform, Transformable};
pub use tree::{FrameId, FrameTree, SharedFrameTree};
