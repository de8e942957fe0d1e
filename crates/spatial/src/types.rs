//! Convenience type aliases for frame-tagged [`nalgebra`] and [`shape`] types.

use nalgebra as na;

use super::space::InFrame;

pub type Point2 = InFrame<na::Point2<f64>>;
pub type Point3 = InFrame<na::Point3<f64>>;

pub type Vector2 = InFrame<na::Vector2<f64>>;
pub type Vector3 = InFrame<na::Vector3<f64>>;

pub type Orientation2 = InFrame<na::UnitComplex<f64>>;
pub type Orientation3 = InFrame<na::UnitQuaternion<f64>>;

pub type Pose2 = InFrame<na::Isometry2<f64>>;
pub type Pose3 = InFrame<na::Isometry3<f64>>;

pub type FrameShape = InFrame<shape::Shape>;
pub type FrameRay = InFrame<shape::Ray>;
