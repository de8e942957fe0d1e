//! Traits and types for transforming values between frames.

use std::fmt;
use std::ops::Mul;

use nalgebra::{
    Isometry2, Isometry3, Point2, Point3, Unit, UnitComplex, UnitQuaternion, Vector2, Vector3,
};
use shape::{Ray, Shape};

use crate::config::DEFAULT_EPSILON;
use crate::error::{Error, Result};
use crate::space::InFrame;
use crate::tree::FrameId;

/// A resolved transform mapping coordinates in one frame into another.
pub type FrameTransform = BetweenFrames<Isometry3<f64>>;

/// Values that can be carried through a rigid transform.
pub trait Transformable: Sized {
    /// Applies `isometry` to the value.
    ///
    /// Returns `None` when the value has no image under `isometry`, which only happens for planar
    /// values carried through a transform that tilts the XY plane by more than `epsilon`.
    fn transformed_by(&self, isometry: &Isometry3<f64>, epsilon: f64) -> Option<Self>;
}

macro_rules! impl_transformable {
    ($inner:ty, |$isometry:ident, $value:ident| $forward:expr) => {
        impl Transformable for $inner {
            fn transformed_by(&self, $isometry: &Isometry3<f64>, _epsilon: f64) -> Option<Self> {
                let $value = self;
                Some($forward)
            }
        }
    };
    (planar $inner:ty, |$isometry:ident, $value:ident| $forward:expr) => {
        impl Transformable for $inner {
            fn transformed_by(&self, isometry: &Isometry3<f64>, epsilon: f64) -> Option<Self> {
                let $isometry = planar(isometry, epsilon)?;
                let $value = self;
                Some($forward)
            }
        }
    };
}

impl_transformable!(Point3<f64>, |isometry, point| isometry.transform_point(point));
impl_transformable!(Vector3<f64>, |isometry, vector| isometry.transform_vector(vector));
impl_transformable!(Unit<Vector3<f64>>, |isometry, direction| isometry.rotation * *direction);
impl_transformable!(UnitQuaternion<f64>, |isometry, rotation| isometry.rotation * *rotation);
impl_transformable!(Isometry3<f64>, |isometry, pose| isometry * pose);
impl_transformable!(Ray, |isometry, ray| ray.transformed(isometry));
impl_transformable!(Shape, |isometry, shape| shape.transformed(isometry));

impl_transformable!(planar Point2<f64>, |isometry, point| isometry.transform_point(point));
impl_transformable!(planar Vector2<f64>, |isometry, vector| isometry.transform_vector(vector));
impl_transformable!(planar UnitComplex<f64>, |isometry, rotation| isometry.rotation * *rotation);
impl_transformable!(planar Isometry2<f64>, |isometry, pose| isometry * *pose);

/// Projects `isometry` onto the XY plane.
///
/// The rotation must keep the Z axis within `epsilon`, the Z translation is dropped.
#[must_use]
pub fn planar(isometry: &Isometry3<f64>, epsilon: f64) -> Option<Isometry2<f64>> {
    let z = isometry.rotation * Vector3::z();
    if z.x.abs() > epsilon || z.y.abs() > epsilon || z.z <= 0.0 {
        return None;
    }

    let x = isometry.rotation * Vector3::x();
    let translation = isometry.translation.vector;

    Some(Isometry2::new(
        Vector2::new(translation.x, translation.y),
        x.y.atan2(x.x),
    ))
}

/// Wrapper type for `T`s which can be used to transform between two frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetweenFrames<T> {
    from: FrameId,
    to: FrameId,
    pub inner: T,
}

impl<T> BetweenFrames<T> {
    /// Wrap a `T` mapping coordinates in `from` into coordinates in `to`.
    pub const fn new(from: FrameId, to: FrameId, inner: T) -> Self {
        Self { from, to, inner }
    }

    #[must_use]
    pub fn from_frame(&self) -> FrameId {
        self.from
    }

    #[must_use]
    pub fn to_frame(&self) -> FrameId {
        self.to
    }

    /// Composes `self` with a transform starting where `self` ends.
    ///
    /// Fails with [`Error::FrameMismatch`] unless `other` starts in the frame `self` maps into.
    pub fn chain<T2>(self, other: BetweenFrames<T2>) -> Result<BetweenFrames<T2::Output>>
    where
        T2: Mul<T>,
    {
        if self.to != other.from {
            return Err(Error::FrameMismatch {
                left: self.to,
                right: other.from,
            });
        }

        Ok(BetweenFrames::new(self.from, other.to, other.inner * self.inner))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> BetweenFrames<U> {
        BetweenFrames::new(self.from, self.to, f(self.inner))
    }

    pub fn as_ref(&self) -> BetweenFrames<&T> {
        BetweenFrames::new(self.from, self.to, &self.inner)
    }
}

impl BetweenFrames<Isometry3<f64>> {
    /// The transform mapping `to` back into `from`.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self::new(self.to, self.from, self.inner.inverse())
    }

    /// Expresses a value given in `from` in `to`.
    pub fn transform<U: Transformable>(&self, value: &InFrame<U>) -> Result<InFrame<U>> {
        self.transform_with(value, DEFAULT_EPSILON)
    }

    /// Expresses a value given in `to` in `from`.
    pub fn inverse_transform<U: Transformable>(&self, value: &InFrame<U>) -> Result<InFrame<U>> {
        self.inverse().transform(value)
    }

    /// Like [`BetweenFrames::transform`], with an explicit tolerance for planar values.
    pub fn transform_with<U: Transformable>(
        &self,
        value: &InFrame<U>,
        epsilon: f64,
    ) -> Result<InFrame<U>> {
        if value.frame() != self.from {
            return Err(Error::FrameMismatch {
                left: self.from,
                right: value.frame(),
            });
        }

        value
            .inner
            .transformed_by(&self.inner, epsilon)
            .map(|inner| InFrame::new(self.to, inner))
            .ok_or(Error::NonPlanarTransform {
                from: self.from,
                to: self.to,
            })
    }
}

impl<T: fmt::Display> fmt::Display for BetweenFrames<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.inner, self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use nalgebra::Translation3;

    use super::*;
    use crate::tree::FrameTree;

    fn tree() -> (FrameTree, FrameId, FrameId) {
        let mut tree = FrameTree::new();
        let world = tree.world();
        let robot = tree
            .create_frame(
                "robot",
                world,
                Isometry3::new(Vector3::new(1.0, 2.0, 0.5), Vector3::z() * FRAC_PI_2),
            )
            .unwrap();
        let tilted = tree
            .create_frame(
                "tilted",
                world,
                Isometry3::new(Vector3::zeros(), Vector3::x() * FRAC_PI_2),
            )
            .unwrap();

        (tree, robot, tilted)
    }

    #[test]
    fn planar_projection_drops_height() {
        let isometry = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let planar = planar(&isometry, 1e-9).unwrap();

        assert_eq!(planar.translation.vector, Vector2::new(1.0, 2.0));
        assert!((planar.rotation.angle() - FRAC_PI_2).abs() < 1e-12);

        let flipped = Isometry3::new(Vector3::zeros(), Vector3::x() * std::f64::consts::PI);
        assert!(super::planar(&flipped, 1e-9).is_none());
    }

    #[test]
    fn planar_values_follow_yaw() {
        let (tree, robot, tilted) = tree();
        let to_world = tree.transform(robot, tree.world()).unwrap();

        let point = InFrame::new(robot, Point2::new(1.0, 0.0));
        let in_world = to_world.transform(&point).unwrap();
        assert!((in_world.inner - Point2::new(1.0, 3.0)).norm() < 1e-12);

        let heading = InFrame::new(robot, UnitComplex::new(0.0));
        let in_world = to_world.transform(&heading).unwrap();
        assert!((in_world.inner.angle() - FRAC_PI_2).abs() < 1e-12);

        let through_tilt = tree.transform(tilted, tree.world()).unwrap();
        assert!(matches!(
            through_tilt.transform(&InFrame::new(tilted, Vector2::x())),
            Err(Error::NonPlanarTransform { .. })
        ));
    }

    #[test]
    fn transform_checks_source_frame() {
        let (tree, robot, tilted) = tree();
        let transform = tree.transform(robot, tree.world()).unwrap();

        let elsewhere = InFrame::new(tilted, Point3::origin());
        assert!(matches!(
            transform.transform(&elsewhere),
            Err(Error::FrameMismatch { .. })
        ));

        let in_world = InFrame::new(tree.world(), Point3::new(1.0, 2.0, 0.5));
        let back = transform.inverse_transform(&in_world).unwrap();
        assert_eq!(back.frame(), robot);
        assert!(back.inner.coords.norm() < 1e-12);
    }

    #[test]
    fn chain_requires_matching_frames() {
        let (tree, robot, tilted) = tree();
        let robot_to_world = tree.transform(robot, tree.world()).unwrap();
        let world_to_tilted = tree.transform(tree.world(), tilted).unwrap();

        let chained = robot_to_world.chain(world_to_tilted).unwrap();
        let direct = tree.transform(robot, tilted).unwrap();
        assert_eq!(chained.from_frame(), robot);
        assert_eq!(chained.to_frame(), tilted);
        assert!((chained.inner.translation.vector - direct.inner.translation.vector).norm() < 1e-12);
        assert!(chained.inner.rotation.angle_to(&direct.inner.rotation) < 1e-12);

        assert!(matches!(
            world_to_tilted.chain(robot_to_world),
            Err(Error::FrameMismatch { .. })
        ));
    }

    #[test]
    fn shapes_and_rays_move_with_the_frame() {
        let (tree, robot, _) = tree();
        let to_world = tree.transform(robot, tree.world()).unwrap();

        let sphere: Shape = shape::Sphere::new(Point3::new(1.0, 0.0, 0.0), 0.5)
            .unwrap()
            .into();
        let in_world = to_world.transform(&InFrame::new(robot, sphere)).unwrap();
        let Shape::Sphere(sphere) = in_world.inner else {
            panic!("transforming a sphere must yield a sphere");
        };
        assert!((sphere.center() - Point3::new(1.0, 3.0, 0.5)).norm() < 1e-12);

        let ray = Ray::new(Point3::origin(), Vector3::x()).unwrap();
        let in_world = to_world.transform(&InFrame::new(robot, ray)).unwrap();
        assert!((in_world.inner.direction.into_inner() - Vector3::y()).norm() < 1e-12);
    }
}
