//! Types for tagging data with the frame it is expressed in.

use std::fmt;
use std::ops::{Add, Deref, DerefMut, Mul, Sub};

use nalgebra::{
    Isometry2, Isometry3, Point2, Point3, Unit, UnitComplex, UnitQuaternion, Vector2, Vector3,
};

use crate::error::{Error, Result};
use crate::transform::Transformable;
use crate::tree::{FrameId, FrameTree};

/// Wrapper type for tagging a `T` as expressed in a frame.
///
/// Binary operations between two tagged values fail with [`Error::FrameMismatch`] unless both are
/// expressed in the same frame. Values never move between frames implicitly, use
/// [`InFrame::expressed_in`] to obtain a copy in another frame.
///
/// Operations without a [`FrameTree`] argument only compare frame handles, the caller guarantees
/// that the frame still exists. The `_in` forms, such as [`InFrame::zip_with_in`], also fail with
/// [`Error::StaleFrameReference`] once the frame was removed from the tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InFrame<T> {
    frame: FrameId,
    pub inner: T,
}

impl<T> InFrame<T> {
    pub const fn new(frame: FrameId, inner: T) -> Self {
        Self { frame, inner }
    }

    /// The frame this value is expressed in.
    #[must_use]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Maps the value, keeping its frame.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> InFrame<U> {
        InFrame::new(self.frame, f(self.inner))
    }

    pub fn as_ref(&self) -> InFrame<&T> {
        InFrame::new(self.frame, &self.inner)
    }

    /// Fails with [`Error::FrameMismatch`] unless `other` is expressed in the same frame.
    pub fn check_frame_match<U>(&self, other: &InFrame<U>) -> Result<()> {
        if self.frame == other.frame {
            Ok(())
        } else {
            Err(Error::FrameMismatch {
                left: self.frame,
                right: other.frame,
            })
        }
    }

    /// Like [`InFrame::check_frame_match`], but both frames must also still exist in `tree`.
    pub fn check_frame_match_in<U>(&self, tree: &FrameTree, other: &InFrame<U>) -> Result<()> {
        tree.check_alive(self.frame)?;
        tree.check_alive(other.frame)?;
        self.check_frame_match(other)
    }

    /// Combines two values expressed in the same frame.
    pub fn zip_with<U, V, F>(&self, other: &InFrame<U>, f: F) -> Result<InFrame<V>>
    where
        F: FnOnce(&T, &U) -> V,
    {
        self.check_frame_match(other)?;
        Ok(InFrame::new(self.frame, f(&self.inner, &other.inner)))
    }

    /// Like [`InFrame::zip_with`], failing with [`Error::StaleFrameReference`] when the frame was
    /// removed from `tree`.
    pub fn zip_with_in<U, V, F>(
        &self,
        tree: &FrameTree,
        other: &InFrame<U>,
        f: F,
    ) -> Result<InFrame<V>>
    where
        F: FnOnce(&T, &U) -> V,
    {
        self.check_frame_match_in(tree, other)?;
        Ok(InFrame::new(self.frame, f(&self.inner, &other.inner)))
    }

    /// Checks that the frame of this value still exists in `tree`.
    pub fn check_alive(&self, tree: &FrameTree) -> Result<()> {
        tree.check_alive(self.frame)
    }

    pub fn add<U>(&self, other: &InFrame<U>) -> Result<InFrame<<T as Add<U>>::Output>>
    where
        T: Add<U> + Clone,
        U: Clone,
    {
        self.zip_with(other, |a, b| a.clone() + b.clone())
    }

    pub fn sub<U>(&self, other: &InFrame<U>) -> Result<InFrame<<T as Sub<U>>::Output>>
    where
        T: Sub<U> + Clone,
        U: Clone,
    {
        self.zip_with(other, |a, b| a.clone() - b.clone())
    }

    /// Multiplies two values in the same frame, e.g. a pose applied to a point.
    pub fn mul<U>(&self, other: &InFrame<U>) -> Result<InFrame<<T as Mul<U>>::Output>>
    where
        T: Mul<U> + Clone,
        U: Clone,
    {
        self.zip_with(other, |a, b| a.clone() * b.clone())
    }
}

impl<T: Transformable> InFrame<T> {
    /// Expresses this value in `target`.
    ///
    /// The transform is resolved through `tree`, this value is left untouched.
    pub fn expressed_in(&self, tree: &FrameTree, target: FrameId) -> Result<Self> {
        tree.transform(self.frame, target)?
            .transform_with(self, tree.epsilon())
    }
}

impl<T: Interpolate> InFrame<T> {
    /// Interpolates between two values in the same frame, `t = 0` yields `self`.
    pub fn interpolate(&self, other: &Self, t: f64) -> Result<Self> {
        self.zip_with(other, |a, b| a.interpolate(b, t))
    }
}

impl<T: EpsilonEq> InFrame<T> {
    /// Compares two values in the same frame within `epsilon`.
    pub fn epsilon_eq(&self, other: &Self, epsilon: f64) -> Result<bool> {
        self.check_frame_match(other)?;
        Ok(self.inner.epsilon_eq(&other.inner, epsilon))
    }
}

macro_rules! impl_vector_ops {
    ($vector:ty) => {
        impl InFrame<$vector> {
            pub fn dot(&self, other: &Self) -> Result<f64> {
                self.check_frame_match(other)?;
                Ok(self.inner.dot(&other.inner))
            }

            #[must_use]
            pub fn norm(&self) -> f64 {
                self.inner.norm()
            }
        }
    };
}

impl_vector_ops!(Vector2<f64>);
impl_vector_ops!(Vector3<f64>);

impl InFrame<Vector3<f64>> {
    pub fn cross(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a.cross(b))
    }
}

macro_rules! impl_point_ops {
    ($point:ty) => {
        impl InFrame<$point> {
            pub fn distance(&self, other: &Self) -> Result<f64> {
                self.check_frame_match(other)?;
                Ok(nalgebra::distance(&self.inner, &other.inner))
            }

            /// Distance between two points whose frame must still exist in `tree`.
            pub fn distance_in(&self, tree: &FrameTree, other: &Self) -> Result<f64> {
                self.check_frame_match_in(tree, other)?;
                Ok(nalgebra::distance(&self.inner, &other.inner))
            }
        }
    };
}

impl_point_ops!(Point2<f64>);
impl_point_ops!(Point3<f64>);

/// Interpolation between two values of the same type.
pub trait Interpolate {
    fn interpolate(&self, other: &Self, t: f64) -> Self;
}

macro_rules! impl_interpolate {
    ($inner:ty, |$a:ident, $b:ident, $t:ident| $body:expr) => {
        impl Interpolate for $inner {
            fn interpolate(&self, other: &Self, $t: f64) -> Self {
                let ($a, $b) = (self, other);
                $body
            }
        }
    };
}

impl_interpolate!(Point2<f64>, |a, b, t| Point2::from(a.coords.lerp(&b.coords, t)));
impl_interpolate!(Point3<f64>, |a, b, t| Point3::from(a.coords.lerp(&b.coords, t)));
impl_interpolate!(Vector2<f64>, |a, b, t| a.lerp(b, t));
impl_interpolate!(Vector3<f64>, |a, b, t| a.lerp(b, t));
impl_interpolate!(UnitComplex<f64>, |a, b, t| a.slerp(b, t));
impl_interpolate!(UnitQuaternion<f64>, |a, b, t| a.slerp(b, t));
impl_interpolate!(Isometry2<f64>, |a, b, t| a.lerp_slerp(b, t));
impl_interpolate!(Isometry3<f64>, |a, b, t| a.lerp_slerp(b, t));

/// Equality within a tolerance, exact comparison is never meaningful for transformed values.
pub trait EpsilonEq {
    fn epsilon_eq(&self, other: &Self, epsilon: f64) -> bool;
}

macro_rules! impl_epsilon_eq {
    ($inner:ty, |$a:ident, $b:ident, $epsilon:ident| $body:expr) => {
        impl EpsilonEq for $inner {
            fn epsilon_eq(&self, other: &Self, $epsilon: f64) -> bool {
                let ($a, $b) = (self, other);
                $body
            }
        }
    };
}

impl_epsilon_eq!(f64, |a, b, epsilon| (a - b).abs() <= epsilon);
impl_epsilon_eq!(Point2<f64>, |a, b, epsilon| (a - b).norm() <= epsilon);
impl_epsilon_eq!(Point3<f64>, |a, b, epsilon| (a - b).norm() <= epsilon);
impl_epsilon_eq!(Vector2<f64>, |a, b, epsilon| (a - b).norm() <= epsilon);
impl_epsilon_eq!(Vector3<f64>, |a, b, epsilon| (a - b).norm() <= epsilon);
impl_epsilon_eq!(Unit<Vector3<f64>>, |a, b, epsilon| (a.into_inner() - b.into_inner()).norm() <= epsilon);
impl_epsilon_eq!(UnitComplex<f64>, |a, b, epsilon| a.angle_to(b).abs() <= epsilon);
impl_epsilon_eq!(UnitQuaternion<f64>, |a, b, epsilon| a.angle_to(b) <= epsilon);
impl_epsilon_eq!(Isometry2<f64>, |a, b, epsilon| {
    a.translation.vector.epsilon_eq(&b.translation.vector, epsilon)
        && a.rotation.epsilon_eq(&b.rotation, epsilon)
});
impl_epsilon_eq!(Isometry3<f64>, |a, b, epsilon| {
    a.translation.vector.epsilon_eq(&b.translation.vector, epsilon)
        && a.rotation.epsilon_eq(&b.rotation, epsilon)
});

impl<T: fmt::Debug> fmt::Debug for InFrame<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} in {}", self.inner, self.frame)
    }
}

impl<T> Deref for InFrame<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for InFrame<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
