//! Shape queries on frame-tagged shapes.
//!
//! The second operand of every query is expressed in the frame of the shape before the query runs,
//! and all results are expressed in the frame of the shape.

use nalgebra::Point3;
use shape::{Aabb, Penetration, PointContact, PointQuery, Ray, RayCast, RayHit, Shape};

use crate::error::Result;
use crate::space::InFrame;
use crate::tree::FrameTree;

impl InFrame<Shape> {
    /// Closest point and surface normal on the shape to `point`.
    pub fn point_contact(
        &self,
        tree: &FrameTree,
        point: &InFrame<Point3<f64>>,
    ) -> Result<InFrame<PointContact>> {
        let local = point.expressed_in(tree, self.frame())?;
        Ok(InFrame::new(self.frame(), self.inner.point_contact(&local.inner)))
    }

    pub fn closest_point_to(
        &self,
        tree: &FrameTree,
        point: &InFrame<Point3<f64>>,
    ) -> Result<InFrame<Point3<f64>>> {
        Ok(self.point_contact(tree, point)?.map(|contact| contact.closest))
    }

    /// Signed distance from `point` to the shape, negative inside.
    pub fn signed_distance_to(&self, tree: &FrameTree, point: &InFrame<Point3<f64>>) -> Result<f64> {
        Ok(self.point_contact(tree, point)?.signed_distance)
    }

    /// Whether `point` lies inside the shape or within `epsilon` of its boundary.
    pub fn contains(
        &self,
        tree: &FrameTree,
        point: &InFrame<Point3<f64>>,
        epsilon: f64,
    ) -> Result<bool> {
        let local = point.expressed_in(tree, self.frame())?;
        Ok(self.inner.contains(&local.inner, epsilon))
    }

    pub fn intersects(&self, tree: &FrameTree, other: &InFrame<Shape>) -> Result<bool> {
        let other = other.expressed_in(tree, self.frame())?;
        Ok(shape::intersects(&self.inner, &other.inner)?)
    }

    /// Penetration of `other` into this shape, with the normal pointing from this shape into
    /// `other`.
    pub fn penetration(
        &self,
        tree: &FrameTree,
        other: &InFrame<Shape>,
    ) -> Result<Option<InFrame<Penetration>>> {
        let other = other.expressed_in(tree, self.frame())?;
        Ok(shape::penetration(&self.inner, &other.inner)?
            .map(|penetration| InFrame::new(self.frame(), penetration)))
    }

    pub fn ray_cast(&self, tree: &FrameTree, ray: &InFrame<Ray>) -> Result<Option<InFrame<RayHit>>> {
        let ray = ray.expressed_in(tree, self.frame())?;
        Ok(self
            .inner
            .ray_cast(&ray.inner)
            .map(|hit| InFrame::new(self.frame(), hit)))
    }

    /// Axis-aligned bounding box in the frame of the shape.
    #[must_use]
    pub fn bounding_box(&self) -> InFrame<Aabb> {
        InFrame::new(self.frame(), self.inner.bounding_box())
    }
}
