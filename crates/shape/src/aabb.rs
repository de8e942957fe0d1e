//! Axis-aligned bounding boxes.

use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box, given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Creates a box from two corners, in any order.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Creates a box from its center and (non-negative) half extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing all `points`, or `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;

        Some(points.fold(Self::new(*first, *first), |aabb, point| Self {
            min: aabb.min.inf(point),
            max: aabb.max.sup(point),
        }))
    }

    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Smallest box containing both `self` and `other`.
    #[must_use]
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grows the box by `margin` in every direction.
    #[must_use]
    pub fn loosened(&self, margin: f64) -> Aabb {
        let margin = Vector3::repeat(margin);
        Aabb::new(self.min - margin, self.max + margin)
    }

    #[must_use]
    pub fn contains_point(&self, point: &Point3<f64>, epsilon: f64) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] - epsilon && point[i] <= self.max[i] + epsilon)
    }

    /// Whether the two boxes overlap, touching boxes count as overlapping.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_spans_all_points() {
        let points = [
            Point3::new(1.0, -2.0, 0.5),
            Point3::new(-1.0, 3.0, 0.0),
            Point3::new(0.0, 0.0, 4.0),
        ];

        let aabb = Aabb::from_points(&points).unwrap();
        assert_eq!(aabb.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 3.0, 4.0));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn touching_boxes_intersect() {
        let a = Aabb::from_center(Point3::origin(), Vector3::repeat(1.0));
        let b = Aabb::from_center(Point3::new(2.0, 0.0, 0.0), Vector3::repeat(1.0));
        let c = Aabb::from_center(Point3::new(2.5, 0.0, 0.0), Vector3::repeat(1.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.merged(&c).contains_point(&Point3::new(3.4, 0.0, 0.0), 0.0));
    }
}
