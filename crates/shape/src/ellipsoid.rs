use nalgebra::{Isometry3, Point3, Unit, Vector3};

use crate::{
    Aabb, PointContact, PointQuery, Result, ShapeKind,
    ray::{self, Ray, RayCast, RayHit},
    tools,
};

/// Bisection steps needed to exhaust the precision of an `f64`.
const MAX_BISECTION_STEPS: u32 = f64::MANTISSA_DIGITS + f64::MIN_EXP.unsigned_abs();

/// An ellipsoid centered on its pose, with its semi-axes along the local axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pose: Isometry3<f64>,
    radii: Vector3<f64>,
}

impl Ellipsoid {
    /// # Errors
    ///
    /// Fails when the pose is not finite or a radius is not strictly positive.
    pub fn new(pose: Isometry3<f64>, radii: Vector3<f64>) -> Result<Self> {
        tools::check_finite_pose(ShapeKind::Ellipsoid, &pose)?;
        for (name, value) in ["x", "y", "z"].into_iter().zip(radii.iter()) {
            tools::check_positive(ShapeKind::Ellipsoid, &format!("radius {name}"), *value)?;
        }

        Ok(Self { pose, radii })
    }

    #[must_use]
    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    #[must_use]
    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }

    #[must_use]
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        Self {
            pose: isometry * self.pose,
            radii: self.radii,
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        let rotation = self.pose.rotation.to_rotation_matrix();
        let scaled = rotation.matrix() * nalgebra::Matrix3::from_diagonal(&self.radii);
        let extents = Vector3::from_fn(|i, _| scaled.row(i).norm());

        Aabb::from_center(self.pose.translation.vector.into(), extents)
    }

    fn local_contact(&self, query: &Point3<f64>) -> PointContact {
        // Solve in the first octant with the radii sorted in decreasing order.
        let mut order = [0, 1, 2];
        order.sort_by(|a, b| self.radii[*b].total_cmp(&self.radii[*a]));

        let e = order.map(|i| self.radii[i]);
        let y = order.map(|i| query[i].abs());
        let x = closest_in_first_octant(e, y);

        let mut closest = Point3::origin();
        let mut gradient = Vector3::zeros();
        for (k, i) in order.into_iter().enumerate() {
            closest[i] = x[k].copysign(query[i]);
            gradient[i] = closest[i] / (e[k] * e[k]);
        }

        let inside = (query.coords.component_div(&self.radii)).norm_squared() <= 1.0;
        let distance = (query - closest).norm();
        let normal = Unit::try_new(gradient, 0.0).unwrap_or_else(Vector3::z_axis);

        PointContact {
            closest,
            normal,
            signed_distance: if inside { -distance } else { distance },
        }
    }
}

/// Closest point on the ellipsoid with semi-axes `e[0] >= e[1] >= e[2] > 0` to the query
/// `y` with non-negative coordinates.
fn closest_in_first_octant(e: [f64; 3], y: [f64; 3]) -> [f64; 3] {
    if y[2] > 0.0 {
        if y[1] > 0.0 {
            if y[0] > 0.0 {
                let z = [y[0] / e[0], y[1] / e[1], y[2] / e[2]];
                let g = z[0] * z[0] + z[1] * z[1] + z[2] * z[2] - 1.0;

                if g == 0.0 {
                    return y;
                }

                let r = [(e[0] / e[2]).powi(2), (e[1] / e[2]).powi(2)];
                let s = ellipsoid_root(r, z, g);
                return [r[0] * y[0] / (s + r[0]), r[1] * y[1] / (s + r[1]), y[2] / (s + 1.0)];
            }

            let [x1, x2] = closest_on_ellipse([e[1], e[2]], [y[1], y[2]]);
            return [0.0, x1, x2];
        }

        if y[0] > 0.0 {
            let [x0, x2] = closest_on_ellipse([e[0], e[2]], [y[0], y[2]]);
            return [x0, 0.0, x2];
        }

        return [0.0, 0.0, e[2]];
    }

    // The query lies in the plane of the two largest axes. It may still be closest to a point
    // off that plane when it sits inside the evolute of the ellipsoid.
    let denominators = [e[0] * e[0] - e[2] * e[2], e[1] * e[1] - e[2] * e[2]];
    let numerators = [e[0] * y[0], e[1] * y[1]];

    if numerators[0] < denominators[0] && numerators[1] < denominators[1] {
        let ratios = [numerators[0] / denominators[0], numerators[1] / denominators[1]];
        let remainder = 1.0 - ratios[0] * ratios[0] - ratios[1] * ratios[1];

        if remainder > 0.0 {
            return [e[0] * ratios[0], e[1] * ratios[1], e[2] * remainder.sqrt()];
        }
    }

    let [x0, x1] = closest_on_ellipse([e[0], e[1]], [y[0], y[1]]);
    [x0, x1, 0.0]
}

/// Closest point on the ellipse with semi-axes `e[0] >= e[1] > 0` to the query `y` with
/// non-negative coordinates.
fn closest_on_ellipse(e: [f64; 2], y: [f64; 2]) -> [f64; 2] {
    if y[1] > 0.0 {
        if y[0] > 0.0 {
            let z = [y[0] / e[0], y[1] / e[1]];
            let g = z[0] * z[0] + z[1] * z[1] - 1.0;

            if g == 0.0 {
                return y;
            }

            let r = (e[0] / e[1]).powi(2);
            let s = ellipse_root(r, z, g);
            return [r * y[0] / (s + r), y[1] / (s + 1.0)];
        }

        return [0.0, e[1]];
    }

    let numerator = e[0] * y[0];
    let denominator = e[0] * e[0] - e[1] * e[1];
    if numerator < denominator {
        let ratio = numerator / denominator;
        [e[0] * ratio, e[1] * (1.0 - ratio * ratio).sqrt()]
    } else {
        [e[0], 0.0]
    }
}

/// Root of `(r z0 / (s + r))^2 + (z1 / (s + 1))^2 - 1` by bisection.
fn ellipse_root(r: f64, z: [f64; 2], g: f64) -> f64 {
    let n = r * z[0];
    let mut low = z[1] - 1.0;
    let mut high = if g < 0.0 { 0.0 } else { n.hypot(z[1]) - 1.0 };

    bisect(&mut low, &mut high, |s| {
        (n / (s + r)).powi(2) + (z[1] / (s + 1.0)).powi(2) - 1.0
    })
}

/// Root of `sum_i (r_i z_i / (s + r_i))^2 - 1` with `r_2 = 1`, by bisection.
fn ellipsoid_root(r: [f64; 2], z: [f64; 3], g: f64) -> f64 {
    let n = [r[0] * z[0], r[1] * z[1]];
    let mut low = z[2] - 1.0;
    let mut high = if g < 0.0 {
        0.0
    } else {
        Vector3::new(n[0], n[1], z[2]).norm() - 1.0
    };

    bisect(&mut low, &mut high, |s| {
        (n[0] / (s + r[0])).powi(2) + (n[1] / (s + r[1])).powi(2) + (z[2] / (s + 1.0)).powi(2)
            - 1.0
    })
}

/// Bisects a decreasing function on `[low, high]` until the interval stops shrinking.
fn bisect(low: &mut f64, high: &mut f64, function: impl Fn(f64) -> f64) -> f64 {
    let mut s = *low;

    for _ in 0..MAX_BISECTION_STEPS {
        s = 0.5 * (*low + *high);
        if s == *low || s == *high {
            break;
        }

        let value = function(s);
        if value > 0.0 {
            *low = s;
        } else if value < 0.0 {
            *high = s;
        } else {
            break;
        }
    }

    s
}

impl PointQuery for Ellipsoid {
    /// The closest point is exact, found by a bisection on the parameter of the normal line.
    ///
    /// A query at the center is closest to the pole of the smallest radius, on its positive side.
    fn point_contact(&self, point: &Point3<f64>) -> PointContact {
        let local = self.pose.inverse_transform_point(point);
        self.local_contact(&local).transformed(&self.pose)
    }
}

impl RayCast for Ellipsoid {
    fn ray_cast(&self, ray: &Ray) -> Option<RayHit> {
        if let Some(hit) = ray::hit_from_inside(self, ray) {
            return Some(hit);
        }

        // In coordinates scaled by the radii the ellipsoid is the unit sphere, and the ray
        // parameter is unchanged.
        let local = ray.to_local(&self.pose);
        let origin = local.origin.coords.component_div(&self.radii);
        let direction = local.direction.component_div(&self.radii);

        let a = direction.norm_squared();
        let b = origin.dot(&direction);
        let c = origin.norm_squared() - 1.0;
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let distance = (-b - discriminant.sqrt()) / a;
        (distance >= 0.0).then(|| ray::hit_on_surface(self, ray, distance))
    }
}
