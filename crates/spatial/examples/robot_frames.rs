//! Builds a small robot frame tree and queries geometry across its frames.
//!
//! Run with `RUST_LOG=spatial=trace` to see the tree changes and cache recomputations.

use std::f64::consts::FRAC_PI_2;

use nalgebra::{Isometry3, Point3, Vector3};
use shape::{Cuboid, Ray, Sphere};
use spatial::{FrameTree, InFrame};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut tree = FrameTree::new();
    let world = tree.world();
    let robot = tree.create_frame("robot", world, Isometry3::translation(1.0, 0.0, 0.0))?;
    let head = tree.create_frame("head", robot, Isometry3::translation(0.0, 0.0, 0.5))?;
    let camera = tree.create_frame(
        "camera",
        head,
        Isometry3::new(Vector3::new(0.05, 0.0, 0.0), Vector3::z() * FRAC_PI_2),
    )?;

    let goal_post: shape::Shape = Cuboid::new(
        Isometry3::translation(4.5, 0.0, 0.4),
        Vector3::new(0.05, 0.05, 0.4),
    )?
    .into();
    let goal_post = InFrame::new(world, goal_post);

    let ball: shape::Shape = Sphere::new(Point3::new(0.0, -2.0, -0.4), 0.05)?.into();
    let ball = InFrame::new(camera, ball);

    let ball_in_world = ball.expressed_in(&tree, world)?;
    info!(?ball_in_world, "ball seen by the camera");

    let view = InFrame::new(camera, Ray::new(Point3::origin(), Vector3::new(0.0, -1.0, 0.0))?);
    match goal_post.ray_cast(&tree, &view)? {
        Some(hit) => info!(distance = hit.distance, point = ?hit.point, "camera looks at the goal post"),
        None => info!("camera does not look at the goal post"),
    }

    let camera_origin = InFrame::new(camera, Point3::origin());
    let clearance = goal_post.signed_distance_to(&tree, &camera_origin)?;
    info!(clearance, "distance from camera to goal post");

    // The robot turns around, everything below it follows.
    tree.set_transform_to_parent(
        robot,
        Isometry3::new(Vector3::new(1.0, 0.0, 0.0), Vector3::z() * std::f64::consts::PI),
    )?;
    let ball_in_world = ball.expressed_in(&tree, world)?;
    info!(?ball_in_world, "ball after the robot turned");

    let collides = goal_post.intersects(&tree, &ball)?;
    info!(collides, "ball against goal post");

    Ok(())
}
