use std::sync::{Arc, PoisonError, RwLock};
use std::thread;

use nalgebra::{Isometry3, Point3, Vector3};
use rand::{Rng, SeedableRng, rngs::StdRng};
use spatial::{Error, FrameId, FrameTree, InFrame, SharedFrameTree};

fn random_isometry(rng: &mut StdRng) -> Isometry3<f64> {
    let mut vector = || {
        Vector3::new(
            rng.random_range(-2.0..2.0),
            rng.random_range(-2.0..2.0),
            rng.random_range(-2.0..2.0),
        )
    };
    let translation = vector();
    let rotation = vector();

    Isometry3::new(translation, rotation)
}

/// A tree with `count` frames below the world frame, each attached to a random earlier frame.
fn random_tree(rng: &mut StdRng, count: usize) -> (FrameTree, Vec<FrameId>) {
    let mut tree = FrameTree::new();
    let mut frames = vec![tree.world()];

    for index in 0..count {
        let parent = frames[rng.random_range(0..frames.len())];
        let transform = random_isometry(rng);
        frames.push(
            tree.create_frame(format!("frame_{index}"), parent, transform)
                .unwrap(),
        );
    }

    (tree, frames)
}

fn is_identity(isometry: &Isometry3<f64>, epsilon: f64) -> bool {
    isometry.translation.vector.norm() < epsilon && isometry.rotation.imag().norm() < epsilon
}

/// Parent and root transform of every frame, to detect any change to the tree.
fn snapshot(tree: &FrameTree) -> Vec<(FrameId, Option<FrameId>, Isometry3<f64>)> {
    tree.iter()
        .map(|frame| {
            (
                frame,
                tree.parent(frame).unwrap(),
                tree.transform_to_root(frame).unwrap(),
            )
        })
        .collect()
}

#[test]
fn sensor_origin_in_world() {
    let mut tree = FrameTree::new();
    let world = tree.world();
    assert_eq!(tree.name(world).unwrap(), "world");

    let robot = tree
        .create_frame("robot", world, Isometry3::translation(1.0, 0.0, 0.0))
        .unwrap();
    let sensor = tree
        .create_frame("sensor", robot, Isometry3::translation(0.0, 1.0, 0.0))
        .unwrap();

    let origin = InFrame::new(sensor, Point3::origin());
    let in_world = tree.transform(sensor, world).unwrap().transform(&origin).unwrap();

    assert_eq!(in_world.frame(), world);
    assert!((in_world.inner - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-9);
}

#[test]
fn transform_to_itself_is_identity() {
    let mut rng = StdRng::seed_from_u64(1);
    let (tree, frames) = random_tree(&mut rng, 40);

    for frame in frames {
        assert_eq!(
            tree.transform(frame, frame).unwrap().inner,
            Isometry3::identity()
        );
    }
}

#[test]
fn transform_and_its_reverse_compose_to_identity() {
    let mut rng = StdRng::seed_from_u64(2);
    let (tree, frames) = random_tree(&mut rng, 25);

    for &a in &frames {
        for &b in &frames {
            let there = tree.transform(a, b).unwrap();
            let back = tree.transform(b, a).unwrap();
            let round_trip = there.chain(back).unwrap();

            assert_eq!(round_trip.from_frame(), a);
            assert_eq!(round_trip.to_frame(), a);
            assert!(is_identity(&round_trip.inner, 1e-9), "{a} -> {b}");
        }
    }
}

#[test]
fn transform_matches_chain_through_world() {
    let mut rng = StdRng::seed_from_u64(3);
    let (tree, frames) = random_tree(&mut rng, 25);
    let world = tree.world();

    for _ in 0..200 {
        let a = frames[rng.random_range(0..frames.len())];
        let b = frames[rng.random_range(0..frames.len())];

        let direct = tree.transform(a, b).unwrap();
        let via_world = tree
            .transform(a, world)
            .unwrap()
            .chain(tree.transform(world, b).unwrap())
            .unwrap();

        assert!(is_identity(&direct.inner.inv_mul(&via_world.inner), 1e-9));
    }
}

#[test]
fn cycles_are_rejected_without_changes() {
    let mut rng = StdRng::seed_from_u64(4);
    let (mut tree, frames) = random_tree(&mut rng, 30);
    let mut rejected = 0;

    for _ in 0..300 {
        let frame = frames[rng.random_range(1..frames.len())];
        let new_parent = frames[rng.random_range(0..frames.len())];
        let transform = random_isometry(&mut rng);

        let creates_cycle =
            frame == new_parent || tree.is_ancestor(frame, new_parent).unwrap();
        let before = snapshot(&tree);

        match tree.reparent(frame, new_parent, transform) {
            Err(Error::Cycle { .. }) => {
                assert!(creates_cycle);
                assert_eq!(snapshot(&tree), before);
                rejected += 1;
            }
            Ok(()) => {
                assert!(!creates_cycle);
                assert_eq!(tree.parent(frame).unwrap(), Some(new_parent));
                assert_eq!(tree.transform_to_parent(frame).unwrap(), transform);
            }
            Err(error) => panic!("unexpected error: {error}"),
        }

        // Every frame still reaches the world frame.
        for &frame in &frames {
            assert_eq!(
                tree.lowest_common_ancestor(frame, tree.world()).unwrap(),
                tree.world()
            );
        }
    }

    assert!(rejected > 0);
}

#[test]
fn mixing_frames_requires_expressed_in() {
    let mut rng = StdRng::seed_from_u64(5);
    let (tree, frames) = random_tree(&mut rng, 15);

    for &a in &frames {
        for &b in &frames {
            if a == b {
                continue;
            }

            let p = InFrame::new(a, Point3::new(0.5, -0.25, 1.0));
            let q = InFrame::new(b, Point3::new(-1.0, 0.75, 0.0));

            assert!(matches!(p.distance(&q), Err(Error::FrameMismatch { .. })));
            assert!(matches!(p.sub(&q), Err(Error::FrameMismatch { .. })));

            // Whichever frame the points meet in, they are equally far apart.
            let in_a = p.distance(&q.expressed_in(&tree, a).unwrap()).unwrap();
            let in_b = p.expressed_in(&tree, b).unwrap().distance(&q).unwrap();
            let lca = tree.lowest_common_ancestor(a, b).unwrap();
            let in_lca = p
                .expressed_in(&tree, lca)
                .unwrap()
                .distance(&q.expressed_in(&tree, lca).unwrap())
                .unwrap();

            assert!((in_a - in_b).abs() < 1e-9);
            assert!((in_a - in_lca).abs() < 1e-9);
        }
    }
}

#[test]
fn reparenting_invalidates_cached_transforms() {
    let mut tree = FrameTree::new();
    let world = tree.world();
    let a = tree
        .create_frame("a", world, Isometry3::translation(1.0, 0.0, 0.0))
        .unwrap();
    let b = tree
        .create_frame("b", world, Isometry3::translation(0.0, 1.0, 0.0))
        .unwrap();
    let leaf = tree
        .create_frame("leaf", a, Isometry3::translation(0.0, 0.0, 1.0))
        .unwrap();

    let origin = InFrame::new(leaf, Point3::origin());
    let before = origin.expressed_in(&tree, world).unwrap();
    assert!((before.inner - Point3::new(1.0, 0.0, 1.0)).norm() < 1e-12);

    tree.reparent(a, b, Isometry3::translation(2.0, 0.0, 0.0))
        .unwrap();
    let after = origin.expressed_in(&tree, world).unwrap();
    assert!((after.inner - Point3::new(2.0, 1.0, 1.0)).norm() < 1e-12);

    tree.set_transform_to_parent(b, Isometry3::identity())
        .unwrap();
    let moved = origin.expressed_in(&tree, world).unwrap();
    assert!((moved.inner - Point3::new(2.0, 0.0, 1.0)).norm() < 1e-12);
}

#[test]
fn removed_frames_are_stale() {
    let mut tree = FrameTree::new();
    let world = tree.world();
    let arm = tree
        .create_frame("arm", world, Isometry3::identity())
        .unwrap();
    let hand = tree
        .create_frame("hand", arm, Isometry3::identity())
        .unwrap();
    let grasp = InFrame::new(hand, Point3::origin());

    tree.remove_frame(arm).unwrap();
    tree.create_frame("arm", world, Isometry3::identity())
        .unwrap();
    tree.create_frame("hand", world, Isometry3::identity())
        .unwrap();

    assert!(matches!(
        grasp.expressed_in(&tree, world),
        Err(Error::StaleFrameReference(_))
    ));
    assert!(!tree.contains(hand));
}

#[test]
fn concurrent_readers() {
    let mut rng = StdRng::seed_from_u64(6);
    let (tree, frames) = random_tree(&mut rng, 50);
    let tree = &tree;
    let frames = &frames;

    thread::scope(|scope| {
        for seed in 0..4 {
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(100 + seed);
                for _ in 0..500 {
                    let a = frames[rng.random_range(0..frames.len())];
                    let b = frames[rng.random_range(0..frames.len())];
                    let round_trip = tree
                        .transform(a, b)
                        .unwrap()
                        .chain(tree.transform(b, a).unwrap())
                        .unwrap();

                    assert!(is_identity(&round_trip.inner, 1e-9));
                }
            });
        }
    });
}

#[test]
fn shared_tree_with_a_single_writer() {
    let mut rng = StdRng::seed_from_u64(7);
    let (tree, frames) = random_tree(&mut rng, 20);
    let shared: SharedFrameTree = Arc::new(RwLock::new(tree));
    let frames = &frames;

    thread::scope(|scope| {
        let writer = Arc::clone(&shared);
        scope.spawn(move || {
            let mut rng = StdRng::seed_from_u64(8);
            for _ in 0..200 {
                let frame = frames[rng.random_range(1..frames.len())];
                let transform = random_isometry(&mut rng);
                writer
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_transform_to_parent(frame, transform)
                    .unwrap();
            }
        });

        for seed in 0..3 {
            let reader = Arc::clone(&shared);
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(200 + seed);
                for _ in 0..200 {
                    let a = frames[rng.random_range(0..frames.len())];
                    let b = frames[rng.random_range(0..frames.len())];

                    let tree = reader.read().unwrap_or_else(PoisonError::into_inner);
                    let round_trip = tree
                        .transform(a, b)
                        .unwrap()
                        .chain(tree.transform(b, a).unwrap())
                        .unwrap();
                    assert!(is_identity(&round_trip.inner, 1e-9));
                }
            });
        }
    });
}
