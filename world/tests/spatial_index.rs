use std::collections::BTreeSet;

use conquer_core::Vec2;
use conquer_world::spatial::SpatialIndex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_position(rng: &mut ChaCha8Rng) -> Vec2 {
    Vec2::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0))
}

#[test]
fn radius_queries_match_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xdead_beef);
    let mut index = SpatialIndex::new(3.0);
    let mut positions = Vec::new();

    for key in 0..400u32 {
        let position = random_position(&mut rng);
        index.insert(key, position);
        positions.push(position);
    }

    for key in (0..400u32).step_by(3) {
        let position = random_position(&mut rng);
        assert!(index.update(key, position));
        positions[key as usize] = position;
    }

    for _ in 0..200 {
        let center = random_position(&mut rng);
        let radius = rng.gen_range(0.0..15.0);

        let expected: BTreeSet<u32> = positions
            .iter()
            .enumerate()
            .filter(|(_, position)| position.distance(center) <= radius)
            .map(|(key, _)| key as u32)
            .collect();
        let actual: BTreeSet<u32> = index
            .query_radius(center, radius)
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        assert_eq!(actual, expected);
    }
}

#[test]
fn reported_distances_are_exact() {
    let mut index = SpatialIndex::new(2.0);
    index.insert(1u32, Vec2::new(3.0, 4.0));

    let hits = index.query_radius(Vec2::ZERO, 5.0);
    assert_eq!(hits.len(), 1);
    assert!((hits[0].1 - 5.0).abs() < 1e-6);
}

#[test]
fn removed_handles_never_resurface() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut index = SpatialIndex::new(4.0);
    for key in 0..50u32 {
        index.insert(key, random_position(&mut rng));
    }
    for key in (0..50u32).filter(|key| key % 2 == 0) {
        assert!(index.remove(key));
    }

    let hits = index.query_radius(Vec2::ZERO, 100.0);
    assert_eq!(hits.len(), 25);
    assert!(hits.iter().all(|(key, _)| key % 2 == 1));
}
