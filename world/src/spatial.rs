//! Uniform spatial hash used for proximity queries.

use std::hash::Hash;

use conquer_core::Vec2;
use fnv::FnvHashMap;

type BucketKey = (i32, i32);

#[derive(Clone, Copy, Debug)]
struct Entry {
    position: Vec2,
    bucket: BucketKey,
}

/// Spatial hash keyed by `floor(x / cell_size), floor(y / cell_size)`.
///
/// The index stores handles, not entities: callers own entity lifetime and
/// keep bucket membership current through [`SpatialIndex::update`]. Buckets
/// that become empty are dropped immediately.
#[derive(Clone, Debug)]
pub struct SpatialIndex<K> {
    cell_size: f32,
    buckets: FnvHashMap<BucketKey, Vec<K>>,
    entries: FnvHashMap<K, Entry>,
}

impl<K> SpatialIndex<K>
where
    K: Copy + Eq + Hash + Ord,
{
    /// Creates an empty index. Non-positive or non-finite cell sizes fall back to `1.0`.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            buckets: FnvHashMap::default(),
            entries: FnvHashMap::default(),
        }
    }

    /// Side length of a bucket in world units.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of indexed handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the index holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Last position recorded for a handle.
    #[must_use]
    pub fn position(&self, key: K) -> Option<Vec2> {
        self.entries.get(&key).map(|entry| entry.position)
    }

    /// Adds a handle at a position, or moves it if it is already indexed.
    pub fn insert(&mut self, key: K, position: Vec2) {
        if self.entries.contains_key(&key) {
            let _ = self.update(key, position);
            return;
        }

        let bucket = self.bucket_key(position);
        self.buckets.entry(bucket).or_default().push(key);
        let _ = self.entries.insert(key, Entry { position, bucket });
    }

    /// Removes a handle, returning whether it was indexed.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(entry) = self.entries.remove(&key) else {
            return false;
        };
        self.detach(key, entry.bucket);
        true
    }

    /// Records a new position for a handle, moving it between buckets only when needed.
    ///
    /// Returns `false` when the handle is not indexed.
    pub fn update(&mut self, key: K, position: Vec2) -> bool {
        let bucket = self.bucket_key(position);
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };

        entry.position = position;
        if entry.bucket == bucket {
            return true;
        }

        let previous = std::mem::replace(&mut entry.bucket, bucket);
        self.detach(key, previous);
        self.buckets.entry(bucket).or_default().push(key);
        true
    }

    /// Collects handles whose distance to `center` is at most `radius`.
    ///
    /// Only buckets overlapping the query square are scanned. Results are
    /// written into `out` (cleared first) as `(handle, distance)` pairs sorted
    /// by handle so callers iterate in a stable order.
    pub fn query_radius_into(&self, center: Vec2, radius: f32, out: &mut Vec<(K, f32)>) {
        out.clear();
        if !radius.is_finite() || radius < 0.0 || !center.is_finite() {
            return;
        }

        let (min_x, min_y) = self.bucket_key(center - Vec2::splat(radius));
        let (max_x, max_y) = self.bucket_key(center + Vec2::splat(radius));

        for bucket_x in min_x..=max_x {
            for bucket_y in min_y..=max_y {
                let Some(bucket) = self.buckets.get(&(bucket_x, bucket_y)) else {
                    continue;
                };

                for key in bucket {
                    let Some(entry) = self.entries.get(key) else {
                        continue;
                    };
                    let distance = entry.position.distance(center);
                    if distance <= radius {
                        out.push((*key, distance));
                    }
                }
            }
        }

        out.sort_unstable_by(|left, right| left.0.cmp(&right.0));
    }

    /// Allocating variant of [`SpatialIndex::query_radius_into`].
    #[must_use]
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<(K, f32)> {
        let mut out = Vec::new();
        self.query_radius_into(center, radius, &mut out);
        out
    }

    /// Removes every handle.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
    }

    fn detach(&mut self, key: K, bucket: BucketKey) {
        let now_empty = match self.buckets.get_mut(&bucket) {
            Some(members) => {
                members.retain(|member| *member != key);
                members.is_empty()
            }
            None => false,
        };

        if now_empty {
            let _ = self.buckets.remove(&bucket);
        }
    }

    fn bucket_key(&self, position: Vec2) -> BucketKey {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_within_bucket_keeps_membership() {
        let mut index = SpatialIndex::new(4.0);
        index.insert(1u32, Vec2::new(1.0, 1.0));

        assert!(index.update(1, Vec2::new(3.0, 2.0)));
        assert_eq!(index.bucket_count(), 1);
        assert_eq!(index.position(1), Some(Vec2::new(3.0, 2.0)));
    }

    #[test]
    fn moving_out_of_bucket_prunes_the_old_one() {
        let mut index = SpatialIndex::new(4.0);
        index.insert(1u32, Vec2::new(1.0, 1.0));

        assert!(index.update(1, Vec2::new(9.0, 1.0)));
        assert_eq!(index.bucket_count(), 1);
        assert_eq!(index.query_radius(Vec2::new(9.0, 1.0), 0.5), vec![(1, 0.0)]);
        assert!(index.query_radius(Vec2::new(1.0, 1.0), 0.5).is_empty());
    }

    #[test]
    fn removal_prunes_empty_buckets() {
        let mut index = SpatialIndex::new(2.0);
        index.insert(1u32, Vec2::new(0.5, 0.5));
        index.insert(2u32, Vec2::new(10.5, 0.5));

        assert!(index.remove(1));
        assert!(!index.remove(1));
        assert_eq!(index.bucket_count(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let mut index = SpatialIndex::new(1.0);
        index.insert(7u32, Vec2::new(3.0, 0.0));

        assert_eq!(index.query_radius(Vec2::ZERO, 3.0).len(), 1);
        assert!(index.query_radius(Vec2::ZERO, 2.99).is_empty());
        assert!(index.query_radius(Vec2::ZERO, f32::NAN).is_empty());
    }

    #[test]
    fn negative_coordinates_hash_into_distinct_buckets() {
        let mut index = SpatialIndex::new(2.0);
        index.insert(1u32, Vec2::new(-0.5, -0.5));
        index.insert(2u32, Vec2::new(0.5, 0.5));

        assert_eq!(index.bucket_count(), 2);
        let found: Vec<u32> = index
            .query_radius(Vec2::ZERO, 1.0)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(found, vec![1, 2]);
    }
}
