//! Branch recursion generator
//!
//! Grows a skeleton from a `TreeConfig` and a seed:
//! - root segment along +Y from the origin
//! - each non-terminal segment spawns `branch_factor` children (optionally jittered)
//! - children deviate from the parent direction around two perpendicular axes
//! - a depth-scaled droop pulls branches toward -Y
//! - radius and length decay geometrically per level
//!
//! Children are grown depth-first, so the arena ends up in pre-order.

use crate::core::types::{Quat, Result, Vec3};

use super::config::{TreeConfig, MAX_BRANCH_FACTOR};
use super::rng::SimpleRng;
use super::skeleton::{transport_side, BranchSegment, LeafCluster, SegmentId, Skeleton, MIN_SEGMENT_LENGTH};

/// Build a skeleton. Identical `(config, seed)` always yields an identical skeleton.
///
/// The config is validated first; a rejected config never produces a partial tree.
pub fn build(config: &TreeConfig, seed: u64) -> Result<Skeleton> {
    if let Err(err) = config.validate() {
        log::warn!("Rejected tree config: {}", err);
        return Err(err);
    }

    let skeleton = BranchGenerator::new(config, seed).run();
    log::debug!(
        "Built skeleton: {} segments, {} leaf clusters, depth {} (seed {})",
        skeleton.len(),
        skeleton.leaf_clusters().count(),
        skeleton.max_depth(),
        seed
    );
    Ok(skeleton)
}

/// Recursion state: the config plus the seeded stream every choice draws from
struct BranchGenerator<'a> {
    config: &'a TreeConfig,
    rng: SimpleRng,
    seed: u64,
}

impl<'a> BranchGenerator<'a> {
    fn new(config: &'a TreeConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SimpleRng::new(seed),
            seed,
        }
    }

    fn run(mut self) -> Skeleton {
        let capacity = self.config.projected_segments().min(4096) as usize;
        let mut skeleton = Skeleton::with_capacity(self.seed, capacity);

        let length = self.config.initial_length.max(MIN_SEGMENT_LENGTH);
        let root = skeleton.push(BranchSegment {
            start: Vec3::ZERO,
            end: Vec3::Y * length,
            radius: self.config.initial_radius,
            parent_radius: self.config.initial_radius * self.config.root_flare,
            depth: 0,
            parent: None,
            children: Vec::new(),
            leaf: None,
        });

        self.grow(&mut skeleton, root, Vec3::Y, Vec3::X, length);
        skeleton
    }

    /// A segment stops branching at the depth ceiling or once it is thinner
    /// than `min_radius`. Children below the threshold are still spawned and
    /// end up terminal themselves.
    fn is_terminal(&self, depth: u32, radius: f32) -> bool {
        depth >= self.config.max_depth || radius < self.config.min_radius
    }

    fn child_count(&mut self) -> u32 {
        let factor = self.config.branch_factor;
        let jitter = self.config.branch_jitter;
        if factor == 0 {
            return 0;
        }
        if jitter == 0 {
            return factor;
        }
        self.rng
            .range_u32(factor.saturating_sub(jitter), factor + jitter)
            .clamp(1, MAX_BRANCH_FACTOR)
    }

    fn grow(&mut self, skeleton: &mut Skeleton, id: SegmentId, direction: Vec3, side: Vec3, length: f32) {
        let (depth, radius, end) = match skeleton.get(id) {
            Some(segment) => (segment.depth, segment.radius, segment.end),
            None => return,
        };

        let count = if self.is_terminal(depth, radius) { 0 } else { self.child_count() };
        if count == 0 {
            self.attach_leaves(skeleton, id, direction, depth);
            return;
        }

        let binormal = direction.cross(side);
        let child_depth = depth + 1;
        let child_radius = radius * self.config.radius_decay;
        let child_length = (length * self.config.length_decay).max(MIN_SEGMENT_LENGTH);
        let droop = self.config.droop * child_depth as f32 / self.config.max_depth as f32;

        for _ in 0..count {
            let a = self.rng.symmetric(self.config.angle_spread);
            let b = self.rng.symmetric(self.config.angle_spread);
            let deviated = Quat::from_axis_angle(side, a) * Quat::from_axis_angle(binormal, b) * direction;
            let child_direction = (deviated + Vec3::NEG_Y * droop)
                .try_normalize()
                .unwrap_or(deviated);

            assert!(
                child_direction.is_finite() && child_direction.length_squared() > 0.5,
                "branch direction degenerated at depth {child_depth}: {child_direction:?}"
            );

            let child = skeleton.push(BranchSegment {
                start: end,
                end: end + child_direction * child_length,
                radius: child_radius,
                parent_radius: radius,
                depth: child_depth,
                parent: Some(id),
                children: Vec::new(),
                leaf: None,
            });

            let child_side = transport_side(side, child_direction);
            self.grow(skeleton, child, child_direction, child_side, child_length);
        }
    }

    fn attach_leaves(&mut self, skeleton: &mut Skeleton, id: SegmentId, direction: Vec3, depth: u32) {
        if depth == 0 || depth < self.config.leaf_threshold_depth {
            return;
        }
        let count = self.rng.range_u32(self.config.leaf_count_min, self.config.leaf_count_max);
        let segment = skeleton.get_mut(id);
        segment.leaf = Some(LeafCluster {
            anchor: segment.end,
            orientation: Quat::from_rotation_arc(Vec3::Y, direction),
            count,
        });
    }
}
