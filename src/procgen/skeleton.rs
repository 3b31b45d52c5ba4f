//! Arena-indexed branch skeleton
//!
//! Segments live in one flat `Vec` in pre-order (a parent always precedes its
//! children). Parents own their children through `SegmentId` indices; there are
//! no back-references besides the `parent` index and no cycles.

use crate::core::types::{Quat, Vec3};

/// Shortest segment the generator will emit
pub const MIN_SEGMENT_LENGTH: f32 = 1e-3;

/// Carry a perpendicular reference axis from one direction onto the next with
/// minimal twist. Generator and mesh builder share this so tube rings line up.
pub(crate) fn transport_side(side: Vec3, direction: Vec3) -> Vec3 {
    (side - direction * side.dot(direction))
        .try_normalize()
        .unwrap_or_else(|| direction.any_orthonormal_vector())
}

/// Index of a segment in its skeleton's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

impl SegmentId {
    pub const ROOT: SegmentId = SegmentId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf quads anchored at the tip of a terminal segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeafCluster {
    pub anchor: Vec3,
    /// Rotates +Y onto the owning segment's direction
    pub orientation: Quat,
    pub count: u32,
}

impl LeafCluster {
    /// Direction the cluster grows toward
    pub fn direction(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }
}

/// One straight, tapered piece of branch
#[derive(Clone, Debug, PartialEq)]
pub struct BranchSegment {
    pub start: Vec3,
    pub end: Vec3,
    /// Radius at `end`
    pub radius: f32,
    /// Radius at `start` (the parent's radius, or the flared root base)
    pub parent_radius: f32,
    pub depth: u32,
    pub parent: Option<SegmentId>,
    pub children: Vec<SegmentId>,
    pub leaf: Option<LeafCluster>,
}

impl BranchSegment {
    pub fn length(&self) -> f32 {
        (self.end - self.start).length()
    }

    /// Unit direction from start to end
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start) / self.length()
    }

    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }
}

/// Complete branch skeleton produced by the recursion generator
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
    segments: Vec<BranchSegment>,
    seed: u64,
}

impl Skeleton {
    /// An empty skeleton (never produced by the generator)
    pub fn empty(seed: u64) -> Self {
        Self { segments: Vec::new(), seed }
    }

    pub(crate) fn with_capacity(seed: u64, capacity: usize) -> Self {
        Self { segments: Vec::with_capacity(capacity), seed }
    }

    /// Append a segment, registering it with its parent.
    pub(crate) fn push(&mut self, segment: BranchSegment) -> SegmentId {
        let id = SegmentId(self.segments.len() as u32);
        if let Some(parent) = segment.parent {
            self.segments[parent.index()].children.push(id);
        }
        self.segments.push(segment);
        id
    }

    pub(crate) fn get_mut(&mut self, id: SegmentId) -> &mut BranchSegment {
        &mut self.segments[id.index()]
    }

    /// Seed the skeleton was generated from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn root(&self) -> Option<&BranchSegment> {
        self.segments.first()
    }

    pub fn get(&self, id: SegmentId) -> Option<&BranchSegment> {
        self.segments.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments in pre-order (parent before children)
    pub fn segments(&self) -> &[BranchSegment] {
        &self.segments
    }

    /// `(id, segment)` pairs in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &BranchSegment)> + '_ {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, s)| (SegmentId(i as u32), s))
    }

    /// Segments with no children
    pub fn terminals(&self) -> impl Iterator<Item = &BranchSegment> + '_ {
        self.segments.iter().filter(|s| s.is_terminal())
    }

    /// Leaf clusters in pre-order
    pub fn leaf_clusters(&self) -> impl Iterator<Item = &LeafCluster> + '_ {
        self.segments.iter().filter_map(|s| s.leaf.as_ref())
    }

    /// Deepest segment depth (0 for root-only or empty)
    pub fn max_depth(&self) -> u32 {
        self.segments.iter().map(|s| s.depth).max().unwrap_or(0)
    }

    /// Segment count per depth level, index = depth
    pub fn depth_histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0usize; self.max_depth() as usize + 1];
        for segment in &self.segments {
            histogram[segment.depth as usize] += 1;
        }
        if self.segments.is_empty() {
            histogram.clear();
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: Vec3, end: Vec3, depth: u32, parent: Option<SegmentId>) -> BranchSegment {
        BranchSegment {
            start,
            end,
            radius: 0.5,
            parent_radius: 0.5,
            depth,
            parent,
            children: Vec::new(),
            leaf: None,
        }
    }

    #[test]
    fn test_push_links_children() {
        let mut skeleton = Skeleton::empty(1);
        let root = skeleton.push(segment(Vec3::ZERO, Vec3::Y, 0, None));
        let a = skeleton.push(segment(Vec3::Y, Vec3::new(1.0, 2.0, 0.0), 1, Some(root)));
        let b = skeleton.push(segment(Vec3::Y, Vec3::new(-1.0, 2.0, 0.0), 1, Some(root)));

        assert_eq!(root, SegmentId::ROOT);
        assert_eq!(skeleton.len(), 3);
        assert_eq!(skeleton.get(root).unwrap().children, vec![a, b]);
        assert!(skeleton.get(a).unwrap().is_terminal());
        assert_eq!(skeleton.terminals().count(), 2);
    }

    #[test]
    fn test_direction_and_length() {
        let s = segment(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0), 0, None);
        assert!((s.length() - 5.0).abs() < 1e-6);
        assert!((s.direction() - Vec3::new(0.0, 0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn test_depth_histogram() {
        let mut skeleton = Skeleton::empty(1);
        assert!(skeleton.depth_histogram().is_empty());

        let root = skeleton.push(segment(Vec3::ZERO, Vec3::Y, 0, None));
        skeleton.push(segment(Vec3::Y, Vec3::Y * 2.0, 1, Some(root)));
        skeleton.push(segment(Vec3::Y, Vec3::Y * 2.0 + Vec3::X, 1, Some(root)));
        assert_eq!(skeleton.depth_histogram(), vec![1, 2]);
        assert_eq!(skeleton.max_depth(), 1);
    }

    #[test]
    fn test_transport_side_is_perpendicular() {
        let dir = Vec3::new(0.3, 0.9, 0.1).normalize();
        let side = transport_side(Vec3::X, dir);
        assert!(side.dot(dir).abs() < 1e-5);
        assert!((side.length() - 1.0).abs() < 1e-5);

        // Parallel side falls back to any perpendicular axis
        let side = transport_side(Vec3::Y, Vec3::Y);
        assert!(side.dot(Vec3::Y).abs() < 1e-5);
    }

    #[test]
    fn test_leaf_cluster_direction() {
        let cluster = LeafCluster {
            anchor: Vec3::ZERO,
            orientation: Quat::from_rotation_arc(Vec3::Y, Vec3::X),
            count: 3,
        };
        assert!((cluster.direction() - Vec3::X).length() < 1e-5);
    }
}
