//! Geometry builder: skeleton → merged wood mesh + leaf mesh
//!
//! Every branch becomes a tapered tube of `radial_segments` sides. Ring frames
//! are parallel-transported down the skeleton, so a segment's first child can
//! reuse its parent's end ring and joints carry no seam. All wood is merged into
//! a single buffer (one draw unit); leaves go to a second buffer.
//!
//! Conventions: right-handed, +Y up, counter-clockwise front faces. Leaf quads
//! are single-sided and expect a double-sided material on the host.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Quat, Vec3};
use crate::math::Aabb;

use super::config::TreeConfig;
use super::rng::SimpleRng;
use super::skeleton::{transport_side, LeafCluster, Skeleton};

/// Salt for the leaf stream, kept apart from the skeleton stream
const LEAF_STREAM: u64 = 0x1EAF;

/// Interleaved vertex, ready for a host vertex buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2], color: [f32; 3]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
            color,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Flattened triangle list: one draw unit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryBuffer {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Draw calls needed to render this buffer
    pub fn draw_units(&self) -> usize {
        usize::from(!self.is_empty())
    }

    /// Raw vertex bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Whole triangles, every index in range
    pub fn validate_indices(&self) -> bool {
        let count = self.vertices.len() as u32;
        self.indices.len() % 3 == 0 && self.indices.iter().all(|&i| i < count)
    }

    fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    fn finish(&mut self) {
        self.bounds = Aabb::from_points(self.vertices.iter().map(Vertex::position));
    }
}

/// Drawable output of one tree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeGeometry {
    /// Trunk and every branch, merged
    pub wood: GeometryBuffer,
    pub leaves: GeometryBuffer,
}

impl TreeGeometry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.wood.is_empty() && self.leaves.is_empty()
    }

    pub fn draw_units(&self) -> usize {
        self.wood.draw_units() + self.leaves.draw_units()
    }

    pub fn bounds(&self) -> Aabb {
        self.wood.bounds.merged(&self.leaves.bounds)
    }

    /// FNV-1a over both buffers; equal trees hash equal
    pub fn content_hash(&self) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for bytes in [
            self.wood.vertex_bytes(),
            self.wood.index_bytes(),
            self.leaves.vertex_bytes(),
            self.leaves.index_bytes(),
        ] {
            for &b in bytes {
                hash ^= u64::from(b);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
        }
        hash
    }
}

/// Convert a skeleton into drawable buffers.
///
/// An empty skeleton yields an empty but valid `TreeGeometry`.
pub fn build_geometry(skeleton: &Skeleton, config: &TreeConfig) -> TreeGeometry {
    let mut builder = MeshBuilder::new(config, skeleton.seed());
    builder.build_wood(skeleton);
    builder.build_leaves(skeleton);

    let geometry = builder.finish();
    log::debug!(
        "Built geometry: wood {} verts / {} tris, leaves {} verts / {} tris",
        geometry.wood.vertex_count(),
        geometry.wood.triangle_count(),
        geometry.leaves.vertex_count(),
        geometry.leaves.triangle_count()
    );
    geometry
}

/// Per-segment data the children need
#[derive(Clone, Copy)]
struct SegmentFrame {
    side: Vec3,
    end_ring: u32,
    /// Texture v at the end ring (accumulated length)
    v_end: f32,
}

struct MeshBuilder<'a> {
    config: &'a TreeConfig,
    sides: u32,
    leaf_rng: SimpleRng,
    wood: GeometryBuffer,
    leaves: GeometryBuffer,
}

impl<'a> MeshBuilder<'a> {
    fn new(config: &'a TreeConfig, seed: u64) -> Self {
        Self {
            config,
            sides: config.radial_segments.max(3),
            leaf_rng: SimpleRng::derived(seed, LEAF_STREAM),
            wood: GeometryBuffer::new(),
            leaves: GeometryBuffer::new(),
        }
    }

    fn build_wood(&mut self, skeleton: &Skeleton) {
        let mut frames: Vec<SegmentFrame> = Vec::with_capacity(skeleton.len());

        for (id, segment) in skeleton.iter() {
            let direction = segment.direction();
            let parent = segment
                .parent
                .and_then(|p| skeleton.get(p).map(|parent| (parent, frames[p.index()])));

            let (side, start_ring, v_start) = match parent {
                Some((parent_segment, parent_frame)) => {
                    let side = transport_side(parent_frame.side, direction);
                    if parent_segment.children.first() == Some(&id) {
                        (side, parent_frame.end_ring, parent_frame.v_end)
                    } else {
                        let ring = self.ring(segment.start, direction, side, segment.parent_radius, parent_frame.v_end);
                        (side, ring, parent_frame.v_end)
                    }
                }
                None => {
                    let side = transport_side(Vec3::X, direction);
                    let ring = self.ring(segment.start, direction, side, segment.parent_radius, 0.0);
                    self.cap(segment.start, -direction, ring, false);
                    (side, ring, 0.0)
                }
            };

            let v_end = v_start + segment.length();
            let end_ring = self.ring(segment.end, direction, side, segment.radius, v_end);
            self.tube(start_ring, end_ring);

            if segment.is_terminal() {
                self.cap(segment.end + direction * segment.radius * 0.5, direction, end_ring, true);
            }

            frames.push(SegmentFrame { side, end_ring, v_end });
        }
    }

    /// Emit `sides + 1` vertices around `center` (the last duplicates the first for the UV seam).
    fn ring(&mut self, center: Vec3, direction: Vec3, side: Vec3, radius: f32, v: f32) -> u32 {
        let binormal = direction.cross(side);
        let color = self.config.bark_color;
        let mut base = 0;
        for k in 0..=self.sides {
            let theta = TAU * k as f32 / self.sides as f32;
            let radial = side * theta.cos() + binormal * theta.sin();
            let index = self.wood.push_vertex(Vertex::new(
                center + radial * radius,
                radial,
                [k as f32 / self.sides as f32, v],
                color,
            ));
            if k == 0 {
                base = index;
            }
        }
        base
    }

    fn tube(&mut self, start: u32, end: u32) {
        for k in 0..self.sides {
            let (a0, a1) = (start + k, start + k + 1);
            let (b0, b1) = (end + k, end + k + 1);
            self.wood.push_triangle(a0, a1, b1);
            self.wood.push_triangle(a0, b1, b0);
        }
    }

    /// Close a ring with a fan to `apex`; `outward` selects the winding.
    fn cap(&mut self, apex: Vec3, normal: Vec3, ring: u32, outward: bool) {
        let center = self.wood.push_vertex(Vertex::new(apex, normal, [0.5, 0.5], self.config.bark_color));
        for k in 0..self.sides {
            if outward {
                self.wood.push_triangle(ring + k, ring + k + 1, center);
            } else {
                self.wood.push_triangle(center, ring + k + 1, ring + k);
            }
        }
    }

    fn build_leaves(&mut self, skeleton: &Skeleton) {
        for cluster in skeleton.leaf_clusters() {
            self.leaf_cluster(cluster);
        }
    }

    /// `count` quads fanned around the cluster direction, tilted outward.
    fn leaf_cluster(&mut self, cluster: &LeafCluster) {
        let direction = cluster.direction();
        let side = cluster.orientation * Vec3::X;
        let size = self.config.leaf_size;
        let tint = self.leaf_tint();

        for k in 0..cluster.count {
            let phase = TAU * k as f32 / cluster.count as f32
                + self.leaf_rng.symmetric(self.config.leaf_rotation_jitter);
            let outward = Quat::from_axis_angle(direction, phase) * side;
            let forward = (direction + outward).normalize();
            let across = outward.cross(direction);
            let normal = across.cross(forward).normalize();

            let half = across * (size * 0.5);
            let base = cluster.anchor;
            let tip = cluster.anchor + forward * size;

            let i0 = self.leaves.push_vertex(Vertex::new(base - half, normal, [0.0, 0.0], tint));
            let i1 = self.leaves.push_vertex(Vertex::new(base + half, normal, [1.0, 0.0], tint));
            let i2 = self.leaves.push_vertex(Vertex::new(tip + half, normal, [1.0, 1.0], tint));
            let i3 = self.leaves.push_vertex(Vertex::new(tip - half, normal, [0.0, 1.0], tint));
            self.leaves.push_triangle(i0, i1, i2);
            self.leaves.push_triangle(i0, i2, i3);
        }
    }

    fn leaf_tint(&mut self) -> [f32; 3] {
        let variation = self.config.leaf_color_variation;
        let mut color = self.config.leaf_color;
        for channel in &mut color {
            *channel = (*channel + self.leaf_rng.symmetric(variation)).clamp(0.0, 1.0);
        }
        color
    }

    fn finish(mut self) -> TreeGeometry {
        self.wood.finish();
        self.leaves.finish();
        TreeGeometry {
            wood: self.wood,
            leaves: self.leaves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procgen::generator::build;

    fn example_config() -> TreeConfig {
        TreeConfig {
            seed: 42,
            max_depth: 3,
            branch_factor: 2,
            angle_spread: 0.4,
            length_decay: 0.7,
            radius_decay: 0.6,
            min_radius: 0.05,
            leaf_threshold_depth: 2,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
    }

    #[test]
    fn test_example_wood_counts() {
        let config = example_config();
        let skeleton = build(&config, config.seed).unwrap();
        let geometry = build_geometry(&skeleton, &config);

        // 15 end rings + root base ring + 7 second-child start rings, 9 verts each,
        // plus one base cap centre and 8 tip centres.
        let n = config.radial_segments as usize;
        assert_eq!(geometry.wood.vertex_count(), 23 * (n + 1) + 1 + 8);
        // 15 tubes, base fan, 8 tip fans
        assert_eq!(geometry.wood.triangle_count(), 15 * n * 2 + n + 8 * n);
    }

    #[test]
    fn test_single_wood_draw_unit() {
        for config in [example_config(), TreeConfig::bonsai(), TreeConfig::sparse()] {
            let skeleton = build(&config, config.seed).unwrap();
            let geometry = build_geometry(&skeleton, &config);
            assert_eq!(geometry.wood.draw_units(), 1);
            assert!(geometry.wood.validate_indices());
            assert!(geometry.leaves.validate_indices());
        }
    }

    #[test]
    fn test_leaf_quads_match_clusters() {
        let config = example_config();
        let skeleton = build(&config, config.seed).unwrap();
        let geometry = build_geometry(&skeleton, &config);

        let quads: u32 = skeleton.leaf_clusters().map(|c| c.count).sum();
        assert_eq!(geometry.leaves.vertex_count(), quads as usize * 4);
        assert_eq!(geometry.leaves.triangle_count(), quads as usize * 2);
        assert_eq!(geometry.leaves.draw_units(), 1);
    }

    #[test]
    fn test_deterministic_hash() {
        let config = TreeConfig::windswept();
        let a = build_geometry(&build(&config, 77).unwrap(), &config);
        let b = build_geometry(&build(&config, 77).unwrap(), &config);
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());

        let c = build_geometry(&build(&config, 78).unwrap(), &config);
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_empty_skeleton_gives_empty_geometry() {
        let geometry = build_geometry(&Skeleton::empty(0), &TreeConfig::default());
        assert!(geometry.is_empty());
        assert_eq!(geometry.draw_units(), 0);
        assert!(geometry.wood.validate_indices());
        assert!(geometry.bounds().is_empty());
    }

    #[test]
    fn test_bare_trunk_is_closed_tube() {
        let config = TreeConfig { max_depth: 0, ..TreeConfig::default() };
        let geometry = build_geometry(&build(&config, 1).unwrap(), &config);
        let n = config.radial_segments as usize;
        assert_eq!(geometry.wood.vertex_count(), 2 * (n + 1) + 2);
        assert_eq!(geometry.wood.triangle_count(), 4 * n);
        assert!(geometry.leaves.is_empty());
    }

    #[test]
    fn test_first_child_shares_parent_ring() {
        let config = example_config();
        let skeleton = build(&config, config.seed).unwrap();
        let geometry = build_geometry(&skeleton, &config);

        // Every shared joint vertex lies on both the parent end and child start
        let root = skeleton.root().unwrap();
        let joint_vertices = geometry
            .wood
            .vertices
            .iter()
            .filter(|v| (v.position() - root.end).length() <= root.radius * 1.001)
            .count();
        // Root end ring, second child's start ring, nothing else
        assert_eq!(joint_vertices, 2 * (config.radial_segments as usize + 1));
    }

    #[test]
    fn test_root_flare_widens_base() {
        let config = TreeConfig { max_depth: 0, root_flare: 2.0, initial_radius: 0.5, ..TreeConfig::default() };
        let geometry = build_geometry(&build(&config, 1).unwrap(), &config);
        let base_width = geometry
            .wood
            .vertices
            .iter()
            .filter(|v| v.position[1].abs() < 1e-6)
            .map(|v| Vec3::new(v.position[0], 0.0, v.position[2]).length())
            .fold(0.0f32, f32::max);
        assert!((base_width - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_normals_are_unit() {
        let config = TreeConfig::bonsai();
        let geometry = build_geometry(&build(&config, 3).unwrap(), &config);
        for v in geometry.wood.vertices.iter().chain(geometry.leaves.vertices.iter()) {
            assert!((v.normal().length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_leaves_face_outward() {
        let config = TreeConfig::bonsai();
        let skeleton = build(&config, 5).unwrap();
        let geometry = build_geometry(&skeleton, &config);

        let mut quad = geometry.leaves.vertices.chunks_exact(4);
        for cluster in skeleton.leaf_clusters() {
            for _ in 0..cluster.count {
                let q = quad.next().unwrap();
                let centroid = q.iter().map(Vertex::position).sum::<Vec3>() / 4.0;
                assert!((centroid - cluster.anchor).dot(cluster.direction()) > 0.0);
            }
        }
        assert!(quad.next().is_none());
    }

    #[test]
    fn test_leaf_tint_within_variation() {
        let config = TreeConfig::bonsai();
        let geometry = build_geometry(&build(&config, 8).unwrap(), &config);
        for v in &geometry.leaves.vertices {
            for c in 0..3 {
                assert!((v.color[c] - config.leaf_color[c]).abs() <= config.leaf_color_variation + 1e-6);
            }
        }
    }

    #[test]
    fn test_bounds_contain_vertices() {
        let config = TreeConfig::windswept();
        let geometry = build_geometry(&build(&config, 9).unwrap(), &config);
        let bounds = geometry.bounds();
        for v in geometry.wood.vertices.iter().chain(geometry.leaves.vertices.iter()) {
            assert!(bounds.contains_point(v.position()));
        }
    }

    #[test]
    fn test_upload_bytes() {
        let config = example_config();
        let geometry = build_geometry(&build(&config, 42).unwrap(), &config);
        assert_eq!(geometry.wood.vertex_bytes().len(), geometry.wood.vertex_count() * 44);
        assert_eq!(geometry.wood.index_bytes().len(), geometry.wood.indices.len() * 4);
    }
}
