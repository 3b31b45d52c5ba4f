//! Procedural bonsai generation
//!
//! `generate_tree` runs the whole pipeline for one config: branch recursion
//! (`generator`), then mesh building (`geometry`). Both stages are pure, so
//! trees can be built on any thread and handed to the render thread afterwards.

pub mod config;
pub mod generator;
pub mod geometry;
pub mod rng;
pub mod skeleton;
pub mod worker;

use std::time::Instant;

use rayon::prelude::*;

use crate::core::types::Result;
use crate::math::Aabb;

pub use config::{TreeConfig, TreeStyle};
pub use generator::build;
pub use geometry::{build_geometry, GeometryBuffer, TreeGeometry, Vertex};
pub use skeleton::{BranchSegment, LeafCluster, SegmentId, Skeleton};
pub use worker::{GenerationResult, GenerationWorker, RequestId};

/// Summary of one generated tree
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeStats {
    pub segment_count: usize,
    pub terminal_count: usize,
    pub leaf_cluster_count: usize,
    pub max_depth: u32,
    pub wood_vertices: usize,
    pub wood_triangles: usize,
    pub leaf_vertices: usize,
    pub leaf_triangles: usize,
    pub bounds: Aabb,
}

impl TreeStats {
    fn collect(skeleton: &Skeleton, geometry: &TreeGeometry) -> Self {
        Self {
            segment_count: skeleton.len(),
            terminal_count: skeleton.terminals().count(),
            leaf_cluster_count: skeleton.leaf_clusters().count(),
            max_depth: skeleton.max_depth(),
            wood_vertices: geometry.wood.vertex_count(),
            wood_triangles: geometry.wood.triangle_count(),
            leaf_vertices: geometry.leaves.vertex_count(),
            leaf_triangles: geometry.leaves.triangle_count(),
            bounds: geometry.bounds(),
        }
    }
}

/// Finished tree, ready to be installed into a `TreeNode`
#[derive(Clone, Debug)]
pub struct GeneratedTree {
    pub config: TreeConfig,
    pub geometry: TreeGeometry,
    pub stats: TreeStats,
}

/// Skeleton + geometry for `config`, seeded by `config.seed`.
///
/// The skeleton is dropped once the meshes are built.
pub fn generate_tree(config: &TreeConfig) -> Result<GeneratedTree> {
    let skeleton = build(config, config.seed)?;
    let geometry = build_geometry(&skeleton, config);
    let stats = TreeStats::collect(&skeleton, &geometry);
    Ok(GeneratedTree {
        config: config.clone(),
        geometry,
        stats,
    })
}

/// Generate many trees in parallel. Results keep the input order.
pub fn generate_batch(configs: &[TreeConfig]) -> Vec<Result<GeneratedTree>> {
    let start = Instant::now();
    let results: Vec<_> = configs.par_iter().map(generate_tree).collect();

    let elapsed = start.elapsed();
    log::info!(
        "Generated {} trees in {:.2}s ({} failed)",
        results.len(),
        elapsed.as_secs_f64(),
        results.iter().filter(|r| r.is_err()).count()
    );
    results
}
