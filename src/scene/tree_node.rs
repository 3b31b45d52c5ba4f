//! The attachable bonsai node
//!
//! A `TreeNode` owns one generated `TreeGeometry` (wood + leaves) and a
//! transform. The transform is applied by the host through the model matrix,
//! never baked into vertices, so moving or rescaling a generated tree is free.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::core::types::Result;
use crate::math::Aabb;
use crate::procgen::{generate_tree, GeneratedTree, TreeConfig, TreeGeometry, TreeStats};

use super::node::{LocalTransform, MeshHandle, MeshKind, SceneObject};

/// Lifecycle of a `TreeNode`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NodeState {
    /// Constructed, nothing generated yet
    #[default]
    Empty,
    /// Holds geometry
    Ready,
    /// Geometry released by `dispose`
    Released,
}

/// A procedurally generated tree that can be attached to a scene graph
#[derive(Debug)]
pub struct TreeNode {
    name: String,
    config: TreeConfig,
    transform: LocalTransform,
    geometry: Option<Arc<TreeGeometry>>,
    stats: Option<TreeStats>,
    state: NodeState,
}

impl Default for TreeNode {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl TreeNode {
    /// Create an empty node; nothing is generated until `generate()`.
    pub fn new(config: TreeConfig) -> Self {
        Self {
            name: "bonsai".to_string(),
            config,
            transform: LocalTransform::identity(),
            geometry: None,
            stats: None,
            state: NodeState::Empty,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Build skeleton and meshes from the node's config, replacing any
    /// previous geometry. A rejected config leaves the node untouched.
    pub fn generate(&mut self) -> Result<()> {
        let tree = generate_tree(&self.config)?;
        self.install(tree);
        Ok(())
    }

    /// Swap in a tree generated elsewhere (e.g. by a `GenerationWorker`).
    ///
    /// The old geometry is replaced in one step; anyone still holding its
    /// `Arc` keeps a complete copy until they drop it.
    pub fn install(&mut self, tree: GeneratedTree) {
        log::debug!(
            "Installing tree '{}': {} segments, {} leaf clusters, {} wood tris, {} leaf tris",
            self.name,
            tree.stats.segment_count,
            tree.stats.leaf_cluster_count,
            tree.stats.wood_triangles,
            tree.stats.leaf_triangles
        );
        self.config = tree.config;
        self.geometry = Some(Arc::new(tree.geometry));
        self.stats = Some(tree.stats);
        self.state = NodeState::Ready;
    }

    /// Release owned geometry. Safe to call repeatedly or before `generate()`.
    pub fn dispose(&mut self) {
        if self.state == NodeState::Released {
            return;
        }
        if self.geometry.take().is_some() {
            log::debug!("Released geometry of tree '{}'", self.name);
        }
        self.stats = None;
        self.state = NodeState::Released;
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_released(&self) -> bool {
        self.state == NodeState::Released
    }

    /// Shared handle to the current geometry, if any
    pub fn geometry(&self) -> Option<Arc<TreeGeometry>> {
        self.geometry.clone()
    }

    pub fn stats(&self) -> Option<&TreeStats> {
        self.stats.as_ref()
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    pub fn transform(&self) -> &LocalTransform {
        &self.transform
    }

    /// Model matrix the host composes with its own
    pub fn model_matrix(&self) -> Mat4 {
        self.transform.to_mat4()
    }

    /// Bounds of the current geometry after this node's transform
    pub fn local_bounds(&self) -> Aabb {
        self.geometry
            .as_ref()
            .map(|g| g.bounds().transformed(&self.model_matrix()))
            .unwrap_or(Aabb::EMPTY)
    }
}

impl SceneObject for TreeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_transform(&self) -> LocalTransform {
        self.transform
    }

    fn meshes(&self) -> Vec<MeshHandle> {
        let Some(geometry) = &self.geometry else {
            return Vec::new();
        };
        [MeshKind::Wood, MeshKind::Leaves]
            .into_iter()
            .map(|kind| MeshHandle::new(geometry.clone(), kind))
            .filter(|mesh| !mesh.buffer().is_empty())
            .collect()
    }
}
