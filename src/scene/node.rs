//! Scene graph node types
//!
//! Node IDs, transforms, content variants, and the `SceneObject` capability
//! that lets any owner of geometry be attached to a `SceneGraph`.

use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::procgen::{GeometryBuffer, TreeGeometry};

/// Unique identifier for a scene graph node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneNodeId(pub u64);

/// Local transform relative to the parent node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    /// Identity transform (no translation, rotation, or scaling).
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a translation-only transform.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a 4x4 matrix.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Which of a tree's buffers a mesh node draws
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKind {
    Wood,
    Leaves,
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshKind::Wood => write!(f, "wood"),
            MeshKind::Leaves => write!(f, "leaves"),
        }
    }
}

/// Shared reference to one buffer of a generated tree
#[derive(Clone, Debug)]
pub struct MeshHandle {
    pub geometry: Arc<TreeGeometry>,
    pub kind: MeshKind,
}

impl MeshHandle {
    pub fn new(geometry: Arc<TreeGeometry>, kind: MeshKind) -> Self {
        Self { geometry, kind }
    }

    /// The buffer this handle draws
    pub fn buffer(&self) -> &GeometryBuffer {
        match self.kind {
            MeshKind::Wood => &self.geometry.wood,
            MeshKind::Leaves => &self.geometry.leaves,
        }
    }
}

/// What a scene node contains.
#[derive(Clone, Debug)]
pub enum NodeContent {
    /// A grouping node with no geometry of its own.
    Group,

    /// One draw unit.
    Mesh(MeshHandle),
}

/// Anything that exposes a transform and a list of meshes can be attached.
pub trait SceneObject {
    fn name(&self) -> &str;

    fn local_transform(&self) -> LocalTransform;

    /// Child draw sets, empty when there is nothing to draw
    fn meshes(&self) -> Vec<MeshHandle>;
}

/// A single node in the scene graph.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: SceneNodeId,
    pub name: String,
    pub parent: Option<SceneNodeId>,
    pub children: Vec<SceneNodeId>,
    pub local_transform: LocalTransform,
    /// Cached world transform (recomputed during propagation).
    pub world_transform: Mat4,
    pub visible: bool,
    pub content: NodeContent,
}

impl SceneNode {
    /// Create a new scene node.
    pub fn new(id: SceneNodeId, name: impl Into<String>, content: NodeContent) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local_transform: LocalTransform::identity(),
            world_transform: Mat4::IDENTITY,
            visible: true,
            content,
        }
    }
}
