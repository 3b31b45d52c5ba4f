//! Scene integration: attachable tree nodes and a CPU-side scene graph

pub mod graph;
pub mod node;
pub mod tree_node;

pub use graph::{DrawItem, SceneGraph};
pub use node::{LocalTransform, MeshHandle, MeshKind, NodeContent, SceneNode, SceneNodeId, SceneObject};
pub use tree_node::{NodeState, TreeNode};
