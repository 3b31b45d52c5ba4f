//! Scene graph: CPU-side hierarchy of nodes.
//!
//! Stands in for the render host's scene graph. Objects are attached as a group
//! node carrying their transform, with one mesh child per draw unit. Each frame,
//! `flatten()` walks the tree and produces a flat `Vec<DrawItem>` the host can
//! draw directly: world matrix plus a shared reference to the buffer.

use std::collections::HashMap;

use glam::Mat4;

use crate::math::Aabb;

use super::node::{LocalTransform, MeshHandle, NodeContent, SceneNode, SceneNodeId, SceneObject};

/// One draw call produced by `SceneGraph::flatten`
#[derive(Clone, Debug)]
pub struct DrawItem {
    pub node: SceneNodeId,
    /// Model matrix; vertex data is never pre-transformed
    pub world_transform: Mat4,
    pub mesh: MeshHandle,
    pub world_bounds: Aabb,
}

/// CPU-side scene graph that organizes drawable content into a hierarchy.
pub struct SceneGraph {
    nodes: HashMap<SceneNodeId, SceneNode>,
    root: SceneNodeId,
    next_id: u64,
    dirty: bool,
}

impl SceneGraph {
    /// Create a new scene graph with a root Group node.
    pub fn new() -> Self {
        let root_id = SceneNodeId(0);
        let root_node = SceneNode::new(root_id, "root", NodeContent::Group);

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root_node);

        Self {
            nodes,
            root: root_id,
            next_id: 1,
            dirty: true,
        }
    }

    /// Get the root node ID.
    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    /// Allocate a fresh node ID.
    fn alloc_id(&mut self) -> SceneNodeId {
        let id = SceneNodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a child node under `parent`. Returns the new node's ID.
    pub fn add_child(&mut self, parent: SceneNodeId, name: impl Into<String>, content: NodeContent) -> SceneNodeId {
        let id = self.alloc_id();
        let mut node = SceneNode::new(id, name, content);
        node.parent = Some(parent);

        self.nodes.insert(id, node);

        // Register as child of parent
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }

        self.dirty = true;
        id
    }

    /// Remove a node and its entire subtree. Cannot remove the root.
    pub fn remove(&mut self, id: SceneNodeId) {
        if id == self.root {
            return;
        }

        // Collect subtree IDs (BFS)
        let mut to_remove = vec![id];
        let mut i = 0;
        while i < to_remove.len() {
            let current = to_remove[i];
            if let Some(node) = self.nodes.get(&current) {
                to_remove.extend_from_slice(&node.children);
            }
            i += 1;
        }

        // Detach from parent
        if let Some(parent_id) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|c| *c != id);
            }
        }

        for nid in to_remove {
            self.nodes.remove(&nid);
        }

        self.dirty = true;
    }

    /// Attach `object` under `parent`: a group node with the object's transform
    /// and one mesh child per draw unit. Returns the group's ID.
    pub fn attach(&mut self, parent: SceneNodeId, object: &dyn SceneObject) -> SceneNodeId {
        let group = self.add_child(parent, object.name(), NodeContent::Group);
        self.set_transform(group, object.local_transform());
        self.add_meshes(group, object);
        log::debug!("Attached '{}' as {:?}", object.name(), group);
        group
    }

    /// Re-read transform and meshes from `object` after it changed.
    ///
    /// Old mesh children are fully replaced before the next `flatten`, so a
    /// frame never sees a mix of old and new buffers.
    pub fn refresh(&mut self, group: SceneNodeId, object: &dyn SceneObject) {
        let Some(node) = self.nodes.get(&group) else {
            log::warn!("refresh: {:?} is not in the scene graph", group);
            return;
        };
        let old_children = node.children.clone();
        for child in old_children {
            if matches!(self.nodes.get(&child).map(|n| &n.content), Some(NodeContent::Mesh(_))) {
                self.remove(child);
            }
        }
        self.set_transform(group, object.local_transform());
        self.add_meshes(group, object);
    }

    /// Detach a previously attached object (and anything below it).
    pub fn detach(&mut self, group: SceneNodeId) {
        self.remove(group);
    }

    fn add_meshes(&mut self, group: SceneNodeId, object: &dyn SceneObject) {
        for mesh in object.meshes() {
            let name = format!("{}/{}", object.name(), mesh.kind);
            self.add_child(group, name, NodeContent::Mesh(mesh));
        }
    }

    /// Set the local transform of a node.
    pub fn set_transform(&mut self, id: SceneNodeId, transform: LocalTransform) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local_transform = transform;
            self.dirty = true;
        }
    }

    /// Set the visibility of a node.
    pub fn set_visible(&mut self, id: SceneNodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
            self.dirty = true;
        }
    }

    /// Get an immutable reference to a node.
    pub fn get(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: SceneNodeId) -> impl Iterator<Item = SceneNodeId> + '_ {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// Total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether anything changed since the last `flatten`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Walk the tree, propagate transforms, and collect all visible draw items.
    pub fn flatten(&mut self) -> Vec<DrawItem> {
        self.propagate_transforms(self.root, Mat4::IDENTITY);

        let mut out = Vec::new();
        self.collect_visible(self.root, &mut out);
        self.dirty = false;
        out
    }

    /// Recursively propagate world transforms.
    fn propagate_transforms(&mut self, node_id: SceneNodeId, parent_world: Mat4) {
        let (local_mat, children) = {
            let node = match self.nodes.get(&node_id) {
                Some(n) => n,
                None => return,
            };
            (node.local_transform.to_mat4(), node.children.clone())
        };

        let world = parent_world * local_mat;

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.world_transform = world;
        }

        for child_id in children {
            self.propagate_transforms(child_id, world);
        }
    }

    /// Recursively collect visible draw items.
    fn collect_visible(&self, node_id: SceneNodeId, out: &mut Vec<DrawItem>) {
        let node = match self.nodes.get(&node_id) {
            Some(n) => n,
            None => return,
        };

        if !node.visible {
            return;
        }

        if let NodeContent::Mesh(mesh) = &node.content {
            let buffer = mesh.buffer();
            if !buffer.is_empty() {
                out.push(DrawItem {
                    node: node_id,
                    world_transform: node.world_transform,
                    mesh: mesh.clone(),
                    world_bounds: buffer.bounds.transformed(&node.world_transform),
                });
            }
        }

        for &child_id in &node.children {
            self.collect_visible(child_id, out);
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
