//! Bonsai - procedural bonsai trees for 3D scenes
//!
//! ```
//! use bonsai::scene::{SceneGraph, TreeNode};
//! use glam::Vec3;
//!
//! let mut tree = TreeNode::default();
//! tree.generate().unwrap();
//! tree.set_position(Vec3::new(0.0, -10.0, 0.0));
//! tree.set_scale(Vec3::splat(0.65));
//!
//! let mut scene = SceneGraph::new();
//! let id = scene.attach(scene.root(), &tree);
//! assert_eq!(scene.flatten().len(), 2);
//! scene.detach(id);
//! tree.dispose();
//! ```

pub mod core;
pub mod math;
pub mod procgen;
pub mod scene;
