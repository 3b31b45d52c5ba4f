//! Tree generation parameters
//!
//! `TreeConfig` is immutable plain data. Presets cover the common looks; any
//! field missing from a JSON file falls back to the bonsai preset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Hard ceiling on recursion depth
pub const MAX_DEPTH: u32 = 16;
/// Hard ceiling on children per segment (after jitter)
pub const MAX_BRANCH_FACTOR: u32 = 8;
/// Largest skeleton a config may project
pub const MAX_SEGMENTS: u64 = 1 << 20;
/// Most sides a branch tube may have
pub const MAX_RADIAL_SEGMENTS: u32 = 64;
/// Most leaf quads in one cluster
pub const MAX_LEAF_COUNT: u32 = 64;

/// Tree visual style presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeStyle {
    #[default]
    Bonsai,
    /// Heavy droop and irregular branching
    Windswept,
    /// Open crown with few, small leaf clusters
    Sparse,
}

impl TreeStyle {
    pub const ALL: [TreeStyle; 3] = [TreeStyle::Bonsai, TreeStyle::Windswept, TreeStyle::Sparse];

    /// Parse a style name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bonsai" => Some(Self::Bonsai),
            "windswept" => Some(Self::Windswept),
            "sparse" => Some(Self::Sparse),
            _ => None,
        }
    }
}

/// Parameters for recursive branch generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Reproducibility key
    pub seed: u64,
    /// Recursion ceiling; the root is depth 0
    pub max_depth: u32,
    /// Children per non-terminal segment
    pub branch_factor: u32,
    /// Child count varies by up to this much around `branch_factor` (0 = fixed)
    pub branch_jitter: u32,
    /// Max deviation of a child from its parent direction, per axis (radians)
    pub angle_spread: f32,
    /// Child length / parent length
    pub length_decay: f32,
    /// Child radius / parent radius
    pub radius_decay: f32,
    /// Segments thinner than this stop branching
    pub min_radius: f32,
    /// Terminal segments at or below this depth carry leaf clusters
    pub leaf_threshold_depth: u32,
    /// Root segment length
    pub initial_length: f32,
    /// Root segment radius at its top joint
    pub initial_radius: f32,
    /// Downward bend, scaled by depth / max_depth
    pub droop: f32,
    /// Root base radius multiplier (1.0 = no flare)
    pub root_flare: f32,
    /// Fewest leaf quads per cluster (at least 1)
    pub leaf_count_min: u32,
    /// Most leaf quads per cluster
    pub leaf_count_max: u32,
    /// Leaf quad edge length
    pub leaf_size: f32,
    /// Random twist applied to each leaf quad (radians)
    pub leaf_rotation_jitter: f32,
    /// Sides of each branch tube
    pub radial_segments: u32,
    /// Linear RGB bark colour
    pub bark_color: [f32; 3],
    /// Linear RGB leaf colour
    pub leaf_color: [f32; 3],
    /// Per-cluster leaf tint variation (0.0 - 0.5)
    pub leaf_color_variation: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::bonsai()
    }
}

impl TreeConfig {
    /// Classic bonsai: short flared trunk, binary branching, dense foliage pads
    pub fn bonsai() -> Self {
        Self {
            seed: 42,
            max_depth: 6,
            branch_factor: 2,
            branch_jitter: 0,
            angle_spread: 0.5,
            length_decay: 0.75,
            radius_decay: 0.65,
            min_radius: 0.02,
            leaf_threshold_depth: 3,
            initial_length: 4.0,
            initial_radius: 0.6,
            droop: 0.25,
            root_flare: 1.6,
            leaf_count_min: 3,
            leaf_count_max: 6,
            leaf_size: 0.9,
            leaf_rotation_jitter: 0.35,
            radial_segments: 8,
            bark_color: [0.35, 0.24, 0.15],
            leaf_color: [0.25, 0.50, 0.20],
            leaf_color_variation: 0.08,
        }
    }

    /// Windswept bonsai: strong droop, wider spread, irregular density
    pub fn windswept() -> Self {
        Self {
            seed: 7,
            branch_jitter: 1,
            angle_spread: 0.7,
            droop: 0.6,
            root_flare: 1.3,
            leaf_color: [0.30, 0.45, 0.18],
            ..Self::bonsai()
        }
    }

    /// Sparse crown: ternary branching, shallow, small clusters
    pub fn sparse() -> Self {
        Self {
            seed: 3,
            max_depth: 4,
            branch_factor: 3,
            angle_spread: 0.6,
            radius_decay: 0.55,
            leaf_threshold_depth: 4,
            leaf_count_min: 2,
            leaf_count_max: 3,
            leaf_size: 0.7,
            ..Self::bonsai()
        }
    }

    /// Create config from style preset
    pub fn from_style(style: TreeStyle) -> Self {
        match style {
            TreeStyle::Bonsai => Self::bonsai(),
            TreeStyle::Windswept => Self::windswept(),
            TreeStyle::Sparse => Self::sparse(),
        }
    }

    /// Same parameters, different seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Upper bound on segment count: every level fully branched.
    pub fn projected_segments(&self) -> u64 {
        let factor = u64::from(self.branch_factor.saturating_add(self.branch_jitter).min(MAX_BRANCH_FACTOR));
        if self.branch_factor == 0 {
            return 1;
        }
        let mut total: u64 = 0;
        let mut level: u64 = 1;
        for _ in 0..=self.max_depth.min(MAX_DEPTH) {
            total = total.saturating_add(level);
            level = level.saturating_mul(factor);
        }
        total
    }

    /// Upper bound on vertices in the larger of the wood and leaf buffers.
    ///
    /// A segment contributes at most two rings plus two cap centres of wood,
    /// and one cluster of four-vertex quads.
    pub fn projected_vertices(&self) -> u64 {
        let segments = self.projected_segments();
        let wood = segments.saturating_mul(2 * (u64::from(self.radial_segments) + 1) + 2);
        let leaves = segments.saturating_mul(4 * u64::from(self.leaf_count_max));
        wood.max(leaves)
    }

    /// Reject configs that cannot produce a well-formed skeleton.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("angle_spread", self.angle_spread),
            ("length_decay", self.length_decay),
            ("radius_decay", self.radius_decay),
            ("min_radius", self.min_radius),
            ("initial_length", self.initial_length),
            ("initial_radius", self.initial_radius),
            ("droop", self.droop),
            ("root_flare", self.root_flare),
            ("leaf_size", self.leaf_size),
            ("leaf_rotation_jitter", self.leaf_rotation_jitter),
            ("leaf_color_variation", self.leaf_color_variation),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(Error::config(field, format!("must be finite, got {value}")));
            }
        }

        if self.max_depth > MAX_DEPTH {
            return Err(Error::config("max_depth", format!("must be at most {MAX_DEPTH}, got {}", self.max_depth)));
        }
        if self.branch_factor > MAX_BRANCH_FACTOR {
            return Err(Error::config(
                "branch_factor",
                format!("must be at most {MAX_BRANCH_FACTOR}, got {}", self.branch_factor),
            ));
        }
        if self.branch_jitter > self.branch_factor {
            return Err(Error::config("branch_jitter", "must not exceed branch_factor"));
        }
        if !(0.0..=std::f32::consts::PI).contains(&self.angle_spread) {
            return Err(Error::config("angle_spread", format!("must be in [0, pi], got {}", self.angle_spread)));
        }
        for (field, ratio) in [("length_decay", self.length_decay), ("radius_decay", self.radius_decay)] {
            if ratio <= 0.0 || ratio > 1.0 {
                return Err(Error::config(field, format!("must be in (0, 1], got {ratio}")));
            }
        }
        for (field, value) in [
            ("min_radius", self.min_radius),
            ("initial_length", self.initial_length),
            ("initial_radius", self.initial_radius),
            ("leaf_size", self.leaf_size),
        ] {
            if value <= 0.0 {
                return Err(Error::config(field, format!("must be positive, got {value}")));
            }
        }
        if self.droop < 0.0 {
            return Err(Error::config("droop", format!("must not be negative, got {}", self.droop)));
        }
        if self.root_flare < 1.0 {
            return Err(Error::config("root_flare", format!("must be at least 1.0, got {}", self.root_flare)));
        }
        if self.leaf_rotation_jitter < 0.0 {
            return Err(Error::config("leaf_rotation_jitter", "must not be negative"));
        }
        if !(0.0..=0.5).contains(&self.leaf_color_variation) {
            return Err(Error::config("leaf_color_variation", "must be in [0, 0.5]"));
        }
        if self.leaf_count_min == 0 {
            return Err(Error::config("leaf_count_min", "must be at least 1"));
        }
        if self.leaf_count_max > MAX_LEAF_COUNT {
            return Err(Error::config(
                "leaf_count_max",
                format!("must be at most {MAX_LEAF_COUNT}, got {}", self.leaf_count_max),
            ));
        }
        if self.leaf_count_min > self.leaf_count_max {
            return Err(Error::config(
                "leaf_count_min",
                format!("{} exceeds leaf_count_max {}", self.leaf_count_min, self.leaf_count_max),
            ));
        }
        if self.radial_segments < 3 {
            return Err(Error::config("radial_segments", format!("must be at least 3, got {}", self.radial_segments)));
        }
        if self.radial_segments > MAX_RADIAL_SEGMENTS {
            return Err(Error::config(
                "radial_segments",
                format!("must be at most {MAX_RADIAL_SEGMENTS}, got {}", self.radial_segments),
            ));
        }
        let projected = self.projected_segments();
        if projected > MAX_SEGMENTS {
            return Err(Error::config(
                "max_depth",
                format!("projects up to {projected} segments, limit is {MAX_SEGMENTS}"),
            ));
        }
        let vertices = self.projected_vertices();
        if vertices > u64::from(u32::MAX) {
            return Err(Error::config(
                "radial_segments",
                format!("projects up to {vertices} vertices, indices are 32-bit"),
            ));
        }
        Ok(())
    }

    /// Parse a config from JSON; absent fields take bonsai defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Write this config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for style in TreeStyle::ALL {
            let config = TreeConfig::from_style(style);
            assert!(config.validate().is_ok(), "Style {:?} failed validation", style);
        }
    }

    #[test]
    fn test_presets_differ() {
        let bonsai = TreeConfig::bonsai();
        let windswept = TreeConfig::windswept();
        let sparse = TreeConfig::sparse();

        assert!(windswept.droop > bonsai.droop);
        assert!(windswept.branch_jitter > 0);
        assert!(sparse.branch_factor > bonsai.branch_factor);
    }

    #[test]
    fn test_style_parse() {
        assert_eq!(TreeStyle::parse("Windswept"), Some(TreeStyle::Windswept));
        assert_eq!(TreeStyle::parse("oak"), None);
    }

    #[test]
    fn test_rejects_non_positive_decay() {
        let config = TreeConfig { radius_decay: 0.0, ..TreeConfig::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { field: "radius_decay", .. }));

        let config = TreeConfig { length_decay: -0.5, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "length_decay", .. })));
    }

    #[test]
    fn test_rejects_growth_ratio() {
        let config = TreeConfig { radius_decay: 1.5, ..TreeConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_min_radius() {
        let config = TreeConfig { min_radius: 0.0, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "min_radius", .. })));
    }

    #[test]
    fn test_rejects_nan() {
        let config = TreeConfig { angle_spread: f32::NAN, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "angle_spread", .. })));
    }

    #[test]
    fn test_rejects_oversized_tree() {
        let config = TreeConfig {
            max_depth: MAX_DEPTH,
            branch_factor: MAX_BRANCH_FACTOR,
            ..TreeConfig::default()
        };
        assert!(config.projected_segments() > MAX_SEGMENTS);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_leaf_counts() {
        let config = TreeConfig { leaf_count_min: 5, leaf_count_max: 2, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "leaf_count_min", .. })));
    }

    #[test]
    fn test_rejects_unbuildable_mesh_sizes() {
        let config = TreeConfig { radial_segments: u32::MAX, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "radial_segments", .. })));

        let config = TreeConfig { leaf_count_max: u32::MAX, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "leaf_count_max", .. })));

        let config = TreeConfig {
            radial_segments: MAX_RADIAL_SEGMENTS,
            leaf_count_min: MAX_LEAF_COUNT,
            leaf_count_max: MAX_LEAF_COUNT,
            ..TreeConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.projected_vertices() < u64::from(u32::MAX));
    }

    #[test]
    fn test_rejects_empty_leaf_clusters() {
        let config = TreeConfig { leaf_count_min: 0, ..TreeConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config { field: "leaf_count_min", .. })));
    }

    #[test]
    fn test_accepts_degenerate_but_valid_shapes() {
        let zero_depth = TreeConfig { max_depth: 0, ..TreeConfig::default() };
        assert!(zero_depth.validate().is_ok());
        let no_branches = TreeConfig { branch_factor: 0, ..TreeConfig::default() };
        assert!(no_branches.validate().is_ok());
        assert_eq!(no_branches.projected_segments(), 1);
    }

    #[test]
    fn test_projected_segments_binary() {
        let config = TreeConfig { max_depth: 3, branch_factor: 2, ..TreeConfig::default() };
        assert_eq!(config.projected_segments(), 15);
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config = TreeConfig::from_json_str(r#"{ "seed": 9, "max_depth": 3 }"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.radial_segments, TreeConfig::bonsai().radial_segments);
    }

    #[test]
    fn test_json_negative_depth_rejected() {
        let result = TreeConfig::from_json_str(r#"{ "max_depth": -1 }"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windswept.json");

        let config = TreeConfig::windswept().with_seed(1234);
        config.save(&path).unwrap();
        let loaded = TreeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TreeConfig::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
