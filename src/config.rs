//! Layout configuration
//!
//! Every field has a default, so a configuration file only needs the keys it
//! wants to change. Values are not range-checked.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::{IoError, IoResult, extension_of};

// =============================================================================
// Default Constants
// =============================================================================

/// Default number of simulation steps
pub const DEFAULT_ITERATIONS: usize = 300;

/// Default ring spacing per generation (also the parent-child rest length)
pub const DEFAULT_GENERATION_SPACING: f64 = 50.0;

/// Default repulsion strength
pub const DEFAULT_REPULSION_FORCE: f64 = 300.0;

/// Default spring coefficient for edges
pub const DEFAULT_ATTRACTION_FORCE: f64 = 0.1;

/// Default horizontal pull toward the origin
pub const DEFAULT_CENTER_FORCE: f64 = 0.01;

/// Default height step between generations
pub const DEFAULT_VERTICAL_SPACING: f64 = 8.0;

/// Default pull toward each generation's target height
pub const DEFAULT_LAYER_STRENGTH: f64 = 0.1;

/// Default pull toward each generation's target ring radius
pub const DEFAULT_RING_STRENGTH: f64 = 0.1;

/// Default Barnes-Hut theta approximation threshold (0 = exact, 1 = fast)
pub const DEFAULT_THETA: f64 = 0.7;

/// Default softening added to squared distance (avoids singularity)
pub const DEFAULT_SOFTENING: f64 = 1.0;

/// Node counts above this use the spatial tree for repulsion
pub const DEFAULT_TREE_THRESHOLD: usize = 100;

/// Configuration for one layout pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Number of simulation steps
    pub iterations: usize,
    /// Ring radius per generation
    pub generation_spacing: f64,
    /// Repulsion strength between every pair of nodes
    pub repulsion_force: f64,
    /// Spring coefficient for edges
    pub attraction_force: f64,
    /// Horizontal pull toward the origin
    pub center_force: f64,
    /// Height step between generations
    pub vertical_spacing: f64,
    /// Pull toward each generation's target height
    pub layer_strength: f64,
    /// Pull toward each generation's target ring radius
    pub ring_strength: f64,
    /// Barnes-Hut opening threshold
    pub theta: f64,
    /// Added to squared distance in the repulsion law
    pub softening: f64,
    /// Node counts above this use the spatial tree
    pub tree_threshold: usize,
    /// Optional per-step clamp on the accumulated force; unbounded when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_velocity: Option<f64>,
    /// Jitter seed; `None` draws from OS entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            generation_spacing: DEFAULT_GENERATION_SPACING,
            repulsion_force: DEFAULT_REPULSION_FORCE,
            attraction_force: DEFAULT_ATTRACTION_FORCE,
            center_force: DEFAULT_CENTER_FORCE,
            vertical_spacing: DEFAULT_VERTICAL_SPACING,
            layer_strength: DEFAULT_LAYER_STRENGTH,
            ring_strength: DEFAULT_RING_STRENGTH,
            theta: DEFAULT_THETA,
            softening: DEFAULT_SOFTENING,
            tree_threshold: DEFAULT_TREE_THRESHOLD,
            max_velocity: None,
            seed: None,
        }
    }
}

impl LayoutConfig {
    /// Set the iteration count
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Fix the jitter seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the node count above which the spatial tree is used
    pub fn with_tree_threshold(mut self, threshold: usize) -> Self {
        self.tree_threshold = threshold;
        self
    }

    /// Clamp the accumulated force to `limit` before integrating
    pub fn with_max_velocity(mut self, limit: f64) -> Self {
        self.max_velocity = Some(limit);
        self
    }

    /// Load a configuration file, picking the format from its extension
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = extension_of(path)?;
        let content = fs::read_to_string(path)?;
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            other => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_yaml(content: &str) -> IoResult<Self> {
        serde_yaml::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    pub fn from_json(content: &str) -> IoResult<Self> {
        serde_json::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    /// Render as YAML (used by `constellation config`)
    pub fn to_yaml(&self) -> IoResult<String> {
        serde_yaml::to_string(self).map_err(|e| IoError::Write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = LayoutConfig::from_yaml("iterations: 10\ngenerationSpacing: 80\n").unwrap();

        assert_eq!(config.iterations, 10);
        assert_eq!(config.generation_spacing, 80.0);
        assert_eq!(config.repulsion_force, DEFAULT_REPULSION_FORCE);
        assert_eq!(config.theta, DEFAULT_THETA);
        assert_eq!(config.max_velocity, None);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn default_config_has_no_velocity_clamp() {
        let yaml = LayoutConfig::default().to_yaml().unwrap();
        assert!(!yaml.contains("maxVelocity"));

        let clamped = LayoutConfig::default().with_max_velocity(25.0);
        assert!(clamped.to_yaml().unwrap().contains("maxVelocity: 25.0"));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let config = LayoutConfig::from_json(
            r#"{"repulsionForce": 12.5, "attractionForce": 0.2, "centerForce": 0.5, "seed": 7}"#,
        )
        .unwrap();

        assert_eq!(config.repulsion_force, 12.5);
        assert_eq!(config.attraction_force, 0.2);
        assert_eq!(config.center_force, 0.5);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn yaml_output_reads_back() {
        let config = LayoutConfig::default().with_iterations(42).with_seed(3);
        let yaml = config.to_yaml().unwrap();

        assert!(yaml.contains("generationSpacing"));
        assert_eq!(LayoutConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let err = LayoutConfig::from_yaml("iterations: [not a number").unwrap_err();
        assert!(matches!(err, IoError::Parse(_)));
    }

    #[test]
    fn from_path_dispatches_on_extension() {
        let dir = TempDir::new().unwrap();

        let yaml_path = dir.path().join("layout.yml");
        fs::write(&yaml_path, "treeThreshold: 5\n").unwrap();
        assert_eq!(LayoutConfig::from_path(&yaml_path).unwrap().tree_threshold, 5);

        let json_path = dir.path().join("layout.json");
        fs::write(&json_path, r#"{"maxVelocity": 3.0}"#).unwrap();
        assert_eq!(LayoutConfig::from_path(&json_path).unwrap().max_velocity, Some(3.0));

        let toml_path = dir.path().join("layout.toml");
        fs::write(&toml_path, "iterations = 1").unwrap();
        assert!(matches!(
            LayoutConfig::from_path(&toml_path),
            Err(IoError::UnsupportedFormat(_))
        ));
    }
}
