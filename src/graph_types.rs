//! Graph data types consumed and produced by the layout engine
//!
//! Nodes and edges are built by the data layer (see [`crate::family`]) and
//! handed to [`crate::layout::ConstellationLayout`], which fills in positions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

/// Relationship kind, which determines the spring rest length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeType {
    /// Parent to child
    ParentChild,
    /// Married or partnered couple
    Spouse,
    /// Sibling or any other relationship
    #[serde(alias = "sibling")]
    Other,
}

impl EdgeType {
    /// Rest length as a fraction of the generation spacing
    pub fn rest_length_factor(self) -> f64 {
        match self {
            EdgeType::ParentChild => 1.0,
            EdgeType::Spouse => 0.3,
            EdgeType::Other => 0.5,
        }
    }
}

/// A person in the constellation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier (person id)
    pub id: String,

    /// Label shown by the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Depth relative to the centered person (negative = ancestors)
    pub generation: i32,

    /// Importance score in [0,1] derived from biographical content
    #[serde(default)]
    pub biography_weight: f64,

    /// Position in 3D space, owned by the layout engine during a pass
    #[serde(default)]
    pub position: Vec3,

    /// Per-step force accumulator
    #[serde(skip)]
    pub velocity: Vec3,
}

impl GraphNode {
    /// Create a node at the origin with no biography weight
    pub fn new(id: impl Into<String>, generation: i32) -> Self {
        Self {
            id: id.into(),
            name: None,
            generation,
            biography_weight: 0.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
        }
    }

    /// Set the display label
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the biography weight
    pub fn with_biography_weight(mut self, weight: f64) -> Self {
        self.biography_weight = weight;
        self
    }
}

fn default_strength() -> f64 {
    1.0
}

/// A relationship between two node ids
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Source node ID
    pub source_id: String,

    /// Target node ID
    pub target_id: String,

    /// Relationship kind
    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    /// Attraction multiplier in [0,1]
    #[serde(default = "default_strength")]
    pub strength: f64,
}

impl GraphEdge {
    /// Create a full-strength edge
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            strength: default_strength(),
        }
    }

    /// Set the attraction strength
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }
}

/// An edge for simulation (indices into node array)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimEdge {
    pub source: usize,
    pub target: usize,
    pub edge_type: EdgeType,
    pub strength: f64,
}

impl SimEdge {
    /// Resolve id-based edges against a node slice.
    ///
    /// Edges with an endpoint missing from `nodes` are dropped.
    pub fn resolve(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<SimEdge> {
        let node_id_to_index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        edges
            .iter()
            .filter_map(|e| {
                let source = node_id_to_index.get(e.source_id.as_str())?;
                let target = node_id_to_index.get(e.target_id.as_str())?;
                Some(SimEdge {
                    source: *source,
                    target: *target,
                    edge_type: e.edge_type,
                    strength: e.strength,
                })
            })
            .collect()
    }
}
