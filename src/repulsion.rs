//! Many-body repulsion strategies
//!
//! Both strategies apply the same law: a magnitude of
//! `strength / (distance² + softening)` pushing the pair apart. The spatial
//! tree only changes how the sum is evaluated.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::graph_types::GraphNode;
use crate::octree::SpatialTree;
use crate::vector::Vec3;

/// Repulsion on a point at `target` from a source of `strength` at `source`
pub fn pair_force(target: Vec3, source: Vec3, strength: f64, softening: f64) -> Vec3 {
    let delta = target - source;
    let magnitude = strength / (delta.length_squared() + softening);
    delta.normalize() * magnitude
}

/// How repulsion is evaluated for a layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepulsionMode {
    /// Exact O(n²) pairwise sum
    Direct,
    /// O(n log n) octree approximation
    BarnesHut,
}

impl RepulsionMode {
    /// Tree mode once the node count exceeds `threshold`
    pub fn for_node_count(count: usize, threshold: usize) -> Self {
        if count > threshold {
            RepulsionMode::BarnesHut
        } else {
            RepulsionMode::Direct
        }
    }

    /// Create the strategy for this mode
    pub fn strategy(self, config: &LayoutConfig) -> Box<dyn Repulsion> {
        match self {
            RepulsionMode::Direct => Box::new(DirectRepulsion::new(config.softening)),
            RepulsionMode::BarnesHut => Box::new(BarnesHutRepulsion::new(config.theta, config.softening)),
        }
    }
}

/// Adds many-body repulsion into each node's velocity
pub trait Repulsion {
    fn mode(&self) -> RepulsionMode;

    /// Accumulate repulsion of `strength` into `velocity` of every node
    fn apply(&mut self, nodes: &mut [GraphNode], strength: f64);
}

/// Exact pairwise repulsion, applied equal and opposite
#[derive(Debug, Clone)]
pub struct DirectRepulsion {
    softening: f64,
}

impl DirectRepulsion {
    pub fn new(softening: f64) -> Self {
        Self { softening }
    }
}

impl Repulsion for DirectRepulsion {
    fn mode(&self) -> RepulsionMode {
        RepulsionMode::Direct
    }

    fn apply(&mut self, nodes: &mut [GraphNode], strength: f64) {
        let n = nodes.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let force = pair_force(nodes[i].position, nodes[j].position, strength, self.softening);
                nodes[i].velocity += force;
                nodes[j].velocity -= force;
            }
        }
    }
}

/// Barnes-Hut repulsion over a tree rebuilt on every call
#[derive(Debug, Clone)]
pub struct BarnesHutRepulsion {
    tree: SpatialTree,
    positions: Vec<Vec3>,
}

impl BarnesHutRepulsion {
    pub fn new(theta: f64, softening: f64) -> Self {
        Self {
            tree: SpatialTree::new(theta, softening),
            positions: Vec::new(),
        }
    }
}

impl Repulsion for BarnesHutRepulsion {
    fn mode(&self) -> RepulsionMode {
        RepulsionMode::BarnesHut
    }

    fn apply(&mut self, nodes: &mut [GraphNode], strength: f64) {
        self.positions.clear();
        self.positions.extend(nodes.iter().map(|n| n.position));
        self.tree.build(&self.positions);

        for (i, node) in nodes.iter_mut().enumerate() {
            node.velocity += self.tree.calculate_force(i, node.position, strength);
        }
    }
}
