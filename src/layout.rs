//! Constellation layout orchestrator
//!
//! One layout pass places every node on a generation ring, anneals the
//! configuration with a fixed number of force steps, and finally recenters it
//! on the origin.
//!
//! Forces per step:
//!
//! - **Repulsion**: every pair, exact or via the spatial tree
//! - **Attraction**: Hookean springs along edges, rest length by edge type
//! - **Centering**: weak horizontal pull toward the vertical axis
//! - **Layering**: pull toward each generation's height and ring radius
//!
//! The accumulated force is scaled by a temperature that falls linearly from
//! 1.0 to 0.2 over the run before it is added to the position.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::LayoutConfig;
use crate::graph_types::{GraphEdge, GraphNode, SimEdge};
use crate::repulsion::{Repulsion, RepulsionMode};
use crate::vector::Vec3;

/// π·(3 − √5), about 137.5°
pub const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Per-axis jitter bound added at initialization
pub const JITTER: f64 = 0.005;

/// Generation 0 ring radius is `base + per_node * count`
const CENTER_RING_BASE: f64 = 15.0;
const CENTER_RING_PER_NODE: f64 = 3.0;

/// Extra radius at biography weight 1.0
const BIOGRAPHY_RADIUS: f64 = 5.0;

/// Angular offset between adjacent rings
const RING_OFFSET: f64 = PI / 6.0;

/// Fraction of the temperature removed by the end of the run
const COOLING: f64 = 0.8;

/// Where the centered node starts, before jitter
const CENTER_NUDGE: Vec3 = Vec3::new(0.001, 0.0, 0.0);

/// Cooling schedule: 1.0 at the start, 0.2 at the end
pub fn temperature(progress: f64) -> f64 {
    1.0 - progress * COOLING
}

/// Summary of a finished layout pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub mode: RepulsionMode,
    pub iterations: usize,
    /// Mean per-node displacement in the last step
    pub final_displacement: f64,
}

/// Computes constellation positions for a genealogical graph
#[derive(Debug, Clone, Default)]
pub struct ConstellationLayout {
    config: LayoutConfig,
}

impl ConstellationLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Run a full layout pass, seeding jitter from the configuration.
    pub fn calculate(&self, nodes: &mut [GraphNode], edges: &[GraphEdge], centered_id: &str) -> LayoutReport {
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.calculate_with_rng(nodes, edges, centered_id, &mut rng)
    }

    /// Run a full layout pass with a caller-supplied jitter source.
    ///
    /// Edges naming unknown nodes are ignored. Every node has a position when
    /// this returns, and the mean position is the origin.
    pub fn calculate_with_rng<R: Rng>(
        &self,
        nodes: &mut [GraphNode],
        edges: &[GraphEdge],
        centered_id: &str,
        rng: &mut R,
    ) -> LayoutReport {
        let mut repulsion = RepulsionMode::for_node_count(nodes.len(), self.config.tree_threshold).strategy(&self.config);
        let mode = repulsion.mode();
        if nodes.is_empty() {
            return LayoutReport {
                mode,
                iterations: 0,
                final_displacement: 0.0,
            };
        }

        let sim_edges = SimEdge::resolve(nodes, edges);
        let skipped = edges.len() - sim_edges.len();
        if skipped > 0 {
            debug!(skipped, "ignoring edges with unknown endpoints");
        }

        let iterations = self.config.iterations;
        debug!(
            nodes = nodes.len(),
            edges = sim_edges.len(),
            ?mode,
            iterations,
            "starting constellation layout"
        );

        self.initialize_positions(nodes, centered_id, rng);

        let mut final_displacement = 0.0;
        for i in 0..iterations {
            let progress = i as f64 / iterations as f64;
            final_displacement = self.simulation_step(nodes, &sim_edges, progress, repulsion.as_mut());
            trace!(
                iteration = i,
                temperature = temperature(progress),
                displacement = final_displacement,
                "simulation step"
            );
        }

        center_layout(nodes);

        debug!(final_displacement, "constellation layout finished");
        LayoutReport {
            mode,
            iterations,
            final_displacement,
        }
    }

    /// Ring radius used at initialization for `generation` with `count` members
    pub fn initial_ring_radius(&self, generation: i32, count: usize) -> f64 {
        if generation == 0 {
            CENTER_RING_BASE + count as f64 * CENTER_RING_PER_NODE
        } else {
            self.target_ring_radius(generation)
        }
    }

    /// Ring radius the layering force pulls generation `generation` toward
    pub fn target_ring_radius(&self, generation: i32) -> f64 {
        generation.unsigned_abs() as f64 * self.config.generation_spacing
    }

    /// Height of generation `generation`
    pub fn target_height(&self, generation: i32) -> f64 {
        generation as f64 * self.config.vertical_spacing
    }

    /// Place every node on its generation ring and zero all velocities.
    ///
    /// Within a ring, consecutive nodes (in input order) are one golden angle
    /// apart. The node named `centered_id` is moved next to the origin.
    pub fn initialize_positions<R: Rng>(&self, nodes: &mut [GraphNode], centered_id: &str, rng: &mut R) {
        let mut generations: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            generations.entry(node.generation).or_default().push(i);
        }

        for (&generation, members) in &generations {
            let base_radius = self.initial_ring_radius(generation, members.len());
            let ring_offset = generation as f64 * RING_OFFSET;
            let height = self.target_height(generation);

            for (k, &i) in members.iter().enumerate() {
                let node = &mut nodes[i];
                let angle = k as f64 * GOLDEN_ANGLE + ring_offset;
                let radius = base_radius + node.biography_weight * BIOGRAPHY_RADIUS;
                node.position = Vec3::new(radius * angle.cos(), height, radius * angle.sin()) + jitter(rng);
                node.velocity = Vec3::ZERO;
            }
        }

        if let Some(centered) = nodes.iter_mut().find(|n| n.id == centered_id) {
            centered.position = CENTER_NUDGE + jitter(rng);
        }
    }

    /// Advance the simulation by one step.
    ///
    /// `progress` is the fraction of the run already completed. Returns the
    /// mean distance moved by a node in this step.
    pub fn simulation_step(
        &self,
        nodes: &mut [GraphNode],
        edges: &[SimEdge],
        progress: f64,
        repulsion: &mut dyn Repulsion,
    ) -> f64 {
        if nodes.is_empty() {
            return 0.0;
        }

        for node in nodes.iter_mut() {
            node.velocity = Vec3::ZERO;
        }

        repulsion.apply(nodes, self.config.repulsion_force);
        self.apply_attraction(nodes, edges);
        self.apply_center_force(nodes);
        self.apply_generation_layering(nodes);

        let temperature = temperature(progress);
        let mut moved = 0.0;
        for node in nodes.iter_mut() {
            let velocity = match self.config.max_velocity {
                Some(limit) => node.velocity.clamp_length(limit),
                None => node.velocity,
            };
            let step = velocity * temperature;
            node.position += step;
            moved += step.length();
        }

        moved / nodes.len() as f64
    }

    /// Spring force between connected nodes
    fn apply_attraction(&self, nodes: &mut [GraphNode], edges: &[SimEdge]) {
        for edge in edges {
            let (source, target) = (edge.source, edge.target);
            if source == target {
                continue;
            }

            let delta = nodes[target].position - nodes[source].position;
            let ideal = self.config.generation_spacing * edge.edge_type.rest_length_factor();

            // Hooke's law: positive when stretched, negative when compressed
            let stretch = delta.length() - ideal;
            let pull = delta.normalize() * (stretch * self.config.attraction_force * edge.strength);

            nodes[source].velocity += pull;
            nodes[target].velocity -= pull;
        }
    }

    /// Horizontal pull toward the vertical axis
    fn apply_center_force(&self, nodes: &mut [GraphNode]) {
        for node in nodes.iter_mut() {
            node.velocity.x -= node.position.x * self.config.center_force;
            node.velocity.z -= node.position.z * self.config.center_force;
        }
    }

    /// Keep generations on their heights and rings
    fn apply_generation_layering(&self, nodes: &mut [GraphNode]) {
        for node in nodes.iter_mut() {
            let height_error = self.target_height(node.generation) - node.position.y;
            node.velocity.y += height_error * self.config.layer_strength;

            if node.generation == 0 {
                continue;
            }

            let radius = node.position.horizontal_length();
            if radius <= f64::EPSILON {
                continue;
            }
            let radial = Vec3::new(node.position.x / radius, 0.0, node.position.z / radius);
            let radius_error = self.target_ring_radius(node.generation) - radius;
            node.velocity += radial * (radius_error * self.config.ring_strength);
        }
    }
}

/// Shift all nodes so their mean position is the origin
pub fn center_layout(nodes: &mut [GraphNode]) {
    if nodes.is_empty() {
        return;
    }

    let sum = nodes.iter().fold(Vec3::ZERO, |acc, n| acc + n.position);
    let mean = sum * (1.0 / nodes.len() as f64);

    for node in nodes.iter_mut() {
        node.position -= mean;
    }
}

fn jitter<R: Rng>(rng: &mut R) -> Vec3 {
    Vec3::new(
        rng.gen_range(-JITTER..=JITTER),
        rng.gen_range(-JITTER..=JITTER),
        rng.gen_range(-JITTER..=JITTER),
    )
}
