//! Barnes-Hut spatial partition tree
//!
//! An octree over the current node positions, rebuilt from scratch every
//! simulation step. Nodes live in a flat arena and refer to their children by
//! index. Each tree node owns a contiguous range of the `order` buffer, so
//! leaves never allocate and a rebuild reuses every buffer from the previous
//! step. Queries walk the tree on a fixed-size stack and do not allocate.
//!
//! Long-range repulsion is approximated with the theta criterion: a region
//! whose side length divided by the distance to its center of mass is below
//! `theta` acts as a single point mass.

use crate::repulsion::pair_force;
use crate::vector::Vec3;

/// Sentinel for an absent child
const NO_CHILD: u32 = u32::MAX;

/// Recursion stops at this depth regardless of point count
const MAX_DEPTH: u32 = 32;

/// Pending regions during a query: at most 7 siblings per level plus the
/// children of the deepest internal node
const STACK_CAPACITY: usize = 8 * (MAX_DEPTH as usize + 1);

/// Regions smaller than this are never subdivided
const MIN_HALF_SIZE: f64 = 1e-6;

/// Added to the bounding cube so points never sit on its outer faces
const BOUNDS_PADDING: f64 = 1e-3;

/// Maximum number of points in a leaf
pub const LEAF_CAPACITY: usize = 1;

#[derive(Debug, Clone)]
struct OctreeNode {
    /// Geometric center of the cube
    center: Vec3,
    half_size: f64,
    /// Number of points below this node
    mass: f64,
    center_of_mass: Vec3,
    children: [u32; 8],
    /// Range into `SpatialTree::order`
    first: usize,
    count: usize,
}

impl OctreeNode {
    fn new(center: Vec3, half_size: f64, first: usize, count: usize) -> Self {
        Self {
            center,
            half_size,
            mass: 0.0,
            center_of_mass: Vec3::ZERO,
            children: [NO_CHILD; 8],
            first,
            count,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c == NO_CHILD)
    }

    /// Inclusive containment, so points on a shared face count for both sides
    fn contains(&self, p: Vec3) -> bool {
        (p.x - self.center.x).abs() <= self.half_size
            && (p.y - self.center.y).abs() <= self.half_size
            && (p.z - self.center.z).abs() <= self.half_size
    }
}

/// Octant index: bit 0 = +x, bit 1 = +y, bit 2 = +z
fn octant(center: Vec3, p: Vec3) -> usize {
    (p.x >= center.x) as usize | ((p.y >= center.y) as usize) << 1 | ((p.z >= center.z) as usize) << 2
}

fn octant_center(center: Vec3, quarter: f64, octant: usize) -> Vec3 {
    let sign = |bit: usize| if octant & bit != 0 { quarter } else { -quarter };
    center + Vec3::new(sign(1), sign(2), sign(4))
}

/// Barnes-Hut octree with reusable buffers
#[derive(Debug, Clone)]
pub struct SpatialTree {
    theta: f64,
    softening: f64,
    nodes: Vec<OctreeNode>,
    /// Point indices, partitioned so every tree node covers a contiguous range
    order: Vec<usize>,
    scratch: Vec<usize>,
    positions: Vec<Vec3>,
}

impl SpatialTree {
    pub fn new(theta: f64, softening: f64) -> Self {
        Self {
            theta,
            softening,
            nodes: Vec::new(),
            order: Vec::new(),
            scratch: Vec::new(),
            positions: Vec::new(),
        }
    }

    /// Number of points in the last build
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of regions (internal nodes and leaves) in the last build
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Aggregate mass and center of mass of the whole tree
    pub fn root_aggregate(&self) -> Option<(f64, Vec3)> {
        self.nodes.first().map(|n| (n.mass, n.center_of_mass))
    }

    /// Rebuild the tree over `positions`, discarding the previous build
    pub fn build(&mut self, positions: &[Vec3]) {
        self.nodes.clear();
        self.order.clear();
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.order.extend(0..positions.len());

        if positions.is_empty() {
            return;
        }

        let mut min = positions[0];
        let mut max = positions[0];
        for p in &positions[1..] {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }

        let extent = max - min;
        let half_size = extent.x.max(extent.y).max(extent.z) * 0.5 + BOUNDS_PADDING;
        let center = (min + max) * 0.5;

        self.build_node(0, positions.len(), center, half_size, 0);
    }

    /// Build the subtree for `order[first..first + count]` and aggregate it
    fn build_node(&mut self, first: usize, count: usize, center: Vec3, half_size: f64, depth: u32) -> u32 {
        let idx = self.nodes.len();
        self.nodes.push(OctreeNode::new(center, half_size, first, count));

        if count <= LEAF_CAPACITY || depth >= MAX_DEPTH || half_size <= MIN_HALF_SIZE {
            let mut sum = Vec3::ZERO;
            for &p in &self.order[first..first + count] {
                sum += self.positions[p];
            }
            let node = &mut self.nodes[idx];
            node.mass = count as f64;
            node.center_of_mass = sum * (1.0 / count as f64);
            return idx as u32;
        }

        // Counting sort of the range into octants
        let mut counts = [0usize; 8];
        for &p in &self.order[first..first + count] {
            counts[octant(center, self.positions[p])] += 1;
        }
        let mut offsets = [0usize; 8];
        for o in 1..8 {
            offsets[o] = offsets[o - 1] + counts[o - 1];
        }

        self.scratch.clear();
        self.scratch.resize(count, 0);
        let mut cursor = offsets;
        for k in first..first + count {
            let p = self.order[k];
            let o = octant(center, self.positions[p]);
            self.scratch[cursor[o]] = p;
            cursor[o] += 1;
        }
        self.order[first..first + count].copy_from_slice(&self.scratch[..count]);

        let quarter = half_size * 0.5;
        let mut mass = 0.0;
        let mut weighted = Vec3::ZERO;
        for o in 0..8 {
            if counts[o] == 0 {
                continue;
            }
            let child = self.build_node(
                first + offsets[o],
                counts[o],
                octant_center(center, quarter, o),
                quarter,
                depth + 1,
            );
            let child_node = &self.nodes[child as usize];
            mass += child_node.mass;
            weighted += child_node.center_of_mass * child_node.mass;
            self.nodes[idx].children[o] = child;
        }

        let node = &mut self.nodes[idx];
        node.mass = mass;
        node.center_of_mass = weighted * (1.0 / mass);
        idx as u32
    }

    /// Approximate repulsion on point `node_index` located at `position`.
    ///
    /// The point itself contributes nothing. An empty tree yields zero.
    pub fn calculate_force(&self, node_index: usize, position: Vec3, strength: f64) -> Vec3 {
        let mut force = Vec3::ZERO;
        if self.nodes.is_empty() {
            return force;
        }

        let mut stack = [0u32; STACK_CAPACITY];
        let mut pending = 1;

        while pending > 0 {
            pending -= 1;
            let node = &self.nodes[stack[pending] as usize];

            if node.is_leaf() {
                for &body in &self.order[node.first..node.first + node.count] {
                    if body != node_index {
                        force += pair_force(position, self.positions[body], strength, self.softening);
                    }
                }
                continue;
            }

            // A region holding the query point is always opened, which keeps
            // the point out of any aggregate it would otherwise be part of.
            let dist = (position - node.center_of_mass).length();
            let far_enough = !node.contains(position) && dist > 0.0 && (2.0 * node.half_size) / dist < self.theta;

            if far_enough {
                force += pair_force(position, node.center_of_mass, strength * node.mass, self.softening);
            } else {
                for &child in node.children.iter().filter(|&&c| c != NO_CHILD) {
                    stack[pending] = child;
                    pending += 1;
                }
            }
        }

        force
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_positions(count: usize, extent: f64, seed: u64) -> Vec<Vec3> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                    rng.gen_range(-extent..extent),
                )
            })
            .collect()
    }

    fn direct_force(positions: &[Vec3], i: usize, strength: f64, softening: f64) -> Vec3 {
        let mut force = Vec3::ZERO;
        for (j, p) in positions.iter().enumerate() {
            if j != i {
                force += pair_force(positions[i], *p, strength, softening);
            }
        }
        force
    }

    #[test]
    fn empty_tree_yields_zero_force() {
        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&[]);

        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.calculate_force(0, Vec3::new(1.0, 2.0, 3.0), 100.0), Vec3::ZERO);
    }

    #[test]
    fn single_point_has_no_self_force() {
        let mut tree = SpatialTree::new(0.7, 1.0);
        let p = Vec3::new(4.0, -2.0, 9.0);
        tree.build(&[p]);

        assert_eq!(tree.calculate_force(0, p, 100.0), Vec3::ZERO);
    }

    #[test]
    fn root_aggregates_mass_and_center() {
        let positions = random_positions(200, 50.0, 1);
        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&positions);

        let (mass, com) = tree.root_aggregate().unwrap();
        let mean = positions.iter().fold(Vec3::ZERO, |acc, p| acc + *p) * (1.0 / 200.0);

        assert_eq!(mass, 200.0);
        assert!((com - mean).length() < 1e-9);
        assert!(tree.node_count() > 200);
    }

    #[test]
    fn rebuild_discards_previous_points() {
        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&random_positions(50, 10.0, 2));
        tree.build(&[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root_aggregate().unwrap().0, 2.0);
    }

    #[test]
    fn coincident_points_terminate() {
        let positions = vec![Vec3::new(5.0, 5.0, 5.0); 20];
        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&positions);

        assert_eq!(tree.root_aggregate().unwrap().0, 20.0);
        let force = tree.calculate_force(0, positions[0], 100.0);
        assert!(force.is_finite());
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn nearly_coincident_points_push_apart() {
        let positions = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.001, 0.0, 0.0), Vec3::new(50.0, 0.0, 0.0)];
        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&positions);

        let force = tree.calculate_force(0, positions[0], 100.0);
        assert!(force.is_finite());
        assert!(force.x < 0.0, "point 0 should be pushed away from +x neighbors");
    }

    #[test]
    fn zero_theta_matches_direct_sum() {
        let positions = random_positions(150, 40.0, 3);
        let mut tree = SpatialTree::new(0.0, 1.0);
        tree.build(&positions);

        for i in 0..positions.len() {
            let exact = direct_force(&positions, i, 300.0, 1.0);
            let approx = tree.calculate_force(i, positions[i], 300.0);
            assert!((exact - approx).length() <= 1e-9 * exact.length().max(1.0));
        }
    }

    #[test]
    fn deepest_subdivision_queries_match_direct_sum() {
        // A wide cube with a tight cluster near one corner subdivides down to
        // the depth limit along the chain toward the cluster.
        let mut positions = vec![Vec3::new(10_000.0, 10_000.0, 10_000.0)];
        positions.extend((0..4).map(|k| Vec3::new(k as f64 * 1e-7, 0.0, 0.0)));
        positions.extend((1..40).map(|k| Vec3::new(10_000.0 * 0.5f64.powi(k), 0.0, 0.0)));

        let mut tree = SpatialTree::new(0.0, 1.0);
        tree.build(&positions);
        assert!(tree.node_count() > 64);

        for i in 0..positions.len() {
            let exact = direct_force(&positions, i, 300.0, 1.0);
            let approx = tree.calculate_force(i, positions[i], 300.0);
            assert!(approx.is_finite());
            assert!((exact - approx).length() <= 1e-9 * exact.length().max(1.0));
        }
    }

    #[test]
    fn default_theta_stays_within_ten_percent() {
        let positions = random_positions(400, 100.0, 4);
        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&positions);

        let mut error = 0.0;
        let mut magnitude = 0.0;
        for i in 0..positions.len() {
            let exact = direct_force(&positions, i, 300.0, 1.0);
            let approx = tree.calculate_force(i, positions[i], 300.0);
            error += (exact - approx).length();
            magnitude += exact.length();
        }

        let relative = error / magnitude;
        assert!(relative < 0.1, "relative error {relative} too large");
    }

    #[test]
    fn error_shrinks_with_theta() {
        let positions = random_positions(300, 100.0, 5);
        let relative_error = |theta: f64| {
            let mut tree = SpatialTree::new(theta, 1.0);
            tree.build(&positions);
            let mut error = 0.0;
            let mut magnitude = 0.0;
            for i in 0..positions.len() {
                let exact = direct_force(&positions, i, 300.0, 1.0);
                error += (exact - tree.calculate_force(i, positions[i], 300.0)).length();
                magnitude += exact.length();
            }
            error / magnitude
        };

        assert!(relative_error(0.3) <= relative_error(1.2));
    }

    #[test]
    fn distant_cluster_acts_as_point_mass() {
        // Tight cluster of 10 points far along +x
        let mut positions: Vec<Vec3> = (0..10)
            .map(|i| Vec3::new(1000.0 + i as f64 * 0.1, 0.0, 0.0))
            .collect();
        positions.push(Vec3::ZERO);
        let query = positions.len() - 1;

        let mut tree = SpatialTree::new(0.7, 1.0);
        tree.build(&positions);

        let force = tree.calculate_force(query, Vec3::ZERO, 1.0);
        let expected = 10.0 / (1000.45_f64.powi(2) + 1.0);

        assert!(force.x < 0.0);
        assert!((force.length() - expected).abs() / expected < 1e-3);
    }
}
