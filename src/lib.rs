//! constellation - force-directed 3D layout for genealogical graphs.
//!
//! People are placed on concentric generation rings around a centered
//! person, then a force simulation (with Barnes-Hut repulsion for large
//! graphs) relaxes the configuration into a readable constellation.

pub mod config;
pub mod family;
pub mod graph_types;
pub mod io;
pub mod layout;
pub mod octree;
pub mod repulsion;
pub mod vector;

pub use config::LayoutConfig;
pub use family::{FamilyDocument, FamilyGraph};
pub use graph_types::{EdgeType, GraphEdge, GraphNode, SimEdge};
pub use io::{IoError, IoResult, LayoutDocument};
pub use layout::{ConstellationLayout, LayoutReport, center_layout};
pub use octree::SpatialTree;
pub use repulsion::{BarnesHutRepulsion, DirectRepulsion, Repulsion, RepulsionMode};
pub use vector::Vec3;
