//! File boundary: reading family documents, writing layouts
//!
//! The layout engine itself never fails; everything that can go wrong lives
//! here, at the point where bytes turn into graphs and back.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::family::FamilyDocument;
use crate::graph_types::GraphNode;
use crate::repulsion::RepulsionMode;
use crate::vector::Vec3;

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A serialization error occurred
    #[error("write error: {0}")]
    Write(String),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// Lower-cased file extension, or `UnknownExtension`
pub(crate) fn extension_of(path: &Path) -> IoResult<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))
}

/// Read an ancestral-synth JSON export
pub fn read_family(path: &Path) -> IoResult<FamilyDocument> {
    let ext = extension_of(path)?;
    if ext != "json" {
        return Err(IoError::UnsupportedFormat(ext));
    }
    let content = fs::read_to_string(path)?;
    FamilyDocument::from_json(&content)
}

/// One positioned person in a layout file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub generation: i32,
    pub biography_weight: f64,
    pub position: Vec3,
}

impl From<&GraphNode> for PositionedNode {
    fn from(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            generation: node.generation,
            biography_weight: node.biography_weight,
            position: node.position,
        }
    }
}

/// Layout output handed to the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    pub centered_id: String,
    pub mode: RepulsionMode,
    pub nodes: Vec<PositionedNode>,
}

impl LayoutDocument {
    pub fn new(centered_id: impl Into<String>, mode: RepulsionMode, nodes: &[GraphNode]) -> Self {
        Self {
            centered_id: centered_id.into(),
            mode,
            nodes: nodes.iter().map(PositionedNode::from).collect(),
        }
    }

    pub fn to_json(&self) -> IoResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| IoError::Write(e.to_string()))
    }
}

/// Write a layout as pretty JSON, creating parent directories as needed
pub fn write_layout(document: &LayoutDocument, output: &Path) -> IoResult<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, document.to_json()?)?;
    Ok(())
}
