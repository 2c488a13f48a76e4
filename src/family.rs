//! Ancestral-synth family documents
//!
//! The genealogy store exports people, events, notes and relationship links
//! as one JSON document (format name `ancestral-synth-json`). This module
//! reads that document and turns it into layout input: generations relative
//! to a centered person, biography weights, and typed edges.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph_types::{EdgeType, GraphEdge, GraphNode};
use crate::io::{IoError, IoResult};

/// Biography length (in characters) that earns the full text share of the weight
const BIOGRAPHY_FULL_CHARS: f64 = 2000.0;

/// Events plus notes that earn the full attachment share of the weight
const ATTACHMENTS_FULL_COUNT: f64 = 10.0;

const BIOGRAPHY_SHARE: f64 = 0.8;
const ATTACHMENT_SHARE: f64 = 0.2;

/// Spring strength for spouse links (parent-child links use 1.0)
const SPOUSE_STRENGTH: f64 = 0.8;

/// Document-level metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Person the constellation is built around
    #[serde(default, rename = "centeredPersonId", skip_serializing_if = "Option::is_none")]
    pub centered_person_id: Option<String>,
}

/// A person record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,

    /// Generation number as stored (absolute, not relative)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i32>,
}

impl Person {
    /// Display name: full name, else given + surname, else the id
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let joined = [self.given_name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() { self.id.clone() } else { joined }
    }
}

/// An event attached to a person (only the owner matters here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub primary_person_id: String,
}

/// A note attached to a person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub person_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildLink {
    pub parent_id: String,
    pub child_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpouseLink {
    pub person1_id: String,
    pub person2_id: String,
}

/// A complete ancestral-synth export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyDocument {
    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub persons: Vec<Person>,

    #[serde(default)]
    pub events: Vec<Event>,

    #[serde(default)]
    pub notes: Vec<Note>,

    #[serde(default)]
    pub child_links: Vec<ChildLink>,

    #[serde(default)]
    pub spouse_links: Vec<SpouseLink>,
}

/// Layout input derived from a family document
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Empty when the document has no persons
    pub centered_id: String,
}

/// Weight in [0,1] from biography length and attached events/notes
pub fn biography_weight(biography_chars: usize, attachments: usize) -> f64 {
    let text = (biography_chars as f64 / BIOGRAPHY_FULL_CHARS).min(1.0);
    let extra = (attachments as f64 / ATTACHMENTS_FULL_COUNT).min(1.0);
    BIOGRAPHY_SHARE * text + ATTACHMENT_SHARE * extra
}

impl FamilyDocument {
    pub fn from_json(content: &str) -> IoResult<Self> {
        serde_json::from_str(content).map_err(|e| IoError::Parse(e.to_string()))
    }

    fn person(&self, id: &str) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == id)
    }

    /// Person with the most parents + children + spouses.
    ///
    /// Ties go to whoever appears first in the document.
    pub fn most_central_person(&self) -> Option<&str> {
        let mut degree: HashMap<&str, usize> = HashMap::new();
        for link in &self.child_links {
            *degree.entry(link.parent_id.as_str()).or_default() += 1;
            *degree.entry(link.child_id.as_str()).or_default() += 1;
        }
        for link in &self.spouse_links {
            *degree.entry(link.person1_id.as_str()).or_default() += 1;
            *degree.entry(link.person2_id.as_str()).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for person in &self.persons {
            let d = degree.get(person.id.as_str()).copied().unwrap_or(0);
            if best.is_none_or(|(_, top)| d > top) {
                best = Some((person.id.as_str(), d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Pick the centered person: `preferred`, then the metadata, then the
    /// most central person. Ids that name no person are passed over.
    pub fn resolve_centered_id(&self, preferred: Option<&str>) -> Option<String> {
        preferred
            .into_iter()
            .chain(self.metadata.centered_person_id.as_deref())
            .find(|id| self.person(id).is_some())
            .or_else(|| self.most_central_person())
            .map(str::to_string)
    }

    /// Generation of every person relative to `centered_id`.
    ///
    /// Walks links breadth first (child +1, parent -1, spouse 0). People
    /// the walk never reaches fall back to the difference of stored
    /// generations, or 0 when either is missing.
    pub fn relative_generations(&self, centered_id: &str) -> HashMap<String, i32> {
        let mut adjacency: HashMap<&str, Vec<(&str, i32)>> = HashMap::new();
        for link in &self.child_links {
            adjacency
                .entry(link.parent_id.as_str())
                .or_default()
                .push((link.child_id.as_str(), 1));
            adjacency
                .entry(link.child_id.as_str())
                .or_default()
                .push((link.parent_id.as_str(), -1));
        }
        for link in &self.spouse_links {
            adjacency
                .entry(link.person1_id.as_str())
                .or_default()
                .push((link.person2_id.as_str(), 0));
            adjacency
                .entry(link.person2_id.as_str())
                .or_default()
                .push((link.person1_id.as_str(), 0));
        }

        let mut reached: HashMap<&str, i32> = HashMap::new();
        let mut queue = VecDeque::new();
        if self.person(centered_id).is_some() {
            reached.insert(centered_id, 0);
            queue.push_back(centered_id);
        }
        while let Some(id) = queue.pop_front() {
            let generation = reached[id];
            for &(next, step) in adjacency.get(id).map(Vec::as_slice).unwrap_or_default() {
                if !reached.contains_key(next) {
                    reached.insert(next, generation + step);
                    queue.push_back(next);
                }
            }
        }

        let anchor = self.person(centered_id).and_then(|p| p.generation);
        self.persons
            .iter()
            .map(|person| {
                let generation = reached.get(person.id.as_str()).copied().unwrap_or_else(|| {
                    match (person.generation, anchor) {
                        (Some(own), Some(anchor)) => own - anchor,
                        _ => 0,
                    }
                });
                (person.id.clone(), generation)
            })
            .collect()
    }

    /// Build layout input centered on `preferred` (or the document's choice)
    pub fn to_graph(&self, preferred: Option<&str>) -> FamilyGraph {
        let Some(centered_id) = self.resolve_centered_id(preferred) else {
            return FamilyGraph::default();
        };
        let generations = self.relative_generations(&centered_id);

        let mut attachments: HashMap<&str, usize> = HashMap::new();
        for event in &self.events {
            *attachments.entry(event.primary_person_id.as_str()).or_default() += 1;
        }
        for note in &self.notes {
            *attachments.entry(note.person_id.as_str()).or_default() += 1;
        }

        let nodes = self
            .persons
            .iter()
            .map(|person| {
                let chars = person.biography.as_deref().map_or(0, |b| b.chars().count());
                let extra = attachments.get(person.id.as_str()).copied().unwrap_or(0);
                GraphNode::new(person.id.clone(), generations.get(&person.id).copied().unwrap_or(0))
                    .with_name(person.display_name())
                    .with_biography_weight(biography_weight(chars, extra))
            })
            .collect();

        let child_edges = self
            .child_links
            .iter()
            .map(|link| GraphEdge::new(link.parent_id.clone(), link.child_id.clone(), EdgeType::ParentChild));
        let spouse_edges = self.spouse_links.iter().map(|link| {
            GraphEdge::new(link.person1_id.clone(), link.person2_id.clone(), EdgeType::Spouse)
                .with_strength(SPOUSE_STRENGTH)
        });

        FamilyGraph {
            nodes,
            edges: child_edges.chain(spouse_edges).collect(),
            centered_id,
        }
    }
}
