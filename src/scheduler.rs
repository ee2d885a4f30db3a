//! Entity creation-order scheduling.
//!
//! Entities are scheduled so that whatever an entity physically references
//! (foreign key, join table) already exists when the entity is created. Each
//! injected field contributes one directed dependency edge from its owning
//! class to its target class, tagged with the association cardinality; the
//! scheduler then peels entities off greedily, in document order, whenever
//! every edge still touching them allows it.

use crate::error::ModelError;
use crate::model::{Cardinality, ParsedModel};

/// A dependency edge as seen by the scheduler, before reflexive retagging.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEdge {
    pub source: String,
    pub destination: String,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    /// Self-reference; never a blocking constraint.
    Reflexive,
}

#[derive(Debug, Clone, PartialEq)]
struct Edge {
    source: String,
    destination: String,
    kind: EdgeKind,
}

impl Edge {
    fn touches(&self, class: &str) -> bool {
        self.source == class || self.destination == class
    }
}

pub struct Scheduler {
    class_names: Vec<String>,
    pool: Vec<Edge>,
    ordered: Vec<String>,
}

impl Scheduler {
    pub fn new(class_names: Vec<String>, edges: Vec<DependencyEdge>) -> Self {
        let pool = edges
            .into_iter()
            .map(|e| {
                let kind = if e.source == e.destination {
                    EdgeKind::Reflexive
                } else {
                    match e.cardinality {
                        Cardinality::OneToOne => EdgeKind::OneToOne,
                        Cardinality::OneToMany => EdgeKind::OneToMany,
                        Cardinality::ManyToOne => EdgeKind::ManyToOne,
                        Cardinality::ManyToMany => EdgeKind::ManyToMany,
                    }
                };
                Edge {
                    source: e.source,
                    destination: e.destination,
                    kind,
                }
            })
            .collect();
        Self {
            class_names,
            pool,
            ordered: Vec::new(),
        }
    }

    /// One scheduler over every class in the model, with one edge per
    /// injected field.
    pub fn from_model(model: &ParsedModel) -> Self {
        let class_names = model.classes().map(|(_, c)| c.name.clone()).collect();
        let edges = model
            .injected_fields()
            .iter()
            .map(|f| DependencyEdge {
                source: model.class(f.class).name.clone(),
                destination: model.class(f.target).name.clone(),
                cardinality: f.cardinality,
            })
            .collect();
        Self::new(class_names, edges)
    }

    /// Resolves a creation order containing every class exactly once, or
    /// fails once a full pass removes no edge.
    pub fn schedule(mut self) -> Result<Vec<String>, ModelError> {
        while !self.pool.is_empty() {
            let before = self.pool.len();
            for i in 0..self.class_names.len() {
                let class = self.class_names[i].clone();
                let removable = self
                    .pool
                    .iter()
                    .filter(|e| e.touches(&class))
                    .all(|e| is_safe_to_remove(&class, e));
                if removable {
                    self.remove(&class);
                }
            }
            if self.pool.len() == before {
                let remaining = self
                    .class_names
                    .iter()
                    .filter(|c| self.pool.iter().any(|e| e.touches(c)))
                    .cloned()
                    .collect();
                return Err(ModelError::CircularDependency { remaining });
            }
        }

        // Whatever the edge passes never scheduled (isolated classes, or
        // classes whose last edge cleared after their turn), in document
        // order.
        for class in &self.class_names {
            if !self.ordered.contains(class) {
                self.ordered.push(class.clone());
            }
        }
        Ok(self.ordered)
    }

    fn remove(&mut self, class: &str) {
        if !self.ordered.iter().any(|c| c == class) {
            self.ordered.push(class.to_string());
        }
        self.pool.retain(|e| !e.touches(class));
    }
}

/// Whether `class` may be scheduled while `edge` is still pending.
///
/// One-to-one and many-to-many store the reference on the owning (source)
/// side, so the source must wait for its target. One-to-many puts the
/// foreign key on the "many" (destination) side, so the destination waits.
/// Many-to-one edges (back-references of a one-to-many) and reflexive edges
/// never block.
fn is_safe_to_remove(class: &str, edge: &Edge) -> bool {
    match edge.kind {
        EdgeKind::OneToOne | EdgeKind::ManyToMany => edge.source != class,
        EdgeKind::OneToMany => edge.destination != class,
        EdgeKind::ManyToOne | EdgeKind::Reflexive => true,
    }
}
