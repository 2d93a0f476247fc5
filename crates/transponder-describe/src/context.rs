//! Deferred work of a description batch.
//!
//! Nothing here calls the driver. Pending work is plain data that the
//! describer turns into driver calls when its dependencies are met.

use transponder_driver::RelationshipDef;
use transponder_types::{Marker, ShapeId, ValueShape};

/// A property to create when its entity's walk exits.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingProperty {
    pub name: String,
    pub value_shape: ValueShape,
    pub linked_type: Option<String>,
    /// Markers of the declaring accessor.
    pub markers: Vec<Marker>,
    /// Declared through an explicit `Property` marker.
    pub explicit: bool,
}

/// A relationship to set up once its target type is described.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRelationship {
    pub def: RelationshipDef,
}

impl PendingRelationship {
    /// Type that must be described before the relationship can be set up.
    pub fn target(&self) -> &str {
        &self.def.linked_type
    }
}

/// One entity being described.
#[derive(Debug)]
pub struct Frame {
    pub shape: ShapeId,
    pub type_name: String,
    /// Properties in first-seen order. A property's position is its order.
    pub properties: Vec<PendingProperty>,
    /// Relationships declared by this entity or handed up by entities
    /// described beneath it.
    pub relationships: Vec<PendingRelationship>,
}

impl Frame {
    pub fn new(shape: ShapeId, type_name: impl Into<String>) -> Self {
        Self {
            shape,
            type_name: type_name.into(),
            properties: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn property_slot(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

/// The explicit description stack plus the batch-wide pending pool.
#[derive(Debug, Default)]
pub struct DescriptionContext {
    stack: Vec<Frame>,
    pool: Vec<PendingRelationship>,
}

impl DescriptionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.stack.push(frame);
    }

    /// Pop the top frame if it belongs to `shape`.
    pub fn pop(&mut self, shape: &ShapeId) -> Option<Frame> {
        if self.stack.last().is_some_and(|f| &f.shape == shape) {
            self.stack.pop()
        } else {
            None
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.stack.last_mut()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.stack.last()
    }

    /// The frame of `shape` if it is in progress.
    pub fn in_progress(&self, shape: &ShapeId) -> Option<&Frame> {
        self.stack.iter().find(|f| &f.shape == shape)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Stack contents, outermost first, for error messages.
    pub fn path(&self) -> String {
        self.stack
            .iter()
            .map(|f| f.shape.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// Hand a relationship up to the enclosing frame, or to the pool when
    /// no frame is left.
    pub fn defer(&mut self, relationship: PendingRelationship) {
        match self.stack.last_mut() {
            Some(parent) => parent.relationships.push(relationship),
            None => self.pool.push(relationship),
        }
    }

    /// Remove the pooled relationships whose target satisfies `ready`,
    /// keeping the others in order.
    pub fn take_ready(&mut self, ready: impl Fn(&str) -> bool) -> Vec<PendingRelationship> {
        let (fire, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pool)
            .into_iter()
            .partition(|r| ready(r.target()));
        self.pool = keep;
        fire
    }

    pub fn take_pool(&mut self) -> Vec<PendingRelationship> {
        std::mem::take(&mut self.pool)
    }

    pub fn pool(&self) -> &[PendingRelationship] {
        &self.pool
    }

    /// Drop every frame after a failed walk. Relationships that `keep`
    /// accepts move to the pool, the others are discarded.
    pub fn unwind(&mut self, keep: impl Fn(&PendingRelationship) -> bool) {
        for frame in self.stack.drain(..) {
            self.pool
                .extend(frame.relationships.into_iter().filter(|r| keep(r)));
        }
    }
}
