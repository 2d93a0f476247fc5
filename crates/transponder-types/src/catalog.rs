//! Registry of declared shapes.
//!
//! Shapes reference each other by [`ShapeId`], so declarations can be
//! registered in any order: a reference is only resolved when somebody walks
//! it. Unregistered ids simply resolve to `None`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::error::{TypeError, TypeResult};
use crate::shape::{ShapeDecl, ShapeId};

/// Registry of shape declarations keyed by id.
#[derive(Clone, Debug, Default)]
pub struct ShapeCatalog {
    shapes: BTreeMap<ShapeId, Arc<ShapeDecl>>,
}

impl ShapeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a set of declarations.
    pub fn from_shapes(shapes: impl IntoIterator<Item = ShapeDecl>) -> TypeResult<Self> {
        let mut catalog = Self::new();
        for shape in shapes {
            catalog.register(shape)?;
        }
        Ok(catalog)
    }

    /// Register a declaration. Ids are unique.
    pub fn register(&mut self, shape: ShapeDecl) -> TypeResult<()> {
        if self.shapes.contains_key(&shape.id) {
            return Err(TypeError::DuplicateShape(shape.id));
        }
        self.shapes.insert(shape.id.clone(), Arc::new(shape));
        Ok(())
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Arc<ShapeDecl>> {
        self.shapes.get(id)
    }

    pub fn contains(&self, id: &ShapeId) -> bool {
        self.shapes.contains_key(id)
    }

    /// Returns `true` if `id` is registered as an entity shape.
    pub fn is_entity(&self, id: &ShapeId) -> bool {
        self.get(id).is_some_and(|s| s.is_entity())
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ShapeId> {
        self.shapes.keys()
    }

    /// Every shape reachable from `roots` through declared supertypes,
    /// most-derived first.
    ///
    /// Roots are visited in order, each followed depth-first by its
    /// supertypes in declaration order. Each shape appears once, at its
    /// first visit. The position in the returned list is the shape's
    /// declaration rank: lower index means more derived. Unregistered ids
    /// are skipped, and a cyclic supertype chain stops at the repeat.
    pub fn hierarchy(&self, roots: &[ShapeId]) -> Vec<Arc<ShapeDecl>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for root in roots {
            self.visit(root, &mut seen, &mut out);
        }
        out
    }

    fn visit(&self, id: &ShapeId, seen: &mut HashSet<ShapeId>, out: &mut Vec<Arc<ShapeDecl>>) {
        if !seen.insert(id.clone()) {
            return;
        }
        let Some(shape) = self.get(id) else {
            return;
        };
        out.push(Arc::clone(shape));
        for parent in &shape.supertypes {
            self.visit(parent, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ShapeCatalog {
        ShapeCatalog::from_shapes([
            ShapeDecl::entity("Named").build().unwrap(),
            ShapeDecl::entity("Dated").build().unwrap(),
            ShapeDecl::entity("Person")
                .extends("Named")
                .extends("Dated")
                .build()
                .unwrap(),
            ShapeDecl::entity("Employee")
                .extends("Person")
                .extends("Named")
                .build()
                .unwrap(),
            ShapeDecl::dao("People").build().unwrap(),
        ])
        .unwrap()
    }

    fn ids(shapes: &[Arc<ShapeDecl>]) -> Vec<&str> {
        shapes.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn hierarchy_is_most_derived_first_and_deduplicated() {
        let c = catalog();
        let h = c.hierarchy(&["Employee".into()]);
        assert_eq!(ids(&h), vec!["Employee", "Person", "Named", "Dated"]);
    }

    #[test]
    fn hierarchy_with_multiple_roots() {
        let c = catalog();
        let h = c.hierarchy(&["People".into(), "Named".into()]);
        assert_eq!(ids(&h), vec!["People", "Named"]);
    }

    #[test]
    fn hierarchy_skips_unknown_and_stops_at_cycles() {
        let c = ShapeCatalog::from_shapes([
            ShapeDecl::entity("A").extends("B").extends("Ghost").build().unwrap(),
            ShapeDecl::entity("B").extends("A").build().unwrap(),
        ])
        .unwrap();
        assert_eq!(ids(&c.hierarchy(&["A".into()])), vec!["A", "B"]);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut c = catalog();
        let err = c.register(ShapeDecl::entity("Person").build().unwrap()).unwrap_err();
        assert_eq!(err, TypeError::DuplicateShape("Person".into()));
    }

    #[test]
    fn entity_lookup() {
        let c = catalog();
        assert!(c.is_entity(&"Person".into()));
        assert!(!c.is_entity(&"People".into()));
        assert!(!c.is_entity(&"Missing".into()));
        assert_eq!(c.len(), 5);
    }
}
