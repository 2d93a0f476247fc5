//! The flattened method list of a proxy.

use std::collections::HashMap;

use transponder_types::{MethodDecl, MethodKey, ShapeCatalog, ShapeId};

/// One declaration per method signature across a main shape, its
/// capabilities, and all their supertypes.
#[derive(Clone, Debug, Default)]
pub struct MethodView {
    methods: Vec<MethodDecl>,
}

impl MethodView {
    /// Flatten the hierarchy rooted at `main` and `capabilities`.
    ///
    /// Signatures keep the position of their first (most derived)
    /// declaration. The declaration kept for a signature is the first one
    /// marked `override-by-this` in hierarchy order, otherwise the most
    /// derived one. Static methods are not part of the view.
    pub fn build(catalog: &ShapeCatalog, main: &ShapeId, capabilities: &[ShapeId]) -> Self {
        let roots: Vec<ShapeId> = std::iter::once(main.clone())
            .chain(capabilities.iter().cloned())
            .collect();

        let mut methods: Vec<MethodDecl> = Vec::new();
        let mut slots: HashMap<MethodKey, usize> = HashMap::new();
        for shape in catalog.hierarchy(&roots) {
            for method in shape.methods.iter().filter(|m| !m.is_static) {
                match slots.get(&method.key) {
                    None => {
                        slots.insert(method.key.clone(), methods.len());
                        methods.push(method.clone());
                    }
                    Some(&slot) => {
                        let kept = &methods[slot];
                        if !is_override(kept) && is_override(method) {
                            methods[slot] = method.clone();
                        }
                    }
                }
            }
        }
        Self { methods }
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    /// Declarations that override same-signature declarations.
    pub fn overrides(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods.iter().filter(|m| is_override(m))
    }

    pub fn into_methods(self) -> Vec<MethodDecl> {
        self.methods
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

fn is_override(method: &MethodDecl) -> bool {
    method.has_marker("override-by-this")
}
