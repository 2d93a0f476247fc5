//! Dependency-ordered description of entity shapes.
//!
//! [`Describer`] walks entity shapes depth-first over an explicit stack and
//! emits driver schema calls so that every dependency exists before it is
//! referenced:
//!
//! - supertypes are created before their subtypes;
//! - a type is created before its properties and indexes;
//! - a relationship is set up only once its target type is described, or
//!   when the batch closes.
//!
//! # Invariants
//!
//! - A shape is described at most once per [`SchemaRegistry`]; its type name
//!   is fixed by whichever walk reaches it first.
//! - A property's order is its first-seen position among its own entity's
//!   accessors, independent of how the entity was reached.
//! - References to an entity that is still on the stack resolve to its name
//!   without recursing, so property cycles terminate.

use tracing::{debug, info, warn};
use transponder_driver::{Driver, IndexDef, PropertyDef, RelationshipDef, TypeDef};
use transponder_types::{Marker, MethodDecl, ShapeCatalog, ShapeDecl, ShapeId, ValueShape};

use crate::context::{DescriptionContext, Frame, PendingProperty, PendingRelationship};
use crate::error::{DescribeError, DescribeResult};
use crate::registry::SchemaRegistry;
use crate::report::{DescribeReport, EntityDescriptor, PropertyDescriptor};

/// One description batch.
///
/// Call [`describe`](Self::describe) any number of times, then
/// [`close`](Self::close). A batch must not be shared between callers.
pub struct Describer<'a> {
    catalog: &'a ShapeCatalog,
    driver: &'a dyn Driver,
    registry: &'a mut SchemaRegistry,
    ctx: DescriptionContext,
    report: DescribeReport,
}

impl<'a> Describer<'a> {
    pub fn new(
        catalog: &'a ShapeCatalog,
        driver: &'a dyn Driver,
        registry: &'a mut SchemaRegistry,
    ) -> Self {
        let mut ctx = DescriptionContext::new();
        for def in registry.take_parked() {
            ctx.defer(PendingRelationship { def });
        }
        Self {
            catalog,
            driver,
            registry,
            ctx,
            report: DescribeReport::default(),
        }
    }

    /// Describe every shape in `shapes`, in order, with their dependencies.
    pub fn describe(&mut self, shapes: &[ShapeId]) -> DescribeResult<()> {
        for id in shapes {
            self.describe_one(id)?;
        }
        Ok(())
    }

    /// Describe one shape and return its type name.
    pub fn describe_one(&mut self, id: &ShapeId) -> DescribeResult<String> {
        let decl = self.entity(id)?;
        let type_name = match self.walk(decl) {
            Ok(name) => name,
            Err(e) => {
                let registry = &*self.registry;
                self.ctx.unwind(|r| registry.has_type(&r.def.type_name));
                return Err(e);
            }
        };
        self.flush_pool()?;
        Ok(type_name)
    }

    /// Relationships waiting for a target type that is not described yet.
    ///
    /// Whatever is still pending when the batch is dropped without
    /// [`close`](Self::close) is parked in the registry and picked up by the
    /// next batch.
    pub fn pending(&self) -> &[PendingRelationship] {
        self.ctx.pool()
    }

    /// Finish the batch.
    ///
    /// Relationships still waiting for their target fail the batch when
    /// `strict`, naming every missing type at once; otherwise they are set
    /// up anyway and listed in the report.
    pub fn close(mut self, strict: bool) -> DescribeResult<DescribeReport> {
        self.flush_pool()?;
        let pending = self.ctx.take_pool();
        if !pending.is_empty() {
            let mut missing: Vec<String> =
                pending.iter().map(|r| r.target().to_string()).collect();
            missing.sort();
            missing.dedup();
            if strict {
                return Err(DescribeError::UnsatisfiedDependencies { missing });
            }
            warn!(
                missing = ?missing,
                count = pending.len(),
                "setting up relationships to undescribed types"
            );
            let mut pending = pending.into_iter();
            while let Some(relationship) = pending.next() {
                if let Err(e) = self.fire(&relationship) {
                    pending.for_each(|r| self.ctx.defer(r));
                    return Err(e);
                }
                self.report.unsatisfied.push(relationship.def);
            }
        }
        info!(
            described = self.report.described.len(),
            unsatisfied = self.report.unsatisfied.len(),
            "closed description batch"
        );
        Ok(std::mem::take(&mut self.report))
    }

    // ---------------------------------------------------------------
    // Walk
    // ---------------------------------------------------------------

    fn entity(&self, id: &ShapeId) -> DescribeResult<&'a ShapeDecl> {
        let catalog = self.catalog;
        let decl = catalog
            .get(id)
            .ok_or_else(|| DescribeError::UnknownShape(id.clone()))?;
        if !decl.is_entity() {
            return Err(DescribeError::NotAnEntity(id.clone()));
        }
        Ok(&**decl)
    }

    fn walk(&mut self, decl: &'a ShapeDecl) -> DescribeResult<String> {
        if let Some(name) = self.registry.type_name(&decl.id) {
            return Ok(name.to_string());
        }
        if self.ctx.in_progress(&decl.id).is_some() {
            return Err(DescribeError::Reentrancy {
                shape: decl.id.clone(),
                path: self.ctx.path(),
            });
        }

        let type_name = decl.type_name().to_string();
        debug!(shape = %decl.id, type_name = %type_name, depth = self.ctx.depth(), "entering entity");
        self.ctx.push(Frame::new(decl.id.clone(), type_name.clone()));

        let catalog = self.catalog;
        let mut supertypes: Vec<String> = Vec::new();
        for parent in &decl.supertypes {
            let parent_decl = catalog
                .get(parent)
                .ok_or_else(|| DescribeError::UnknownShape(parent.clone()))?;
            if !parent_decl.is_entity() {
                continue;
            }
            let name = self.walk(parent_decl)?;
            push_unique(&mut supertypes, name);
        }
        for extra in &decl.type_marker.extra_supertypes {
            push_unique(&mut supertypes, extra.clone());
        }

        for method in decl.accessor_candidates() {
            self.queue_property(&decl.id, method)?;
        }

        let frame = self
            .ctx
            .pop(&decl.id)
            .ok_or_else(|| DescribeError::Unbalanced(decl.id.clone()))?;
        self.finish(decl, frame, supertypes)?;
        Ok(type_name)
    }

    /// Queue the property a method declares, if any.
    ///
    /// The first declaration of a property name wins, unless a later one
    /// carries an explicit `Property` marker: that one replaces it in the
    /// same position.
    fn queue_property(&mut self, shape: &ShapeId, method: &'a MethodDecl) -> DescribeResult<()> {
        let Some(name) = method.property_name() else {
            return Ok(());
        };
        let explicit = method.property_marker();

        let slot = self
            .ctx
            .current()
            .ok_or_else(|| DescribeError::Unbalanced(shape.clone()))?
            .property_slot(&name);
        if slot.is_some() && explicit.is_none() {
            debug!(shape = %shape, property = %name, "property already declared");
            return Ok(());
        }

        let value_shape = property_shape(method);
        let marker_linked = explicit.and_then(|(_, linked, _)| linked);
        let linked_type = self.resolve_linked(&value_shape, marker_linked)?;
        let inverse = explicit.and_then(|(_, _, inverse)| inverse).map(str::to_string);

        let frame = self
            .ctx
            .current_mut()
            .ok_or_else(|| DescribeError::Unbalanced(shape.clone()))?;
        let pending = PendingProperty {
            name: name.clone(),
            value_shape,
            linked_type: linked_type.clone(),
            markers: method.markers.clone(),
            explicit: explicit.is_some(),
        };
        match slot {
            Some(i) => {
                frame.properties[i] = pending;
                let type_name = frame.type_name.clone();
                frame
                    .relationships
                    .retain(|r| !(r.def.type_name == type_name && r.def.property == name));
            }
            None => frame.properties.push(pending),
        }
        if let Some(linked_type) = linked_type {
            let def = RelationshipDef {
                type_name: frame.type_name.clone(),
                property: name,
                linked_type,
                inverse,
            };
            frame.relationships.push(PendingRelationship { def });
        }
        Ok(())
    }

    /// Linked type of a property: its own entity shape, else its element's
    /// entity shape, else the marker's explicit linked type.
    fn resolve_linked(
        &mut self,
        shape: &ValueShape,
        marker_linked: Option<&str>,
    ) -> DescribeResult<Option<String>> {
        let candidates = [shape.shape_ref(), shape.element().and_then(ValueShape::shape_ref)];
        for id in candidates.into_iter().flatten() {
            if let Some(name) = self.resolve_or_describe(id)? {
                return Ok(Some(name));
            }
        }
        Ok(marker_linked.map(str::to_string))
    }

    /// Name of an entity shape, describing it first if needed.
    ///
    /// Shapes on the stack resolve to their name without recursion. Ids
    /// that are not entity shapes resolve to `None`.
    fn resolve_or_describe(&mut self, id: &ShapeId) -> DescribeResult<Option<String>> {
        if let Some(name) = self.registry.type_name(id) {
            return Ok(Some(name.to_string()));
        }
        if let Some(frame) = self.ctx.in_progress(id) {
            return Ok(Some(frame.type_name.clone()));
        }
        let catalog = self.catalog;
        match catalog.get(id) {
            Some(decl) if decl.is_entity() => self.walk(decl).map(Some),
            _ => Ok(None),
        }
    }

    // ---------------------------------------------------------------
    // Exit
    // ---------------------------------------------------------------

    fn finish(
        &mut self,
        decl: &ShapeDecl,
        mut frame: Frame,
        supertypes: Vec<String>,
    ) -> DescribeResult<()> {
        let relationships = std::mem::take(&mut frame.relationships);
        if let Err(e) = self.create_entity(decl, frame, supertypes) {
            self.salvage(relationships);
            return Err(e);
        }

        let mut relationships = relationships.into_iter();
        while let Some(relationship) = relationships.next() {
            if !self.registry.has_type(relationship.target()) {
                self.ctx.defer(relationship);
            } else if let Err(e) = self.fire(&relationship) {
                self.salvage(relationships);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Keep the relationships of already recorded entities after a failure.
    /// The others are queued again when their entity is retried.
    fn salvage(&mut self, relationships: impl IntoIterator<Item = PendingRelationship>) {
        for relationship in relationships {
            if self.registry.has_type(&relationship.def.type_name) {
                self.ctx.defer(relationship);
            }
        }
    }

    /// Create the type, its properties and indexes, then record it.
    fn create_entity(
        &mut self,
        decl: &ShapeDecl,
        frame: Frame,
        supertypes: Vec<String>,
    ) -> DescribeResult<()> {
        let type_name = frame.type_name;
        self.driver.create_type(&TypeDef {
            name: type_name.clone(),
            is_abstract: decl.type_marker.is_abstract,
            owner: decl.type_marker.owner.clone(),
            supertypes: supertypes.clone(),
        })?;

        let mut properties = Vec::with_capacity(frame.properties.len());
        let mut indexes = Vec::new();
        for (order, property) in (0u32..).zip(frame.properties) {
            self.driver.create_property(&PropertyDef {
                type_name: type_name.clone(),
                name: property.name.clone(),
                value_shape: property.value_shape.clone(),
                linked_type: property.linked_type.clone(),
                order,
                markers: property.markers.clone(),
            })?;
            for marker in &property.markers {
                if let Marker::PropertyIndex { name, kind } = marker {
                    let index_name = name
                        .clone()
                        .unwrap_or_else(|| format!("{type_name}.{}", property.name));
                    self.driver.create_index(&IndexDef {
                        type_name: type_name.clone(),
                        name: index_name.clone(),
                        kind: *kind,
                        markers: vec![marker.clone()],
                        properties: vec![property.name.clone()],
                    })?;
                    indexes.push(index_name);
                }
            }
            properties.push(PropertyDescriptor {
                name: property.name,
                order,
                value_shape: property.value_shape,
                linked_type: property.linked_type,
            });
        }

        for index in &decl.indexes {
            self.driver.create_index(&IndexDef {
                type_name: type_name.clone(),
                name: index.name.clone(),
                kind: index.kind,
                markers: Vec::new(),
                properties: index.properties.clone(),
            })?;
            indexes.push(index.name.clone());
        }

        self.registry.record(decl.id.clone(), type_name.clone());
        debug!(
            shape = %decl.id,
            type_name = %type_name,
            properties = properties.len(),
            "described entity"
        );
        self.report.described.push(EntityDescriptor {
            shape: decl.id.clone(),
            type_name,
            is_abstract: decl.type_marker.is_abstract,
            supertypes,
            properties,
            indexes,
        });
        Ok(())
    }

    /// Set up pooled relationships whose target has been described since.
    fn flush_pool(&mut self) -> DescribeResult<()> {
        let registry = &*self.registry;
        let mut ready = self.ctx.take_ready(|target| registry.has_type(target)).into_iter();
        while let Some(relationship) = ready.next() {
            if let Err(e) = self.fire(&relationship) {
                ready.for_each(|r| self.ctx.defer(r));
                return Err(e);
            }
        }
        Ok(())
    }

    fn fire(&self, relationship: &PendingRelationship) -> DescribeResult<()> {
        debug!(
            type_name = %relationship.def.type_name,
            property = %relationship.def.property,
            linked_type = %relationship.def.linked_type,
            "setting up relationship"
        );
        self.driver.setup_relationship(&relationship.def)?;
        Ok(())
    }
}

impl Drop for Describer<'_> {
    fn drop(&mut self) {
        let pending = self.ctx.take_pool();
        if !pending.is_empty() {
            debug!(count = pending.len(), "parking pending relationships");
            self.registry.park(pending.into_iter().map(|r| r.def));
        }
    }
}

/// Value shape of a property-declaring method: the accessor's shape, else
/// the return shape, else the first parameter.
fn property_shape(method: &MethodDecl) -> ValueShape {
    if let Some((kind, _)) = method.accessor() {
        return method.key.accessor_value_shape(kind).clone();
    }
    match (&method.key.returns, method.key.params.first()) {
        (ValueShape::Void, Some(param)) => param.clone(),
        (returns, _) => returns.clone(),
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
