//! Block-type and type-graph registries for one graph session.
//!
//! Both tables are rebuilt wholesale when the backend connection changes:
//! [`Registry::rebuild`] prepares fresh tables from the new schemas and swaps
//! them in atomically, so a failed schema fetch never leaves the session
//! half-registered.

use std::collections::HashMap;
use std::sync::Arc;

use crate::factory::{self, BlockDefinition};
use crate::schema::model::{OperatorSchema, PinType};

/// Mapping from pin type to the block types that produce or consume it,
/// used to drive auto-connect suggestions and default wiring.
///
/// Composite pin types like `raster,vector,plot` are stored verbatim as one
/// key; the union is treated as an atomic type for default-wiring purposes.
#[derive(Debug, Default)]
pub struct TypeGraphRegistry {
    producers: HashMap<PinType, Vec<String>>,
    consumers: HashMap<PinType, Vec<String>>,
}

impl TypeGraphRegistry {
    pub fn new() -> Self {
        TypeGraphRegistry::default()
    }

    /// Record that `block_type`'s output produces `pin_type`. Additive set
    /// semantics: duplicates are ignored, first-registration order is kept.
    pub fn register_output(&mut self, pin_type: PinType, block_type: &str) {
        let entries = self.producers.entry(pin_type).or_default();
        if !entries.iter().any(|b| b == block_type) {
            entries.push(block_type.to_string());
        }
    }

    /// Record that `block_type` has an input consuming `pin_type`.
    pub fn register_input(&mut self, pin_type: PinType, block_type: &str) {
        let entries = self.consumers.entry(pin_type).or_default();
        if !entries.iter().any(|b| b == block_type) {
            entries.push(block_type.to_string());
        }
    }

    /// Block types whose output produces `pin_type`.
    pub fn lookup_producers(&self, pin_type: &PinType) -> &[String] {
        self.producers.get(pin_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Block types with an input consuming `pin_type`.
    pub fn lookup_consumers(&self, pin_type: &PinType) -> &[String] {
        self.consumers.get(pin_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Registered block definitions plus the type graph derived from them.
#[derive(Debug, Default)]
pub struct Registry {
    blocks: HashMap<String, Arc<BlockDefinition>>,
    order: Vec<String>,
    type_graph: TypeGraphRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn block(&self, block_type: &str) -> Option<&Arc<BlockDefinition>> {
        self.blocks.get(block_type)
    }

    pub fn block_for_operator(&self, operator_id: &str) -> Option<&Arc<BlockDefinition>> {
        self.blocks.get(&factory::block_type_id(operator_id))
    }

    /// Registered block types in registration order.
    pub fn block_types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn type_graph(&self) -> &TypeGraphRegistry {
        &self.type_graph
    }

    /// Replace all registrations with ones built from `schemas`. Returns the
    /// block types that existed before but are gone afterwards, so the caller
    /// can delete live instances of removed types.
    pub fn rebuild(&mut self, schemas: &[Arc<OperatorSchema>]) -> Vec<String> {
        let mut blocks = HashMap::new();
        let mut order = Vec::new();
        let mut type_graph = TypeGraphRegistry::new();

        for schema in schemas {
            let def = Arc::new(factory::build(schema));

            for input in &def.inputs {
                // Array pins are wired through an array builder, not directly.
                if input.inner_type.is_none() {
                    type_graph.register_input(input.pin_type.clone(), &def.block_type);
                }
            }
            if !def.dynamic_output {
                type_graph.register_output(def.output_on_start.clone(), &def.block_type);
            }

            order.push(def.block_type.clone());
            blocks.insert(def.block_type.clone(), def);
        }

        let removed = self
            .order
            .iter()
            .filter(|t| !blocks.contains_key(*t))
            .cloned()
            .collect();

        self.blocks = blocks;
        self.order = order;
        self.type_graph = type_graph;
        removed
    }
}
