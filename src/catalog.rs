use crate::generator::{GenerateError, Resolver};
use crate::registry::Registries;
use crate::workspace::BlockInstance;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use thiserror::Error;

/// Binding strength of a generated expression, tightest first. A child is
/// wrapped in parentheses when its class is looser than the class its parent
/// asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Atomic,
    FunctionCall,
    Exponent,
    Unary,
    Multiplicative,
    Additive,
    /// `<`, `>`, `<=`, `>=`.
    Relational,
    /// `=`, `!=`.
    Equality,
    /// `and`, `or` and `xor` all share one class.
    Logical,
    /// Statement context: nothing is parenthesised.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Value,
    Statement,
}

/// Declared output type, used by the editor for connection checks only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Number,
    Boolean,
    String,
    Agent,
    Agentset,
    Color,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Statement(String),
    Value(String, Precedence),
}

impl Translation {
    pub fn value(code: impl Into<String>, precedence: Precedence) -> Self {
        Translation::Value(code.into(), precedence)
    }

    pub fn statement(code: impl Into<String>) -> Self {
        Translation::Statement(code.into())
    }

    pub fn into_parts(self) -> (String, Precedence) {
        match self {
            Translation::Value(code, precedence) => (code, precedence),
            Translation::Statement(code) => (code, Precedence::None),
        }
    }
}

pub type TranslateFn =
    Box<dyn Fn(&BlockInstance, &mut Resolver<'_, '_>) -> Result<Translation, GenerateError>>;

pub type OptionsFn = fn(&Registries) -> Vec<String>;

/// Boxes a translate closure. Going through this bound lets the closure's
/// argument lifetimes be inferred as higher-ranked.
pub fn rule<F>(translate: F) -> TranslateFn
where
    F: Fn(&BlockInstance, &mut Resolver<'_, '_>) -> Result<Translation, GenerateError> + 'static,
{
    Box::new(translate)
}

pub enum FieldOptions {
    /// Typed-in text or number.
    Free,
    Static(&'static [&'static str]),
    /// Recomputed from the registries every time the editor asks.
    Dynamic(OptionsFn),
}

pub struct FieldSpec {
    pub name: &'static str,
    pub options: FieldOptions,
}

pub struct BlockDescriptor {
    pub block_type: &'static str,
    pub kind: ResultKind,
    pub output: Option<OutputType>,
    pub fields: Vec<FieldSpec>,
    pub defaults: Vec<(&'static str, &'static str)>,
    pub translate: TranslateFn,
}

impl BlockDescriptor {
    pub fn value(block_type: &'static str, output: OutputType, translate: TranslateFn) -> Self {
        Self {
            block_type,
            kind: ResultKind::Value,
            output: Some(output),
            fields: Vec::new(),
            defaults: Vec::new(),
            translate,
        }
    }

    pub fn statement(block_type: &'static str, translate: TranslateFn) -> Self {
        Self {
            block_type,
            kind: ResultKind::Statement,
            output: None,
            fields: Vec::new(),
            defaults: Vec::new(),
            translate,
        }
    }

    pub fn with_field(mut self, name: &'static str, options: FieldOptions) -> Self {
        self.fields.push(FieldSpec { name, options });
        self
    }

    /// Text emitted when value slot `slot` is left unfilled.
    pub fn with_default(mut self, slot: &'static str, text: &'static str) -> Self {
        self.defaults.push((slot, text));
        self
    }

    pub fn default_for(&self, slot: &str) -> &'static str {
        self.defaults
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, text)| *text)
            .unwrap_or("0")
    }
}

impl Debug for BlockDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDescriptor")
            .field("block_type", &self.block_type)
            .field("kind", &self.kind)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Block type '{0}' is already registered.")]
    DuplicateBlockType(String),
}

#[derive(Debug, Default)]
pub struct Catalog {
    descriptors: HashMap<&'static str, BlockDescriptor>,
    order: Vec<&'static str>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every built-in block family.
    pub fn standard() -> Self {
        crate::blocks::standard_catalog()
    }

    pub fn register(&mut self, descriptor: BlockDescriptor) -> Result<(), CatalogError> {
        let key = descriptor.block_type;
        if self.descriptors.contains_key(key) {
            return Err(CatalogError::DuplicateBlockType(key.to_string()));
        }
        self.order.push(key);
        self.descriptors.insert(key, descriptor);
        Ok(())
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockDescriptor> {
        self.descriptors.get(block_type)
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.descriptors.contains_key(block_type)
    }

    /// Block types in registration order.
    pub fn block_types(&self) -> &[&'static str] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Dropdown choices for `field` on `block_type`, read live from the
    /// registries for dynamic fields. `None` for unknown blocks, unknown fields
    /// and free-text fields.
    pub fn field_options(&self, block_type: &str, field: &str, registries: &Registries) -> Option<Vec<String>> {
        let spec = self.get(block_type)?.fields.iter().find(|f| f.name == field)?;
        match &spec.options {
            FieldOptions::Free => None,
            FieldOptions::Static(options) => Some(options.iter().map(ToString::to_string).collect()),
            FieldOptions::Dynamic(options) => Some(options(registries)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_orders_tight_to_loose() {
        assert!(Precedence::Atomic < Precedence::FunctionCall);
        assert!(Precedence::FunctionCall < Precedence::Exponent);
        assert!(Precedence::Exponent < Precedence::Unary);
        assert!(Precedence::Unary < Precedence::Multiplicative);
        assert!(Precedence::Multiplicative < Precedence::Additive);
        assert!(Precedence::Additive < Precedence::Relational);
        assert!(Precedence::Relational < Precedence::Equality);
        assert!(Precedence::Equality < Precedence::Logical);
        assert!(Precedence::Logical < Precedence::None);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut catalog = Catalog::new();
        let tick = || {
            BlockDescriptor::statement("observer_tick", rule(|_, _| Ok(Translation::statement("tick"))))
        };
        catalog.register(tick()).unwrap();
        assert_eq!(
            catalog.register(tick()),
            Err(CatalogError::DuplicateBlockType("observer_tick".to_string()))
        );
        assert_eq!(catalog.len(), 1);
    }
}
