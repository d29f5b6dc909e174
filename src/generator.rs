//! Turns a [`Workspace`] into program text.
//!
//! Each top-level chain is walked block by block. Value slots are resolved
//! recursively and parenthesised by precedence class, statement slots are
//! generated as indented chains, and the declaration prefix is synthesised
//! from the registries rather than from any block.

use crate::catalog::{BlockDescriptor, Catalog, Precedence};
use crate::registry::Registries;
use crate::workspace::{BlockInstance, Workspace};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Unknown block type '{block_type}' (block '{id}').")]
    UnknownBlockType { block_type: String, id: String },

    #[error("Block '{id}' is referenced but missing from the workspace.")]
    MissingBlock { id: String },

    #[error("Block '{id}' is connected back into itself or sits in two statement chains.")]
    CyclicGraph { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub indent_width: usize,
    pub include_prefix: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            include_prefix: true,
        }
    }
}

pub struct Generator<'c> {
    catalog: &'c Catalog,
    options: GenerateOptions,
}

impl<'c> Generator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> GenerateOptions {
        self.options
    }

    pub fn generate(&self, workspace: &Workspace, registries: &Registries) -> Result<String, GenerateError> {
        let mut state = State {
            catalog: self.catalog,
            workspace,
            registries,
            indent: " ".repeat(self.options.indent_width),
            visited: HashSet::new(),
            path: Vec::new(),
        };

        let mut sections = Vec::new();
        if self.options.include_prefix {
            sections.extend(prefix_sections(registries));
        }
        let prefix_count = sections.len();
        for head in workspace.top_level_ids() {
            let chain = state.chain(head)?;
            if !chain.is_empty() {
                sections.push(chain);
            }
        }

        debug!(
            prefix_sections = prefix_count,
            chains = sections.len() - prefix_count,
            statements = state.visited.len(),
            "generated program"
        );
        Ok(sections.join("\n\n"))
    }
}

/// Declaration sections derived from the registries: globals, breed
/// declarations, then `-own` variable lists. Empty sections are omitted.
pub fn prefix_sections(registries: &Registries) -> Vec<String> {
    let mut sections = Vec::new();

    let globals = registries.global_variables();
    if !globals.is_empty() {
        sections.push(format!("globals [ {} ]", globals.join(" ")));
    }

    let breed_lines = registries
        .breeds()
        .into_iter()
        .filter(|b| !b.builtin)
        .map(|b| format!("{} [ {} {} ]", b.kind.declaration_keyword(), b.plural, b.singular))
        .collect::<Vec<_>>();
    if !breed_lines.is_empty() {
        sections.push(breed_lines.join("\n"));
    }

    let mut owners: Vec<(String, Vec<String>)> = Vec::new();
    for var in registries.variables(None) {
        let Some(owner) = var.scope.owner() else {
            continue;
        };
        match owners.iter_mut().find(|(name, _)| name == owner) {
            Some((_, names)) => names.push(var.name.clone()),
            None => owners.push((owner.to_string(), vec![var.name.clone()])),
        }
    }
    if !owners.is_empty() {
        let lines = owners
            .iter()
            .map(|(owner, names)| format!("{}-own [ {} ]", owner, names.join(" ")))
            .collect::<Vec<_>>();
        sections.push(lines.join("\n"));
    }
    sections
}

/// Per-run walk state. `visited` holds every statement block placed in a
/// chain; a statement has exactly one position. `path` holds the value
/// blocks currently being resolved, so a value block may feed several slots
/// but never one of its own ancestors.
struct State<'a> {
    catalog: &'a Catalog,
    workspace: &'a Workspace,
    registries: &'a Registries,
    indent: String,
    visited: HashSet<&'a str>,
    path: Vec<&'a str>,
}

impl<'a> State<'a> {
    fn lookup(&self, id: &'a str) -> Result<(&'a BlockInstance, &'a BlockDescriptor), GenerateError> {
        let block = self
            .workspace
            .get(id)
            .ok_or_else(|| GenerateError::MissingBlock { id: id.to_string() })?;
        let descriptor = self
            .catalog
            .get(&block.block_type)
            .ok_or_else(|| GenerateError::UnknownBlockType {
                block_type: block.block_type.clone(),
                id: id.to_string(),
            })?;
        Ok((block, descriptor))
    }

    fn chain(&mut self, head: &'a str) -> Result<String, GenerateError> {
        let mut lines = Vec::new();
        let mut current = Some(head);
        while let Some(id) = current {
            if self.path.contains(&id) || !self.visited.insert(id) {
                return Err(GenerateError::CyclicGraph { id: id.to_string() });
            }
            let (block, descriptor) = self.lookup(id)?;
            let mut resolver = Resolver {
                state: self,
                block,
                descriptor,
            };
            let (code, _) = (descriptor.translate)(block, &mut resolver)?.into_parts();
            if !code.is_empty() {
                lines.push(code);
            }
            current = block.next.as_deref();
        }
        Ok(lines.join("\n"))
    }

    fn value(&mut self, id: &'a str) -> Result<(String, Precedence), GenerateError> {
        if self.path.contains(&id) || self.visited.contains(id) {
            return Err(GenerateError::CyclicGraph { id: id.to_string() });
        }
        let (block, descriptor) = self.lookup(id)?;
        self.path.push(id);
        let mut resolver = Resolver {
            state: self,
            block,
            descriptor,
        };
        let translated = (descriptor.translate)(block, &mut resolver);
        self.path.pop();
        Ok(translated?.into_parts())
    }

    fn indent(&self, text: &str) -> String {
        text.lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", self.indent, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Handed to a block's translate rule; resolves that block's slots.
pub struct Resolver<'s, 'a> {
    state: &'s mut State<'a>,
    block: &'a BlockInstance,
    descriptor: &'a BlockDescriptor,
}

impl<'s, 'a> Resolver<'s, 'a> {
    /// Code for the block plugged into `slot`, parenthesised when it binds
    /// more loosely than `min`. Unfilled slots yield the descriptor default.
    pub fn resolve_value(&mut self, slot: &str, min: Precedence) -> Result<String, GenerateError> {
        self.resolve_with(slot, |child| child > min)
    }

    /// Like [`resolve_value`](Self::resolve_value) but also parenthesises a
    /// child of exactly class `min`. Used for right operands of operators
    /// that are not associative.
    pub fn resolve_value_strict(&mut self, slot: &str, min: Precedence) -> Result<String, GenerateError> {
        self.resolve_with(slot, |child| child >= min)
    }

    /// The chain plugged into `slot`, indented one level; empty when unfilled.
    pub fn resolve_statements(&mut self, slot: &str) -> Result<String, GenerateError> {
        let block = self.block;
        let Some(head) = block.statements.get(slot) else {
            return Ok(String::new());
        };
        let body = self.state.chain(head)?;
        Ok(self.state.indent(&body))
    }

    pub fn has_value(&self, slot: &str) -> bool {
        self.block.inputs.contains_key(slot)
    }

    pub fn registries(&self) -> &'a Registries {
        self.state.registries
    }

    pub fn default_for(&self, slot: &str) -> &'static str {
        self.descriptor.default_for(slot)
    }

    fn resolve_with(&mut self, slot: &str, wrap: impl Fn(Precedence) -> bool) -> Result<String, GenerateError> {
        let block = self.block;
        let Some(child) = block.inputs.get(slot) else {
            return Ok(self.descriptor.default_for(slot).to_string());
        };
        let (code, precedence) = self.state.value(child)?;
        if wrap(precedence) {
            Ok(format!("({})", code))
        } else {
            Ok(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_skips_blank_lines() {
        let catalog = Catalog::new();
        let workspace = Workspace::new();
        let registries = Registries::new();
        let state = State {
            catalog: &catalog,
            workspace: &workspace,
            registries: &registries,
            indent: "  ".to_string(),
            visited: HashSet::new(),
            path: Vec::new(),
        };
        assert_eq!(state.indent("fd 1\n\nrt 90"), "  fd 1\n\n  rt 90");
    }

    #[test]
    fn prefix_is_empty_without_custom_entries() {
        assert!(prefix_sections(&Registries::new()).is_empty());
    }
}
