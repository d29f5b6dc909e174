//! Symbol registries for the user-nameable entities of a model: breeds and
//! variables.
//!
//! Both namespaces live in one owned [`Registries`] value. Breed names and
//! variable names share a single flat symbol space, and the DSL is
//! case-insensitive, so every uniqueness check compares names ignoring ASCII
//! case. Validation always runs before any mutation, so a failed call leaves
//! the registry untouched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_\-][A-Za-z0-9_\-]*$").expect("identifier pattern is valid")
});

static RESERVED: LazyLock<HashSet<&'static str>> = LazyLock::new(reserved_word_set);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("The name '{0}' is already in use.")]
    DuplicateName(String),

    #[error("'{0}' is a reserved word and cannot be used as a name.")]
    ReservedWord(String),

    #[error("'{0}' is not a valid name (letters, digits, '-' and '_', not starting with a digit).")]
    InvalidName(String),

    #[error("No entry named '{0}'.")]
    NotFound(String),

    #[error("'{0}' is built in and cannot be changed or removed.")]
    Protected(String),

    #[error("Patches cannot be given a custom breed ('{0}').")]
    InvalidKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    Breeds,
    Variables,
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Breeds => write!(f, "breeds"),
            Namespace::Variables => write!(f, "variables"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreedKind {
    Turtle,
    UndirectedLink,
    DirectedLink,
    /// Only the built-in `patches` entry has this kind.
    Patch,
}

impl BreedKind {
    pub fn is_link(self) -> bool {
        matches!(self, BreedKind::UndirectedLink | BreedKind::DirectedLink)
    }

    /// Keyword that declares a custom breed of this kind.
    pub fn declaration_keyword(self) -> &'static str {
        match self {
            BreedKind::Turtle | BreedKind::Patch => "breed",
            BreedKind::UndirectedLink => "undirected-link-breed",
            BreedKind::DirectedLink => "directed-link-breed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breed {
    pub plural: String,
    pub singular: String,
    pub kind: BreedKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub builtin: bool,
}

impl Breed {
    fn builtin(plural: &str, singular: &str, kind: BreedKind) -> Self {
        Self {
            plural: plural.to_string(),
            singular: singular.to_string(),
            kind,
            builtin: true,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.plural.eq_ignore_ascii_case(name) || self.singular.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableScope {
    Global,
    Turtles,
    Patches,
    Links,
    Breed(String),
}

impl VariableScope {
    /// The agent-set whose `-own` declaration carries this variable, or `None`
    /// for globals.
    pub fn owner(&self) -> Option<&str> {
        match self {
            VariableScope::Global => None,
            VariableScope::Turtles => Some("turtles"),
            VariableScope::Patches => Some("patches"),
            VariableScope::Links => Some("links"),
            VariableScope::Breed(plural) => Some(plural),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub scope: VariableScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Added { namespace: Namespace, name: String },
    Renamed { namespace: Namespace, old: String, new: String },
    Removed { namespace: Namespace, name: String },
    Reset,
}

/// Custom entries only; the built-in breeds are implied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub breeds: Vec<Breed>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

type Listener = Box<dyn FnMut(&RegistryEvent)>;

pub struct Registries {
    breeds: Vec<Breed>,
    variables: Vec<Variable>,
    listeners: Vec<Listener>,
}

impl Debug for Registries {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries")
            .field("breeds", &self.breeds)
            .field("variables", &self.variables)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    pub fn new() -> Self {
        Self {
            breeds: builtin_breeds(),
            variables: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Registers a callback run after every successful mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&RegistryEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn add_breed(&mut self, plural: &str, singular: &str, kind: BreedKind) -> Result<(), RegistryError> {
        if kind == BreedKind::Patch {
            return Err(RegistryError::InvalidKind(plural.to_string()));
        }
        self.validate_breed_names(plural, singular, None)?;
        self.breeds.push(Breed {
            plural: plural.to_string(),
            singular: singular.to_string(),
            kind,
            builtin: false,
        });
        self.emit(RegistryEvent::Added {
            namespace: Namespace::Breeds,
            name: plural.to_string(),
        });
        Ok(())
    }

    /// Renames the breed matched by `old` (plural or singular form). Variables
    /// owned by the breed follow it to the new plural.
    pub fn rename_breed(&mut self, old: &str, new_plural: &str, new_singular: &str) -> Result<(), RegistryError> {
        let index = self.breed_index(old)?;
        self.validate_breed_names(new_plural, new_singular, Some(index))?;

        let old_plural = std::mem::replace(&mut self.breeds[index].plural, new_plural.to_string());
        self.breeds[index].singular = new_singular.to_string();
        for var in &mut self.variables {
            if let VariableScope::Breed(owner) = &mut var.scope {
                if owner.eq_ignore_ascii_case(&old_plural) {
                    *owner = new_plural.to_string();
                }
            }
        }
        self.emit(RegistryEvent::Renamed {
            namespace: Namespace::Breeds,
            old: old_plural,
            new: new_plural.to_string(),
        });
        Ok(())
    }

    /// Removes the breed matched by `name` together with the variables it owns.
    pub fn remove_breed(&mut self, name: &str) -> Result<(), RegistryError> {
        let index = self.breed_index(name)?;
        let removed = self.breeds.remove(index);

        let mut owned = Vec::new();
        self.variables.retain(|var| match &var.scope {
            VariableScope::Breed(owner) if owner.eq_ignore_ascii_case(&removed.plural) => {
                owned.push(var.name.clone());
                false
            }
            _ => true,
        });
        for var_name in owned {
            self.emit(RegistryEvent::Removed {
                namespace: Namespace::Variables,
                name: var_name,
            });
        }
        self.emit(RegistryEvent::Removed {
            namespace: Namespace::Breeds,
            name: removed.plural,
        });
        Ok(())
    }

    pub fn add_variable(&mut self, name: &str, scope: VariableScope) -> Result<(), RegistryError> {
        self.validate_name(name, &[])?;
        let scope = self.resolve_scope(scope)?;
        self.variables.push(Variable {
            name: name.to_string(),
            scope,
        });
        self.emit(RegistryEvent::Added {
            namespace: Namespace::Variables,
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn rename_variable(&mut self, old: &str, new: &str) -> Result<(), RegistryError> {
        let index = self
            .variables
            .iter()
            .position(|v| v.name.eq_ignore_ascii_case(old))
            .ok_or_else(|| RegistryError::NotFound(old.to_string()))?;
        let previous = self.variables[index].name.clone();
        self.validate_name(new, &[previous.as_str()])?;
        self.variables[index].name = new.to_string();
        self.emit(RegistryEvent::Renamed {
            namespace: Namespace::Variables,
            old: previous,
            new: new.to_string(),
        });
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) -> Result<(), RegistryError> {
        let index = self
            .variables
            .iter()
            .position(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let removed = self.variables.remove(index);
        self.emit(RegistryEvent::Removed {
            namespace: Namespace::Variables,
            name: removed.name,
        });
        Ok(())
    }

    /// Drops every custom breed and every variable.
    pub fn reset(&mut self) {
        self.breeds.retain(|b| b.builtin);
        self.variables.clear();
        self.emit(RegistryEvent::Reset);
    }

    pub fn breeds(&self) -> Vec<Breed> {
        self.breeds.clone()
    }

    /// Looks a breed up by either its plural or its singular form.
    pub fn breed(&self, name: &str) -> Option<&Breed> {
        self.breeds.iter().find(|b| b.matches(name))
    }

    pub fn agent_sets(&self) -> Vec<String> {
        self.breeds.iter().map(|b| b.plural.clone()).collect()
    }

    pub fn singular_agents(&self) -> Vec<String> {
        self.breeds.iter().map(|b| b.singular.clone()).collect()
    }

    pub fn turtle_breeds(&self) -> Vec<Breed> {
        self.custom_breeds(|kind| kind == BreedKind::Turtle)
    }

    pub fn link_breeds(&self) -> Vec<Breed> {
        self.custom_breeds(BreedKind::is_link)
    }

    pub fn variables(&self, scope: Option<&VariableScope>) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|v| scope.map_or(true, |s| &v.scope == s))
            .cloned()
            .collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn global_variables(&self) -> Vec<String> {
        self.variables
            .iter()
            .filter(|v| v.scope == VariableScope::Global)
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            breeds: self.breeds.iter().filter(|b| !b.builtin).cloned().collect(),
            variables: self.variables.clone(),
        }
    }

    /// Replaces the current contents with `snapshot`. Every entry is replayed
    /// through the validated add path; on error nothing changes.
    pub fn restore(&mut self, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
        let mut staged = Registries::new();
        for breed in &snapshot.breeds {
            staged.add_breed(&breed.plural, &breed.singular, breed.kind)?;
        }
        for var in &snapshot.variables {
            staged.add_variable(&var.name, var.scope.clone())?;
        }
        self.breeds = staged.breeds;
        self.variables = staged.variables;
        self.emit(RegistryEvent::Reset);
        Ok(())
    }

    fn custom_breeds(&self, keep: impl Fn(BreedKind) -> bool) -> Vec<Breed> {
        self.breeds
            .iter()
            .filter(|b| !b.builtin && keep(b.kind))
            .cloned()
            .collect()
    }

    fn breed_index(&self, name: &str) -> Result<usize, RegistryError> {
        let index = self
            .breeds
            .iter()
            .position(|b| b.matches(name))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if self.breeds[index].builtin {
            return Err(RegistryError::Protected(name.to_string()));
        }
        Ok(index)
    }

    fn validate_breed_names(&self, plural: &str, singular: &str, replacing: Option<usize>) -> Result<(), RegistryError> {
        let own_names = replacing
            .map(|i| vec![self.breeds[i].plural.as_str(), self.breeds[i].singular.as_str()])
            .unwrap_or_default();
        self.validate_name(plural, &own_names)?;
        self.validate_name(singular, &own_names)?;
        if plural.eq_ignore_ascii_case(singular) {
            return Err(RegistryError::DuplicateName(singular.to_string()));
        }
        Ok(())
    }

    /// Checks `name` against the identifier grammar, the flat symbol space and
    /// the reserved words. Names in `ignore` belong to the entry being renamed.
    fn validate_name(&self, name: &str, ignore: &[&str]) -> Result<(), RegistryError> {
        if !is_valid_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let ignored = |candidate: &str| ignore.iter().any(|i| i.eq_ignore_ascii_case(candidate));
        let taken = self
            .breeds
            .iter()
            .flat_map(|b| [b.plural.as_str(), b.singular.as_str()])
            .chain(self.variables.iter().map(|v| v.name.as_str()))
            .any(|existing| existing.eq_ignore_ascii_case(name) && !ignored(existing));
        if taken {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        if is_reserved_word(name) {
            return Err(RegistryError::ReservedWord(name.to_string()));
        }
        Ok(())
    }

    fn resolve_scope(&self, scope: VariableScope) -> Result<VariableScope, RegistryError> {
        let VariableScope::Breed(owner) = scope else {
            return Ok(scope);
        };
        let breed = self
            .breeds
            .iter()
            .find(|b| !b.builtin && b.plural.eq_ignore_ascii_case(&owner))
            .ok_or(RegistryError::NotFound(owner))?;
        Ok(VariableScope::Breed(breed.plural.clone()))
    }

    fn emit(&mut self, event: RegistryEvent) {
        debug!(?event, "registry changed");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

/// Letters, digits, `-` and `_`, not starting with a digit.
pub fn is_valid_name(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED.contains(name.to_ascii_lowercase().as_str())
}

fn builtin_breeds() -> Vec<Breed> {
    vec![
        Breed::builtin("turtles", "turtle", BreedKind::Turtle),
        Breed::builtin("patches", "patch", BreedKind::Patch),
        Breed::builtin("links", "link", BreedKind::UndirectedLink),
    ]
}

fn reserved_word_set() -> HashSet<&'static str> {
    [
        "and",
        "any?",
        "ask",
        "back",
        "bk",
        "breed",
        "ca",
        "clear-all",
        "color",
        "create-turtles",
        "crt",
        "die",
        "directed-link-breed",
        "end",
        "extensions",
        "false",
        "fd",
        "foreach",
        "forward",
        "globals",
        "hatch",
        "heading",
        "hidden?",
        "if",
        "ifelse",
        "ifelse-value",
        "label",
        "left",
        "let",
        "links-own",
        "lt",
        "mod",
        "myself",
        "nobody",
        "not",
        "of",
        "one-of",
        "or",
        "other",
        "patches-own",
        "pcolor",
        "print",
        "pxcor",
        "pycor",
        "random",
        "repeat",
        "report",
        "reset-ticks",
        "right",
        "rt",
        "self",
        "set",
        "setxy",
        "show",
        "shape",
        "size",
        "sprout",
        "stop",
        "tick",
        "ticks",
        "to",
        "to-report",
        "true",
        "turtles-own",
        "undirected-link-breed",
        "while",
        "who",
        "with",
        "xcor",
        "xor",
        "ycor",
    ]
    .into_iter()
    .collect()
}
