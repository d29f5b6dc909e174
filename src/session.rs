use crate::catalog::Catalog;
use crate::generator::{GenerateError, GenerateOptions, Generator};
use crate::project::ProjectFile;
use crate::registry::{Registries, RegistryError};
use crate::workspace::Workspace;
use anyhow::Result;
use tracing::{debug, warn};

/// Change notifications delivered by the editor surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    Create,
    Delete,
    Change,
    Move,
    /// Scroll, zoom, selection and other view-only changes.
    View,
}

impl EditorEvent {
    pub fn is_meaningful(self) -> bool {
        !matches!(self, EditorEvent::View)
    }
}

/// Receives every newly generated program, e.g. to compile and run it in an
/// external engine.
pub trait RuntimeBridge {
    fn submit(&mut self, source: &str);
}

pub struct Session {
    catalog: Catalog,
    registries: Registries,
    workspace: Workspace,
    options: GenerateOptions,
    output: String,
    last_error: Option<GenerateError>,
    bridge: Option<Box<dyn RuntimeBridge>>,
}

impl Session {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            registries: Registries::new(),
            workspace: Workspace::new(),
            options: GenerateOptions::default(),
            output: String::new(),
            last_error: None,
            bridge: None,
        }
    }

    pub fn from_project(catalog: Catalog, project: ProjectFile) -> Result<Self> {
        let (registries, workspace) = project.into_parts()?;
        let mut session = Self::new(catalog);
        session.registries = registries;
        session.workspace = workspace;
        // A stale block type in a saved file leaves the output empty but the
        // session usable.
        let _ = session.regenerate();
        Ok(session)
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_bridge(mut self, bridge: Box<dyn RuntimeBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Last successfully generated program.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn last_error(&self) -> Option<&GenerateError> {
        self.last_error.as_ref()
    }

    /// Dropdown choices for a block field, computed from the current registries.
    pub fn field_options(&self, block_type: &str, field: &str) -> Option<Vec<String>> {
        self.catalog.field_options(block_type, field, &self.registries)
    }

    /// Applies a workspace edit. View-only events are ignored.
    pub fn handle_event(&mut self, event: EditorEvent, workspace: Workspace) -> Result<(), GenerateError> {
        if !event.is_meaningful() {
            return Ok(());
        }
        debug!(?event, blocks = workspace.blocks.len(), "workspace changed");
        self.workspace = workspace;
        self.regenerate()
    }

    /// Runs a registry mutation and regenerates when it succeeds. Generation
    /// failures are kept in [`last_error`](Self::last_error).
    pub fn edit_registries<T>(
        &mut self,
        edit: impl FnOnce(&mut Registries) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let value = edit(&mut self.registries)?;
        let _ = self.regenerate();
        Ok(value)
    }

    pub fn to_project(&self) -> ProjectFile {
        ProjectFile::capture(&self.registries, &self.workspace)
    }

    fn regenerate(&mut self) -> Result<(), GenerateError> {
        let generated = Generator::new(&self.catalog)
            .with_options(self.options)
            .generate(&self.workspace, &self.registries);
        match generated {
            Ok(source) => {
                self.last_error = None;
                if source != self.output {
                    self.output = source;
                    if let Some(bridge) = self.bridge.as_mut() {
                        bridge.submit(&self.output);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(%err, "cannot generate code; keeping previous output");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}
