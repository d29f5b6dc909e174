use crate::registry::{Registries, RegistrySnapshot};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Saved form of an editing session: registry contents plus the block graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub registries: RegistrySnapshot,
    #[serde(default)]
    pub workspace: Workspace,
}

impl ProjectFile {
    pub fn capture(registries: &Registries, workspace: &Workspace) -> Self {
        Self {
            registries: registries.snapshot(),
            workspace: workspace.clone(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid project JSON.")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'.", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Failed to load project '{}'.", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?.as_bytes())
            .with_context(|| format!("Failed to write '{}'.", path.display()))?;
        Ok(())
    }

    /// Rebuilds validated registries and hands back the block graph.
    pub fn into_parts(self) -> Result<(Registries, Workspace)> {
        let mut registries = Registries::new();
        registries
            .restore(&self.registries)
            .context("Saved registries are inconsistent.")?;
        Ok((registries, self.workspace))
    }
}
