//! Model manifest: a small TOML file naming the geometry and its libraries.
//!
//! ```toml
//! obj = "chair.obj"
//! mtl = ["chair.mtl"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelManifest {
    pub obj: PathBuf,
    /// Explicit material libraries. Empty means "use the OBJ's mtllib lines".
    #[serde(default)]
    pub mtl: Vec<PathBuf>,
}

impl ModelManifest {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid model manifest")
    }

    /// Read a manifest; relative paths are taken from the manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest = Self::from_toml(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        Self {
            obj: base.join(self.obj),
            mtl: self.mtl.into_iter().map(|p| base.join(p)).collect(),
        }
    }
}
