//! Text-to-mesh pipeline: parse geometry and material libraries, then assemble.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    thread,
};

use anyhow::{Context, Result, anyhow};
use corelib::{CoreResult, ParseWarning};

use crate::{
    material::{DefaultMaterialPolicy, MaterialRecord, Materials},
    mesh::{AssembledMesh, assemble},
    mtl::{ParsedMtl, parse_mtl},
    obj::{Geometry, ParsedObj, parse_obj},
};

/// A fully loaded model: parsed records plus the renderer-ready mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub geometries: Vec<Geometry>,
    pub material_libs: Vec<String>,
    pub materials: Materials,
    /// Directory of the library file that defined each material, when read
    /// from disk. Map names in that library are relative to it.
    pub material_dirs: HashMap<String, PathBuf>,
    pub mesh: AssembledMesh,
    /// Warnings from the geometry text followed by each material library's.
    pub warnings: Vec<ParseWarning>,
}

impl Model {
    /// Build a model from texts that are already in memory. Later libraries
    /// override materials of the same name defined by earlier ones.
    pub fn from_sources(obj_text: &str, mtl_texts: &[&str]) -> CoreResult<Self> {
        let obj = parse_obj(obj_text)?;
        let mtls = mtl_texts
            .iter()
            .map(|text| parse_mtl(text).map(|mtl| (None, mtl)))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self::from_parsed(obj, mtls))
    }

    fn from_parsed(obj: ParsedObj, mtls: Vec<(Option<PathBuf>, ParsedMtl)>) -> Self {
        let mut materials = Materials::new();
        let mut material_dirs = HashMap::new();
        let mut warnings = obj.warnings;
        for (dir, mtl) in mtls {
            for name in mtl.materials.keys() {
                match &dir {
                    Some(dir) => material_dirs.insert(name.clone(), dir.clone()),
                    None => material_dirs.remove(name),
                };
            }
            materials.extend(mtl.materials);
            warnings.extend(mtl.warnings);
        }

        let mesh = assemble(&obj.geometries, &materials);
        Self {
            geometries: obj.geometries,
            material_libs: obj.material_libs,
            materials,
            material_dirs,
            mesh,
            warnings,
        }
    }

    /// Load a model from disk.
    ///
    /// With `mtl_paths` given, the geometry and material texts are parsed
    /// concurrently. Otherwise the `mtllib` names in the geometry text are
    /// resolved next to the OBJ file; unreadable libraries are skipped.
    pub fn load(obj_path: impl AsRef<Path>, mtl_paths: Option<&[PathBuf]>) -> Result<Self> {
        let obj_path = obj_path.as_ref();
        let obj_text = read_text(obj_path)?;

        let Some(mtl_paths) = mtl_paths else {
            let obj = parse_obj(&obj_text)
                .with_context(|| format!("Failed to parse OBJ file: {}", obj_path.display()))?;
            let base = obj_path.parent().unwrap_or_else(|| Path::new(""));
            let mut mtls = Vec::new();
            for path in obj.material_libs.iter().flat_map(|lib| library_paths(base, lib)) {
                match read_text(&path) {
                    Ok(text) => {
                        let mtl = parse_mtl(&text).with_context(|| {
                            format!("Failed to parse MTL file: {}", path.display())
                        })?;
                        mtls.push((Some(parent_dir(&path)), mtl));
                    }
                    Err(err) => log::warn!("Skipping material library: {:#}", err),
                }
            }
            return Ok(Self::from_parsed(obj, mtls));
        };

        let mtl_texts = mtl_paths
            .iter()
            .map(|p| read_text(p))
            .collect::<Result<Vec<_>>>()?;

        let (obj, mtls) = thread::scope(|scope| {
            let obj_task = scope.spawn(|| parse_obj(&obj_text));
            let mtl_task = scope.spawn(|| {
                mtl_texts
                    .iter()
                    .map(|text| parse_mtl(text))
                    .collect::<CoreResult<Vec<_>>>()
            });
            let obj = obj_task
                .join()
                .map_err(|_| anyhow!("OBJ parser thread panicked"))?;
            let mtls = mtl_task
                .join()
                .map_err(|_| anyhow!("MTL parser thread panicked"))?;
            anyhow::Ok((obj, mtls))
        })?;

        let obj = obj.with_context(|| format!("Failed to parse OBJ file: {}", obj_path.display()))?;
        let mtls = mtls.context("Failed to parse material library")?;
        let mtls = mtl_paths
            .iter()
            .map(|p| Some(parent_dir(p)))
            .zip(mtls)
            .collect();
        Ok(Self::from_parsed(obj, mtls))
    }

    /// Directory that map names of material `name` are relative to, if known.
    pub fn texture_dir(&self, name: &str) -> Option<&Path> {
        self.material_dirs.get(name).map(PathBuf::as_path)
    }

    /// Material bound to `name`, or the fallback.
    pub fn material(&self, name: &str) -> &MaterialRecord {
        DefaultMaterialPolicy::resolve(name, &self.materials)
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.buffer.vertex_count()
    }
}

/// Files named by one `mtllib` argument. The whole text is tried as a single
/// name first so names with spaces work; otherwise each token is a library.
fn library_paths(base: &Path, lib: &str) -> Vec<PathBuf> {
    let whole = base.join(lib);
    if whole.is_file() {
        return vec![whole];
    }
    lib.split_whitespace().map(|name| base.join(name)).collect()
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
