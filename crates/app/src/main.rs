//! Command-line front end: load an OBJ (plus material libraries), assemble it
//! and log what a renderer would receive.

mod manifest;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use asset::{Model, TextureData};

use crate::manifest::ModelManifest;

#[derive(Debug, Default, PartialEq)]
struct Options {
    obj: Option<PathBuf>,
    mtl: Vec<PathBuf>,
    manifest: Option<PathBuf>,
    dedup: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Options {
    // Accept: --obj=PATH --mtl=PATH (repeatable) --manifest=PATH --dedup
    let mut opts = Options::default();
    for arg in args {
        if let Some(v) = arg.strip_prefix("--obj=") {
            opts.obj = Some(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--mtl=") {
            opts.mtl.push(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--manifest=") {
            opts.manifest = Some(PathBuf::from(v));
        } else if arg == "--dedup" {
            opts.dedup = true;
        } else if arg.starts_with("--") {
            log::warn!("Unknown option '{}', ignored.", arg);
        }
    }
    opts
}

/// Collapse the options into the OBJ path and optional explicit libraries.
fn model_paths(opts: Options) -> Result<(PathBuf, Option<Vec<PathBuf>>)> {
    let (obj, mtl) = match (opts.manifest, opts.obj) {
        (Some(manifest), _) => {
            let m = ModelManifest::load(&manifest)?;
            (m.obj, m.mtl)
        }
        (None, Some(obj)) => (obj, opts.mtl),
        (None, None) => bail!("Nothing to load: pass --obj=PATH or --manifest=PATH"),
    };
    let mtl = (!mtl.is_empty()).then_some(mtl);
    Ok((obj, mtl))
}

/// Map names are relative to the library that defined the material; the OBJ
/// directory is used when that is unknown.
fn texture_dir<'a>(model: &'a Model, material: &str, obj_dir: &'a Path) -> &'a Path {
    model.texture_dir(material).unwrap_or(obj_dir)
}

fn report(model: &Model, obj_dir: &Path, dedup: bool) -> Result<()> {
    for w in &model.warnings {
        log::debug!("{}", w);
    }
    log::info!(
        "{} geometries, {} materials, {} vertices ({} bytes), {} warnings",
        model.geometries.len(),
        model.materials.len(),
        model.vertex_count(),
        model.mesh.buffer.as_bytes().len(),
        model.warnings.len()
    );

    for (range, material) in model.mesh.bindings(&model.materials) {
        let dir = texture_dir(model, &range.material, obj_dir);
        let texture = TextureData::load_or_fallback(dir, material.diffuse_map.as_deref());
        log::info!(
            "draw '{}': vertices {}..{}, diffuse {:?}, texture {}x{}",
            range.material,
            range.start,
            range.start + range.count,
            material.diffuse.unwrap_or_default(),
            texture.width,
            texture.height
        );
    }

    if dedup {
        let indexed = model.mesh.buffer.to_indexed()?;
        log::info!(
            "Indexed: {} unique vertices, {} indices",
            indexed.vertices.len(),
            indexed.indices.len()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args(std::env::args().skip(1));
    let dedup = opts.dedup;
    let (obj, mtl) = model_paths(opts)?;
    log::info!("Loading {} (libraries: {:?})", obj.display(), mtl);

    let model = Model::load(&obj, mtl.as_deref())?;
    let obj_dir = obj.parent().unwrap_or_else(|| Path::new(""));
    report(&model, obj_dir, dedup)?;

    log::info!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags() {
        let opts = parse_args(args(&["--obj=a.obj", "--mtl=a.mtl", "--mtl=b.mtl", "--dedup"]));
        assert_eq!(opts.obj, Some(PathBuf::from("a.obj")));
        assert_eq!(opts.mtl.len(), 2);
        assert!(opts.dedup);
    }

    #[test]
    fn obj_without_mtl_uses_mtllib() {
        let opts = parse_args(args(&["--obj=a.obj"]));
        let (obj, mtl) = model_paths(opts).unwrap();
        assert_eq!(obj, PathBuf::from("a.obj"));
        assert_eq!(mtl, None);
    }

    #[test]
    fn nothing_to_load_is_an_error() {
        assert!(model_paths(Options::default()).is_err());
    }

    #[test]
    fn textures_resolve_next_to_their_library() {
        let mut model = Model::from_sources("v 0 0 0\n", &["newmtl red\nmap_Kd red.png\n"]).unwrap();
        let obj_dir = Path::new("models");
        assert_eq!(texture_dir(&model, "red", obj_dir), obj_dir);

        model
            .material_dirs
            .insert("red".into(), PathBuf::from("other/dir"));
        assert_eq!(texture_dir(&model, "red", obj_dir), Path::new("other/dir"));
        assert_eq!(texture_dir(&model, "ghost", obj_dir), obj_dir);
    }
}
