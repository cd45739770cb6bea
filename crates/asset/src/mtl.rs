//! MTL material-library parser.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use corelib::{CoreError, CoreResult, ParseWarning, WarningKind};

use crate::{
    material::{MaterialRecord, Materials},
    obj::{parse_floats, split_keyword, take_components, warn},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedMtl {
    pub materials: Materials,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MtlKeyword<'a> {
    NewMaterial,
    Shininess,
    Ambient,
    Diffuse,
    Specular,
    Emissive,
    OpticalDensity,
    Opacity,
    Transparency,
    Illumination,
    AmbientMap,
    DiffuseMap,
    SpecularMap,
    NormalMap,
    Unhandled(&'a str),
}

impl<'a> MtlKeyword<'a> {
    fn from_tag(tag: &'a str) -> Self {
        match tag {
            "newmtl" => Self::NewMaterial,
            "Ns" => Self::Shininess,
            "Ka" => Self::Ambient,
            "Kd" => Self::Diffuse,
            "Ks" => Self::Specular,
            "Ke" => Self::Emissive,
            "Ni" => Self::OpticalDensity,
            "d" => Self::Opacity,
            "Tr" => Self::Transparency,
            "illum" => Self::Illumination,
            "map_Ka" => Self::AmbientMap,
            "map_Kd" => Self::DiffuseMap,
            "map_Ns" | "map_Ks" => Self::SpecularMap,
            "map_Bump" | "map_bump" | "bump" | "norm" => Self::NormalMap,
            other => Self::Unhandled(other),
        }
    }
}

/// Load and parse an MTL file from a path.
pub fn load_mtl_from_path(path: impl AsRef<Path>) -> Result<ParsedMtl> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_mtl(&text).with_context(|| format!("Failed to parse MTL file: {}", path.display()))
}

/// Parse MTL text into a name -> record map.
pub fn parse_mtl(text: &str) -> CoreResult<ParsedMtl> {
    let mut materials = Materials::new();
    let mut warnings = Vec::new();
    // Name of the record currently receiving properties.
    let mut current: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (tag, args) = split_keyword(trimmed);
        let keyword = MtlKeyword::from_tag(tag);
        if let MtlKeyword::Unhandled(tag) = keyword {
            warn(
                &mut warnings,
                line_no,
                WarningKind::UnhandledKeyword(tag.to_string()),
            );
            continue;
        }
        if args.is_empty() {
            return Err(CoreError::MissingArgument {
                keyword: tag.to_string(),
                line: line_no,
            });
        }

        if keyword == MtlKeyword::NewMaterial {
            materials.insert(args.to_string(), MaterialRecord::default());
            current = Some(args.to_string());
            continue;
        }

        let Some(record) = current.as_ref().and_then(|name| materials.get_mut(name)) else {
            warn(
                &mut warnings,
                line_no,
                WarningKind::PropertyOutsideMaterial(tag.to_string()),
            );
            continue;
        };

        match keyword {
            MtlKeyword::Shininess => record.shininess = Some(scalar(args, line_no, &mut warnings)),
            MtlKeyword::Ambient => record.ambient = Some(color(args, line_no, &mut warnings)),
            MtlKeyword::Diffuse => record.diffuse = Some(color(args, line_no, &mut warnings)),
            MtlKeyword::Specular => record.specular = Some(color(args, line_no, &mut warnings)),
            MtlKeyword::Emissive => record.emissive = Some(color(args, line_no, &mut warnings)),
            MtlKeyword::OpticalDensity => {
                record.optical_density = Some(scalar(args, line_no, &mut warnings));
            }
            MtlKeyword::Opacity => record.opacity = Some(scalar(args, line_no, &mut warnings)),
            MtlKeyword::Transparency => {
                record.opacity = Some(1.0 - scalar(args, line_no, &mut warnings));
            }
            MtlKeyword::Illumination => {
                record.illum = Some(integer(args, line_no, &mut warnings));
            }
            MtlKeyword::AmbientMap => record.ambient_map = Some(args.to_string()),
            MtlKeyword::DiffuseMap => record.diffuse_map = Some(args.to_string()),
            MtlKeyword::SpecularMap => record.specular_map = Some(args.to_string()),
            MtlKeyword::NormalMap => record.normal_map = Some(args.to_string()),
            MtlKeyword::NewMaterial | MtlKeyword::Unhandled(_) => {}
        }
    }

    log::debug!(
        "Parsed MTL: {} materials, {} warnings",
        materials.len(),
        warnings.len()
    );
    Ok(ParsedMtl {
        materials,
        warnings,
    })
}

/// First token as `f32`.
fn scalar(args: &str, line: usize, warnings: &mut Vec<ParseWarning>) -> f32 {
    let first = args.split_whitespace().next().unwrap_or_default();
    parse_floats(first, line, warnings)
        .first()
        .copied()
        .unwrap_or_default()
}

fn integer(args: &str, line: usize, warnings: &mut Vec<ParseWarning>) -> u32 {
    let first = args.split_whitespace().next().unwrap_or_default();
    first.parse::<u32>().unwrap_or_else(|_| {
        warn(warnings, line, WarningKind::MalformedNumber(first.to_string()));
        0
    })
}

/// RGB triple; a single value applies to all three channels.
fn color(args: &str, line: usize, warnings: &mut Vec<ParseWarning>) -> [f32; 3] {
    let values = parse_floats(args, line, warnings);
    match values.as_slice() {
        [v] => [*v; 3],
        _ => take_components::<3>(&values, line, warnings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffuse_only_material() {
        let parsed = parse_mtl("newmtl red\nKd 1 0 0\n").unwrap();
        assert_eq!(parsed.materials.len(), 1);
        assert_eq!(
            parsed.materials["red"],
            MaterialRecord {
                diffuse: Some([1.0, 0.0, 0.0]),
                ..Default::default()
            }
        );
    }

    #[test]
    fn full_material_block() {
        let src = r#"
            # exported
            newmtl wood
            Ns 96.078431
            Ka 1.000000 1.000000 1.000000
            Kd 0.640000 0.640000 0.640000
            Ks 0.5 0.5 0.5
            Ke 0 0 0
            Ni 1.000000
            d 0.75
            illum 2
            map_Kd -s 1 1 1 textures/wood diffuse.png
            map_Bump wood_n.png
            map_Ka wood_ao.png
            map_Ns wood_s.png
        "#;
        let parsed = parse_mtl(src).unwrap();
        let wood = &parsed.materials["wood"];
        assert_eq!(wood.shininess, Some(96.078431));
        assert_eq!(wood.ambient, Some([1.0, 1.0, 1.0]));
        assert_eq!(wood.diffuse, Some([0.64, 0.64, 0.64]));
        assert_eq!(wood.emissive, Some([0.0, 0.0, 0.0]));
        assert_eq!(wood.optical_density, Some(1.0));
        assert_eq!(wood.opacity, Some(0.75));
        assert_eq!(wood.illum, Some(2));
        assert_eq!(
            wood.diffuse_map.as_deref(),
            Some("-s 1 1 1 textures/wood diffuse.png")
        );
        assert_eq!(wood.normal_map.as_deref(), Some("wood_n.png"));
        assert_eq!(wood.ambient_map.as_deref(), Some("wood_ao.png"));
        assert_eq!(wood.specular_map.as_deref(), Some("wood_s.png"));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn properties_follow_the_latest_newmtl() {
        let src = "newmtl a\nKd 1 0 0\nnewmtl b\nKd 0 1 0\nNs 10\n";
        let parsed = parse_mtl(src).unwrap();
        assert_eq!(parsed.materials["a"].shininess, None);
        assert_eq!(parsed.materials["b"].diffuse, Some([0.0, 1.0, 0.0]));
        assert_eq!(parsed.materials["b"].shininess, Some(10.0));
    }

    #[test]
    fn single_value_color_broadcasts() {
        let parsed = parse_mtl("newmtl grey\nKa 0.3\n").unwrap();
        assert_eq!(parsed.materials["grey"].ambient, Some([0.3, 0.3, 0.3]));
    }

    #[test]
    fn transparency_is_inverted_opacity() {
        let parsed = parse_mtl("newmtl glass\nTr 0.25\n").unwrap();
        assert_eq!(parsed.materials["glass"].opacity, Some(0.75));
    }

    #[test]
    fn property_before_newmtl_is_skipped() {
        let parsed = parse_mtl("Kd 1 1 1\nnewmtl a\n").unwrap();
        assert_eq!(parsed.materials["a"], MaterialRecord::default());
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::new(
                1,
                WarningKind::PropertyOutsideMaterial("Kd".into())
            )]
        );
    }

    #[test]
    fn unknown_keywords_do_not_abort() {
        let parsed = parse_mtl("newmtl a\nTf 1 1 1\nsharpness 60\nKd 0.5 0.5 0.5\n").unwrap();
        assert_eq!(parsed.materials["a"].diffuse, Some([0.5, 0.5, 0.5]));
        assert_eq!(parsed.warnings.len(), 2);
    }

    #[test]
    fn newmtl_without_name_is_fatal() {
        assert!(matches!(
            parse_mtl("newmtl\n"),
            Err(CoreError::MissingArgument { line: 1, .. })
        ));
    }

    #[test]
    fn parsing_is_deterministic() {
        let src = "newmtl a\nKd 1 0 0\nmap_Kd a.png\nnewmtl b\nNs 5\n";
        assert_eq!(parse_mtl(src).unwrap(), parse_mtl(src).unwrap());
    }
}
