//! OBJ geometry parser producing per-material geometry runs with flat,
//! already-triangulated attribute streams (one entry per triangle corner).

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};
use corelib::{CoreError, CoreResult, ParseWarning, WarningKind};

use crate::index::{
    ColorPool, FaceVertexIndex, IndexError, NormalPool, PoolLens, PositionPool, TexcoordPool,
    parse_face_vertex,
};

pub const DEFAULT_NAME: &str = "default";

/// Flat attribute streams of one geometry. Unused streams are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryData {
    pub position: Option<Vec<f32>>,
    pub texcoord: Option<Vec<f32>>,
    pub normal: Option<Vec<f32>>,
    pub color: Option<Vec<f32>>,
}

/// A run of faces sharing object name, group list and material.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub data: GeometryData,
}

impl Geometry {
    /// Number of triangle corners (vertices) in this geometry.
    pub fn corner_count(&self) -> usize {
        self.data.position.as_ref().map_or(0, |p| p.len() / 3)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedObj {
    pub geometries: Vec<Geometry>,
    /// Raw `mtllib` arguments, in file order.
    pub material_libs: Vec<String>,
    pub warnings: Vec<ParseWarning>,
}

/// Load and parse an OBJ file from a path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<ParsedObj> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_obj(&text).with_context(|| format!("Failed to parse OBJ file: {}", path.display()))
}

/// Load and parse OBJ text from any reader.
pub fn load_obj_from_reader<R: Read>(mut reader: R) -> Result<ParsedObj> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("Failed to read OBJ text")?;
    Ok(parse_obj(&text)?)
}

/// Parse from an in-memory reader; mainly handy in tests.
pub fn load_obj_from_str(contents: &str) -> Result<ParsedObj> {
    load_obj_from_reader(io::Cursor::new(contents))
}

/// Parse OBJ text that is already in memory.
pub fn parse_obj(text: &str) -> CoreResult<ParsedObj> {
    let mut parser = ObjParser::new();
    for (line_no, line) in text.lines().enumerate() {
        parser.line(line_no + 1, line)?;
    }
    Ok(parser.finish())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ObjKeyword<'a> {
    Vertex,
    Normal,
    TexCoord,
    Face,
    Smoothing,
    MaterialLib,
    UseMaterial,
    Group,
    Object,
    Unhandled(&'a str),
}

impl<'a> ObjKeyword<'a> {
    fn from_tag(tag: &'a str) -> Self {
        match tag {
            "v" => Self::Vertex,
            "vn" => Self::Normal,
            "vt" => Self::TexCoord,
            "f" => Self::Face,
            "s" => Self::Smoothing,
            "mtllib" => Self::MaterialLib,
            "usemtl" => Self::UseMaterial,
            "g" => Self::Group,
            "o" => Self::Object,
            other => Self::Unhandled(other),
        }
    }

    fn requires_argument(self) -> bool {
        !matches!(self, Self::Smoothing | Self::Group | Self::Unhandled(_))
    }
}

impl From<IndexError> for WarningKind {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Malformed(token) => WarningKind::MalformedIndex(token),
            IndexError::OutOfRange { index, pool_len } => {
                WarningKind::IndexOutOfRange { index, pool_len }
            }
        }
    }
}

/// Split a trimmed line into its keyword and the raw remainder.
pub(crate) fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((tag, rest)) => (tag, rest.trim()),
        None => (line, ""),
    }
}

/// Parse every whitespace-separated token as `f32`; bad tokens become 0.
pub(crate) fn parse_floats(
    args: &str,
    line: usize,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<f32> {
    args.split_whitespace()
        .map(|token| {
            token.parse::<f32>().unwrap_or_else(|_| {
                warn(warnings, line, WarningKind::MalformedNumber(token.to_string()));
                0.0
            })
        })
        .collect()
}

/// Copy the first `N` values, zero-filling (and warning about) any shortfall.
pub(crate) fn take_components<const N: usize>(
    values: &[f32],
    line: usize,
    warnings: &mut Vec<ParseWarning>,
) -> [f32; N] {
    let mut out = [0.0; N];
    if values.len() < N {
        warn(
            warnings,
            line,
            WarningKind::MissingComponents {
                expected: N,
                found: values.len(),
            },
        );
    }
    for (dst, src) in out.iter_mut().zip(values) {
        *dst = *src;
    }
    out
}

pub(crate) fn warn(warnings: &mut Vec<ParseWarning>, line: usize, kind: WarningKind) {
    let warning = ParseWarning::new(line, kind);
    log::warn!("{}", warning);
    warnings.push(warning);
}

/// Geometry still receiving faces.
struct GeometryBuilder {
    first_line: usize,
    object: String,
    groups: Vec<String>,
    material: String,
    position: Vec<f32>,
    texcoord: Vec<f32>,
    normal: Vec<f32>,
    color: Vec<f32>,
}

impl GeometryBuilder {
    fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    fn into_geometry(self, keep_colors: bool, warnings: &mut Vec<ParseWarning>) -> Geometry {
        let corners = self.position.len() / 3;
        let line = self.first_line;
        let mut stream = |name: &'static str, values: Vec<f32>, width: usize| {
            if values.is_empty() {
                None
            } else if values.len() / width != corners {
                warn(warnings, line, WarningKind::InconsistentStream { stream: name });
                None
            } else {
                Some(values)
            }
        };

        let texcoord = stream("texcoord", self.texcoord, 2);
        let normal = stream("normal", self.normal, 3);
        let color = if keep_colors {
            stream("color", self.color, 3)
        } else {
            None
        };

        Geometry {
            object: self.object,
            groups: self.groups,
            material: self.material,
            data: GeometryData {
                position: (!self.position.is_empty()).then_some(self.position),
                texcoord,
                normal,
                color,
            },
        }
    }
}

/// Mutable state for a single `parse_obj` call.
struct ObjParser {
    positions: PositionPool,
    texcoords: TexcoordPool,
    normals: NormalPool,
    /// Kept aligned with `positions`; vertices without colour get zeros.
    colors: ColorPool,
    saw_color: bool,

    object: String,
    groups: Vec<String>,
    material: String,

    current: Option<GeometryBuilder>,
    sealed: Vec<GeometryBuilder>,
    material_libs: Vec<String>,
    warnings: Vec<ParseWarning>,
}

impl ObjParser {
    fn new() -> Self {
        Self {
            positions: PositionPool::new(),
            texcoords: TexcoordPool::new(),
            normals: NormalPool::new(),
            colors: ColorPool::new(),
            saw_color: false,
            object: DEFAULT_NAME.to_string(),
            groups: vec![DEFAULT_NAME.to_string()],
            material: DEFAULT_NAME.to_string(),
            current: None,
            sealed: Vec::new(),
            material_libs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn line(&mut self, line_no: usize, raw: &str) -> CoreResult<()> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let (tag, args) = split_keyword(trimmed);
        let keyword = ObjKeyword::from_tag(tag);
        if args.is_empty() && keyword.requires_argument() {
            return Err(CoreError::MissingArgument {
                keyword: tag.to_string(),
                line: line_no,
            });
        }

        match keyword {
            ObjKeyword::Vertex => self.vertex(args, line_no),
            ObjKeyword::Normal => {
                let values = parse_floats(args, line_no, &mut self.warnings);
                let n = take_components::<3>(&values, line_no, &mut self.warnings);
                self.normals.push(n);
            }
            ObjKeyword::TexCoord => {
                // A third (w) component is allowed and ignored.
                let values = parse_floats(args, line_no, &mut self.warnings);
                let t = take_components::<2>(&values, line_no, &mut self.warnings);
                self.texcoords.push(t);
            }
            ObjKeyword::Face => self.face(args, line_no),
            ObjKeyword::Smoothing => {}
            ObjKeyword::MaterialLib => self.material_libs.push(args.to_string()),
            ObjKeyword::UseMaterial => {
                self.material = args.to_string();
                self.close_geometry();
            }
            ObjKeyword::Group => {
                self.groups = if args.is_empty() {
                    vec![DEFAULT_NAME.to_string()]
                } else {
                    args.split_whitespace().map(str::to_string).collect()
                };
                self.close_geometry();
            }
            ObjKeyword::Object => {
                self.object = args.to_string();
                self.close_geometry();
            }
            ObjKeyword::Unhandled(tag) => {
                warn(
                    &mut self.warnings,
                    line_no,
                    WarningKind::UnhandledKeyword(tag.to_string()),
                );
            }
        }
        Ok(())
    }

    fn vertex(&mut self, args: &str, line_no: usize) {
        let values = parse_floats(args, line_no, &mut self.warnings);
        let (xyz, rest) = values.split_at(values.len().min(3));
        let position = take_components::<3>(xyz, line_no, &mut self.warnings);
        self.positions.push(position);

        // More than three numbers: the tail is an inline vertex colour.
        if rest.is_empty() {
            self.colors.push([0.0; 3]);
        } else {
            self.saw_color = true;
            let color = take_components::<3>(rest, line_no, &mut self.warnings);
            self.colors.push(color);
        }
    }

    fn face(&mut self, args: &str, line_no: usize) {
        let tokens: Vec<&str> = args.split_whitespace().collect();
        if tokens.len() < 3 {
            warn(
                &mut self.warnings,
                line_no,
                WarningKind::DegenerateFace {
                    corners: tokens.len(),
                },
            );
            return;
        }

        // Negative indices are relative to the pools as they are right now.
        let lens = PoolLens {
            position: self.positions.len(),
            texcoord: self.texcoords.len(),
            normal: self.normals.len(),
        };
        let corners: Vec<Option<FaceVertexIndex>> = tokens
            .iter()
            .map(|token| match parse_face_vertex(token, lens) {
                Ok(corner) => Some(corner),
                Err(err) => {
                    warn(&mut self.warnings, line_no, err.into());
                    None
                }
            })
            .collect();

        let builder = self.current.get_or_insert_with(|| GeometryBuilder {
            first_line: line_no,
            object: self.object.clone(),
            groups: self.groups.clone(),
            material: self.material.clone(),
            position: Vec::new(),
            texcoord: Vec::new(),
            normal: Vec::new(),
            color: Vec::new(),
        });

        // Fan around corner 0; a triangle with an unresolved corner is dropped.
        for tri in 1..corners.len() - 1 {
            let (Some(a), Some(b), Some(c)) = (corners[0], corners[tri], corners[tri + 1]) else {
                continue;
            };
            for corner in [a, b, c] {
                push_corner(
                    builder,
                    &corner,
                    &self.positions,
                    &self.texcoords,
                    &self.normals,
                    &self.colors,
                );
            }
        }
    }

    /// Seal the open geometry if it has data; an empty one is discarded so the
    /// next face opens a fresh geometry with the current labels.
    fn close_geometry(&mut self) {
        if let Some(builder) = self.current.take() {
            if !builder.is_empty() {
                self.sealed.push(builder);
            }
        }
    }

    fn finish(mut self) -> ParsedObj {
        self.close_geometry();
        let keep_colors = self.saw_color;
        let mut warnings = self.warnings;
        let geometries: Vec<Geometry> = self
            .sealed
            .into_iter()
            .map(|builder| builder.into_geometry(keep_colors, &mut warnings))
            .collect();

        log::debug!(
            "Parsed OBJ: {} geometries, {} positions, {} material libraries, {} warnings",
            geometries.len(),
            self.positions.len() - 1,
            self.material_libs.len(),
            warnings.len()
        );

        ParsedObj {
            geometries,
            material_libs: self.material_libs,
            warnings,
        }
    }
}

fn push_corner(
    builder: &mut GeometryBuilder,
    corner: &FaceVertexIndex,
    positions: &PositionPool,
    texcoords: &TexcoordPool,
    normals: &NormalPool,
    colors: &ColorPool,
) {
    // Indices were bounds-checked against these pools in `parse_face_vertex`.
    if let Some(p) = positions.get(corner.position) {
        builder.position.extend_from_slice(p);
    }
    if let Some(c) = colors.get(corner.position) {
        builder.color.extend_from_slice(c);
    }
    if let Some(t) = corner.texcoord.and_then(|i| texcoords.get(i)) {
        builder.texcoord.extend_from_slice(t);
    }
    if let Some(n) = corner.normal.and_then(|i| normals.get(i)) {
        builder.normal.extend_from_slice(n);
    }
}
