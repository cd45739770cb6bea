//! Texture data for material maps.
//! Decoding happens here, outside the parsers: materials only carry map names.

use std::path::{Path, PathBuf};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let texture = Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        };
        if !texture.is_valid() {
            anyhow::bail!(
                "RGBA8 data is {} bytes, expected {} for {}x{}",
                texture.data.len(),
                texture.expected_len(),
                width,
                height
            );
        }
        Ok(texture)
    }

    /// Neutral 1x1 white pixel, bound when a material has no map.
    pub fn fallback_white() -> Self {
        Self {
            data: vec![255, 255, 255, 255],
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    /// Decode an image file (PNG or JPEG) into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open image {:?}: {}", path, e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::new_rgba8(width, height, data)
    }

    /// Load the map named by a material, or the fallback pixel if the material
    /// has no map or the file cannot be decoded.
    pub fn load_or_fallback(base_dir: &Path, map: Option<&str>) -> Self {
        let Some(map) = map else {
            return Self::fallback_white();
        };
        let path = resolve_map_path(base_dir, map);
        match Self::load(&path) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("Texture {:?} unavailable ({}); using fallback", path, err);
                Self::fallback_white()
            }
        }
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        self.data.len() == self.expected_len() && self.width > 0 && self.height > 0
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel() as usize
    }
}

/// Join a raw map reference to the directory of the material library.
///
/// Map arguments may carry sampling options before the file name
/// (`-s 1 1 1 textures/wood.png`). Known options are skipped together with
/// their arguments; the rest of the text is the file name, spaces included.
pub fn resolve_map_path(base_dir: &Path, map: &str) -> PathBuf {
    let mut rest = map.trim();
    while let Some((flag, after)) = split_token(rest) {
        let Some(arity) = option_arity(flag) else {
            break;
        };
        rest = skip_option_args(after, arity);
    }
    base_dir.join(rest)
}

/// Arguments taken by a map option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OptionArity {
    /// Up to this many numbers (`-s u [v [w]]`).
    Numbers(usize),
    /// Exactly one word (`-clamp on`, `-imfchan l`).
    Word,
}

fn option_arity(flag: &str) -> Option<OptionArity> {
    match flag {
        "-s" | "-o" | "-t" => Some(OptionArity::Numbers(3)),
        "-mm" => Some(OptionArity::Numbers(2)),
        "-bm" | "-boost" | "-texres" => Some(OptionArity::Numbers(1)),
        "-blendu" | "-blendv" | "-clamp" | "-cc" | "-imfchan" | "-type" => {
            Some(OptionArity::Word)
        }
        _ => None,
    }
}

fn skip_option_args(mut rest: &str, arity: OptionArity) -> &str {
    match arity {
        OptionArity::Numbers(max) => {
            for _ in 0..max {
                match split_token(rest) {
                    Some((token, after)) if token.parse::<f32>().is_ok() => rest = after,
                    _ => break,
                }
            }
            rest
        }
        OptionArity::Word => split_token(rest).map_or("", |(_, after)| after),
    }
}

/// First whitespace-separated token and the trimmed remainder.
fn split_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (text, ""),
    })
}
