//! Material records and the single place that defines what a missing
//! material or texture looks like.

use std::collections::HashMap;

use crate::texture::TextureData;

/// Named bag of optional material properties from an MTL file.
/// An absent field means "use the renderer default", never zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialRecord {
    pub shininess: Option<f32>,
    pub ambient: Option<[f32; 3]>,
    pub diffuse: Option<[f32; 3]>,
    pub specular: Option<[f32; 3]>,
    pub emissive: Option<[f32; 3]>,
    /// Raw map arguments; any sampling options are kept verbatim.
    pub ambient_map: Option<String>,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub normal_map: Option<String>,
    pub optical_density: Option<f32>,
    pub opacity: Option<f32>,
    pub illum: Option<u32>,
}

pub type Materials = HashMap<String, MaterialRecord>;

/// Used for any material name that no library defines.
pub static FALLBACK_MATERIAL: MaterialRecord = MaterialRecord {
    shininess: Some(100.0),
    ambient: Some([0.2, 0.2, 0.2]),
    diffuse: Some([0.8, 0.8, 0.8]),
    specular: Some([0.2, 0.2, 0.2]),
    emissive: None,
    ambient_map: None,
    diffuse_map: None,
    specular_map: None,
    normal_map: None,
    optical_density: None,
    opacity: None,
    illum: None,
};

/// Fallback values for missing materials and texture maps.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMaterialPolicy;

impl DefaultMaterialPolicy {
    /// The named record, or [`FALLBACK_MATERIAL`] when it is not defined.
    pub fn resolve<'a>(name: &str, materials: &'a Materials) -> &'a MaterialRecord {
        match materials.get(name) {
            Some(record) => record,
            None => {
                log::debug!("Material '{}' not defined; using fallback", name);
                &FALLBACK_MATERIAL
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but lighting terms the record leaves
    /// out are filled from the fallback so every shading input is present.
    pub fn resolve_complete(name: &str, materials: &Materials) -> MaterialRecord {
        let record = Self::resolve(name, materials);
        MaterialRecord {
            shininess: record.shininess.or(FALLBACK_MATERIAL.shininess),
            ambient: record.ambient.or(FALLBACK_MATERIAL.ambient),
            diffuse: record.diffuse.or(FALLBACK_MATERIAL.diffuse),
            specular: record.specular.or(FALLBACK_MATERIAL.specular),
            ..record.clone()
        }
    }

    /// 1x1 opaque white pixel bound wherever a texture map is absent.
    pub fn fallback_texture() -> TextureData {
        TextureData::fallback_white()
    }
}
