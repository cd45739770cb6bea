//! Asset loading: OBJ geometry and MTL material text in, interleaved vertex
//! buffer and per-material draw ranges out.
//! Parsers are pure functions over in-memory text; the `*_from_path` helpers
//! and [`model::Model::load`] are thin file-reading wrappers.

pub mod index;
pub mod material;
pub mod mesh;
pub mod model;
pub mod mtl;
pub mod obj;
pub mod texture;

pub use material::{DefaultMaterialPolicy, FALLBACK_MATERIAL, MaterialRecord, Materials};
pub use mesh::{AssembledMesh, DrawRange, InterleavedVertexBuffer, MeshData, MeshVertex, assemble};
pub use model::Model;
pub use mtl::{ParsedMtl, parse_mtl};
pub use obj::{Geometry, GeometryData, ParsedObj, parse_obj};
pub use texture::TextureData;
