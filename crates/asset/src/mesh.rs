//! CPU-side mesh representation and the assembler that turns parsed
//! geometries into one interleaved buffer plus per-material draw ranges.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::{
    material::{DefaultMaterialPolicy, MaterialRecord, Materials},
    obj::Geometry,
};

/// Vertex with position/normal/uv. Values are in object space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    fn from_slice(v: &[f32]) -> Self {
        Self::new([v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7]])
    }
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }
}

/// Flat `f32` buffer laid out as position.xyz, normal.xyz, texcoord.uv.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterleavedVertexBuffer {
    data: Vec<f32>,
}

impl InterleavedVertexBuffer {
    /// Floats per vertex.
    pub const STRIDE: usize = 8;

    pub fn vertex_count(&self) -> usize {
        self.data.len() / Self::STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Raw bytes, ready for a vertex-buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn vertices(&self) -> impl Iterator<Item = MeshVertex> + '_ {
        self.data
            .chunks_exact(Self::STRIDE)
            .map(MeshVertex::from_slice)
    }

    /// Collapse bit-identical vertices into an indexed mesh.
    pub fn to_indexed(&self) -> anyhow::Result<MeshData> {
        let mut unique: HashMap<[u32; 8], u32> = HashMap::new();
        let mut vertices: Vec<MeshVertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::with_capacity(self.vertex_count());

        for vertex in self.vertices() {
            let key: [u32; 8] = bytemuck::cast(vertex);
            let index = match unique.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = u32::try_from(vertices.len())
                        .map_err(|_| anyhow::anyhow!("Too many vertices (>{})", u32::MAX))?;
                    vertices.push(vertex);
                    unique.insert(key, idx);
                    idx
                }
            };
            indices.push(index);
        }

        let mesh = MeshData::new(vertices, indices);
        debug_assert!(self.is_empty() || mesh.is_valid());
        Ok(mesh)
    }

    fn push_geometry(&mut self, geometry: &Geometry) -> usize {
        let corners = geometry.corner_count();
        let data = &geometry.data;
        let position = data.position.as_deref().unwrap_or_default();
        let normal = data.normal.as_deref().unwrap_or_default();
        let texcoord = data.texcoord.as_deref().unwrap_or_default();

        self.data.reserve(corners * Self::STRIDE);
        for i in 0..corners {
            self.data.extend_from_slice(&position[i * 3..i * 3 + 3]);
            push_or_zero(&mut self.data, normal.get(i * 3..i * 3 + 3), 3);
            push_or_zero(&mut self.data, texcoord.get(i * 2..i * 2 + 2), 2);
        }
        corners
    }
}

fn push_or_zero(dst: &mut Vec<f32>, src: Option<&[f32]>, width: usize) {
    match src {
        Some(values) => dst.extend_from_slice(values),
        None => dst.extend(std::iter::repeat_n(0.0, width)),
    }
}

/// Contiguous slice of the shared buffer drawn with one material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawRange {
    pub material: String,
    /// First vertex (not float) of the range.
    pub start: usize,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssembledMesh {
    pub buffer: InterleavedVertexBuffer,
    pub ranges: Vec<DrawRange>,
}

impl AssembledMesh {
    /// Pair each range with the material it binds. Unknown names get the
    /// fallback, and absent lighting terms are filled in.
    pub fn bindings<'a>(
        &'a self,
        materials: &'a Materials,
    ) -> impl Iterator<Item = (&'a DrawRange, MaterialRecord)> + 'a {
        self.ranges.iter().map(move |range| {
            (
                range,
                DefaultMaterialPolicy::resolve_complete(&range.material, materials),
            )
        })
    }
}

/// Build the shared buffer and one draw range per distinct material, in the
/// order materials first appear. Unknown materials are not an error.
pub fn assemble(geometries: &[Geometry], materials: &Materials) -> AssembledMesh {
    let mut buffer = InterleavedVertexBuffer::default();
    let drawable: Vec<&Geometry> = geometries.iter().filter(|g| g.corner_count() > 0).collect();

    for geometry in &drawable {
        if !materials.contains_key(&geometry.material) {
            log::debug!(
                "Geometry '{}' uses undefined material '{}'",
                geometry.object,
                geometry.material
            );
        }
    }

    let Some(first) = drawable.first() else {
        return AssembledMesh::default();
    };

    // Single material: one range over everything.
    if drawable.iter().all(|g| g.material == first.material) {
        for geometry in &drawable {
            buffer.push_geometry(geometry);
        }
        let ranges = vec![DrawRange {
            material: first.material.clone(),
            start: 0,
            count: buffer.vertex_count(),
        }];
        log::debug!("Assembled {} vertices in 1 range", buffer.vertex_count());
        return AssembledMesh { buffer, ranges };
    }

    let mut order: Vec<(&str, Vec<&Geometry>)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for geometry in drawable {
        let idx = *slot.entry(geometry.material.as_str()).or_insert_with(|| {
            order.push((geometry.material.as_str(), Vec::new()));
            order.len() - 1
        });
        order[idx].1.push(geometry);
    }

    let mut ranges: Vec<DrawRange> = Vec::with_capacity(order.len());
    for (material, group) in order {
        let start = buffer.vertex_count();
        let count: usize = group.iter().map(|g| buffer.push_geometry(g)).sum();
        ranges.push(DrawRange {
            material: material.to_string(),
            start,
            count,
        });
    }

    log::debug!(
        "Assembled {} vertices in {} ranges",
        buffer.vertex_count(),
        ranges.len()
    );
    AssembledMesh { buffer, ranges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{material::FALLBACK_MATERIAL, obj::parse_obj};

    const TRI: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nvn 0 0 1\nvt 0 0\nvt 1 0\nvt 1 1\n";

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
    }

    #[test]
    fn single_material_collapses_to_one_range() {
        let src = format!("{TRI}usemtl a\nf 1 2 3\no other\nf 3 2 1\ng g2\nf 1 2 3\n");
        let obj = parse_obj(&src).unwrap();
        assert_eq!(obj.geometries.len(), 3);
        let total: usize = obj.geometries.iter().map(Geometry::corner_count).sum();

        let mesh = assemble(&obj.geometries, &Materials::new());
        assert_eq!(
            mesh.ranges,
            vec![DrawRange {
                material: "a".into(),
                start: 0,
                count: total
            }]
        );
        assert_eq!(mesh.buffer.vertex_count(), total);
    }

    #[test]
    fn interleaves_with_stride_eight() {
        let src = format!("{TRI}f 1/1/1 2/2/1 3/3/1\n");
        let obj = parse_obj(&src).unwrap();
        let mesh = assemble(&obj.geometries, &Materials::new());
        assert_eq!(
            &mesh.buffer.as_slice()[8..16],
            &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0]
        );
        assert_eq!(mesh.buffer.as_bytes().len(), 3 * 8 * 4);
    }

    #[test]
    fn missing_attributes_are_zero_filled() {
        let obj = parse_obj("v 1 2 3\nv 4 5 6\nv 7 8 9\nf 1 2 3\n").unwrap();
        let mesh = assemble(&obj.geometries, &Materials::new());
        let first = mesh.buffer.vertices().next().unwrap();
        assert_eq!(first, MeshVertex::new([1.0, 2.0, 3.0], [0.0; 3], [0.0; 2]));
    }

    #[test]
    fn ranges_partition_buffer_in_first_seen_order() {
        let src = format!(
            "{TRI}usemtl a\nf 1 2 3\nusemtl b\nf 1 2 3\nf 1 2 3\nusemtl a\nf 1 2 3\n"
        );
        let obj = parse_obj(&src).unwrap();
        let mesh = assemble(&obj.geometries, &Materials::new());

        let names: Vec<&str> = mesh.ranges.iter().map(|r| r.material.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        let mut next = 0;
        for range in &mesh.ranges {
            assert_eq!(range.start, next);
            next += range.count;
        }
        assert_eq!(next, mesh.buffer.vertex_count());
        assert_eq!(mesh.ranges[0].count, 6);
        assert_eq!(mesh.ranges[1].count, 6);
    }

    #[test]
    fn consecutive_same_material_geometries_merge() {
        let src = format!("{TRI}usemtl a\nf 1 2 3\ng second\nf 1 2 3\nusemtl b\nf 1 2 3\n");
        let obj = parse_obj(&src).unwrap();
        assert_eq!(obj.geometries.len(), 3);
        let mesh = assemble(&obj.geometries, &Materials::new());
        assert_eq!(mesh.ranges.len(), 2);
        assert_eq!(mesh.ranges[0].count, 6);
    }

    #[test]
    fn unknown_material_binds_fallback() {
        let src = format!("{TRI}usemtl ghost\nf 1 2 3\n");
        let obj = parse_obj(&src).unwrap();
        let materials = Materials::new();
        let mesh = assemble(&obj.geometries, &materials);
        let bindings: Vec<_> = mesh.bindings(&materials).collect();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0.material, "ghost");
        assert_eq!(bindings[0].1, FALLBACK_MATERIAL);
    }

    #[test]
    fn empty_input_yields_empty_mesh() {
        let mesh = assemble(&[], &Materials::new());
        assert!(mesh.buffer.is_empty());
        assert!(mesh.ranges.is_empty());
    }

    #[test]
    fn indexed_pass_shares_identical_vertices() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let obj = parse_obj(src).unwrap();
        let mesh = assemble(&obj.geometries, &Materials::new());
        let indexed = mesh.buffer.to_indexed().unwrap();
        assert_eq!(indexed.vertices.len(), 4);
        assert_eq!(indexed.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn indexed_pass_on_empty_buffer_is_empty() {
        let indexed = InterleavedVertexBuffer::default().to_indexed().unwrap();
        assert!(!indexed.is_valid());
        assert!(indexed.vertices.is_empty());
    }

    #[test]
    fn bindings_fill_absent_lighting_terms() {
        let src = format!("{TRI}usemtl red\nf 1 2 3\n");
        let obj = parse_obj(&src).unwrap();
        let mut materials = Materials::new();
        materials.insert(
            "red".into(),
            MaterialRecord {
                diffuse: Some([1.0, 0.0, 0.0]),
                ..Default::default()
            },
        );
        let mesh = assemble(&obj.geometries, &materials);
        let (range, material) = mesh.bindings(&materials).next().unwrap();
        assert_eq!(range.count, 3);
        assert_eq!(material.diffuse, Some([1.0, 0.0, 0.0]));
        assert_eq!(material.ambient, FALLBACK_MATERIAL.ambient);
    }
}
