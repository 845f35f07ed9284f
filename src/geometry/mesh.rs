// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation: typed per-vertex attribute arrays plus a triangle list

use super::BoundingBox;
use crate::error::{GeometryError, Result};
use bitflags::bitflags;
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Array identifiers in their fixed serialization order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ArrayId {
    Position,
    Normal,
    Tangent,
    Color,
    Texcoord0,
    Texcoord1,
    SurfaceIndex,
    Skin,
    Morph,
    Triangle,
    Segment,
}

impl ArrayId {
    pub const ALL: [ArrayId; 11] = [
        ArrayId::Position,
        ArrayId::Normal,
        ArrayId::Tangent,
        ArrayId::Color,
        ArrayId::Texcoord0,
        ArrayId::Texcoord1,
        ArrayId::SurfaceIndex,
        ArrayId::Skin,
        ArrayId::Morph,
        ArrayId::Triangle,
        ArrayId::Segment,
    ];

    pub fn mask(self) -> ArrayMask {
        ArrayMask::from_bits_truncate(1 << self as u32)
    }

    /// Arrays holding exactly one element per vertex
    pub fn is_per_vertex(self) -> bool {
        matches!(
            self,
            ArrayId::Position
                | ArrayId::Normal
                | ArrayId::Tangent
                | ArrayId::Color
                | ArrayId::Texcoord0
                | ArrayId::Texcoord1
                | ArrayId::SurfaceIndex
        )
    }

    /// Size in bytes of one serialized element
    pub fn element_size(self) -> usize {
        match self {
            ArrayId::Position | ArrayId::Normal => 12,
            ArrayId::Tangent => 16,
            ArrayId::Color => 4,
            ArrayId::Texcoord0 | ArrayId::Texcoord1 => 8,
            ArrayId::SurfaceIndex => 4,
            // u16 bone, u16 pad, f32 weight
            ArrayId::Skin => 8,
            // position delta + normal delta
            ArrayId::Morph => 24,
            ArrayId::Triangle | ArrayId::Segment => 12,
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            ArrayId::Position | ArrayId::Normal => 3,
            ArrayId::Tangent | ArrayId::Color => 4,
            ArrayId::Texcoord0 | ArrayId::Texcoord1 => 2,
            ArrayId::SurfaceIndex => 1,
            ArrayId::Skin => 2,
            ArrayId::Morph => 6,
            ArrayId::Triangle | ArrayId::Segment => 3,
        }
    }
}

bitflags! {
    /// Set of array identifiers, used as an exclusion mask when copying
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ArrayMask: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const TANGENT = 1 << 2;
        const COLOR = 1 << 3;
        const TEXCOORD0 = 1 << 4;
        const TEXCOORD1 = 1 << 5;
        const SURFACE_INDEX = 1 << 6;
        const SKIN = 1 << 7;
        const MORPH = 1 << 8;
        const TRIANGLE = 1 << 9;
        const SEGMENT = 1 << 10;

        /// Arrays that only make sense for deforming meshes
        const DEFORM = Self::SKIN.bits() | Self::MORPH.bits();
    }
}

impl ArrayMask {
    pub fn contains_id(self, id: ArrayId) -> bool {
        self.contains(id.mask())
    }
}

/// Describes one array: identifier and element count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    pub id: ArrayId,
    pub count: usize,
}

impl ArrayDescriptor {
    pub fn new(id: ArrayId, count: usize) -> Self {
        Self { id, count }
    }

    pub fn element_size(&self) -> usize {
        self.id.element_size()
    }

    pub fn component_count(&self) -> usize {
        self.id.component_count()
    }

    pub fn byte_size(&self) -> usize {
        self.count * self.element_size()
    }

    /// Byte size rounded up to a 16-byte boundary
    pub fn padded_byte_size(&self) -> usize {
        (self.byte_size() + 15) & !15
    }
}

/// Packed RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub fn packed(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn from_packed(value: u32) -> Self {
        Self(value.to_le_bytes())
    }
}

/// One bone influence of a skinned vertex
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneInfluence {
    pub bone: u16,
    pub weight: f32,
}

/// Per-vertex deltas of one morph target
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MorphTarget {
    pub position_deltas: Vec<Vector3<f32>>,
    pub normal_deltas: Vec<Vector3<f32>>,
}

impl MorphTarget {
    pub fn zeroed(vertex_count: usize) -> Self {
        Self {
            position_deltas: vec![Vector3::zeros(); vertex_count],
            normal_deltas: vec![Vector3::zeros(); vertex_count],
        }
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    pub fn new(indices: [u32; 3]) -> Self {
        Self { indices }
    }

    pub fn is_degenerate(&self) -> bool {
        let [a, b, c] = self.indices;
        a == b || b == c || a == c
    }

    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.indices;
        Self::new([a, c, b])
    }
}

/// Contiguous triangle range drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub material_index: u32,
    pub triangle_start: u32,
    pub triangle_count: u32,
}

/// Triangular mesh stored as independent typed arrays.
///
/// Every non-empty per-vertex array holds exactly `vertex_count` elements;
/// an empty array means the attribute is absent. Skin data holds
/// `vertex_count * skin_size` influences, each morph target holds
/// `vertex_count` deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertex_count: usize,
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub tangents: Vec<Vector4<f32>>,
    pub colors: Vec<Color>,
    pub texcoords0: Vec<Point2<f32>>,
    pub texcoords1: Vec<Point2<f32>>,
    pub surface_indices: Vec<u32>,
    pub skin_size: usize,
    pub skin: Vec<BoneInfluence>,
    pub morphs: Vec<MorphTarget>,
    pub triangles: Vec<Triangle>,
    pub segments: Vec<Segment>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self::new()
    }

    /// Allocate a mesh holding exactly the described arrays
    pub fn with_arrays(vertex_count: usize, descriptors: &[ArrayDescriptor]) -> Self {
        let mut mesh = Self::new();
        mesh.allocate_storage(vertex_count, descriptors, 0, 0);
        mesh
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn has_array(&self, id: ArrayId) -> bool {
        self.array_len(id) > 0
    }

    /// Element count of an array, zero when absent
    pub fn array_len(&self, id: ArrayId) -> usize {
        match id {
            ArrayId::Position => self.positions.len(),
            ArrayId::Normal => self.normals.len(),
            ArrayId::Tangent => self.tangents.len(),
            ArrayId::Color => self.colors.len(),
            ArrayId::Texcoord0 => self.texcoords0.len(),
            ArrayId::Texcoord1 => self.texcoords1.len(),
            ArrayId::SurfaceIndex => self.surface_indices.len(),
            ArrayId::Skin => self.skin.len(),
            ArrayId::Morph => self.morphs.len() * self.vertex_count,
            ArrayId::Triangle => self.triangles.len(),
            ArrayId::Segment => self.segments.len(),
        }
    }

    /// Descriptors of every present array, in enumerated order
    pub fn array_descriptors(&self) -> Vec<ArrayDescriptor> {
        ArrayId::ALL
            .iter()
            .filter(|id| self.has_array(**id))
            .map(|id| ArrayDescriptor::new(*id, self.array_len(*id)))
            .collect()
    }

    /// Surface index of a vertex, zero when the mesh has no surface array
    pub fn surface_of(&self, vertex: usize) -> u32 {
        self.surface_indices.get(vertex).copied().unwrap_or(0)
    }

    pub fn triangle_positions(&self, triangle: &Triangle) -> [Point3<f32>; 3] {
        triangle.indices.map(|i| self.positions[i as usize])
    }

    /// Replace all backing storage with freshly allocated arrays.
    ///
    /// Arrays not listed are dropped. Per-vertex arrays get `vertex_count`
    /// default elements, triangle and segment arrays get the descriptor count.
    pub fn allocate_storage(
        &mut self,
        vertex_count: usize,
        descriptors: &[ArrayDescriptor],
        skin_size: usize,
        morph_count: usize,
    ) {
        *self = Mesh {
            vertex_count,
            ..Mesh::default()
        };
        for descriptor in descriptors {
            self.allocate_array(descriptor, skin_size, morph_count);
        }
    }

    /// Allocate new or replaced arrays, copying every other array from `source`.
    ///
    /// Skin and morph data of the source survive unless listed.
    pub fn allocate_storage_from(&mut self, source: &Mesh, descriptors: &[ArrayDescriptor]) {
        let mut exclude = ArrayMask::empty();
        for descriptor in descriptors {
            exclude |= descriptor.id.mask();
        }
        self.copy_mesh(source, exclude);
        for descriptor in descriptors {
            self.allocate_array(descriptor, source.skin_size, source.morphs.len());
        }
    }

    fn allocate_array(&mut self, descriptor: &ArrayDescriptor, skin_size: usize, morph_count: usize) {
        let n = self.vertex_count;
        debug_assert!(
            !descriptor.id.is_per_vertex() || descriptor.count == n,
            "per-vertex array {:?} described with {} elements for {} vertices",
            descriptor.id,
            descriptor.count,
            n
        );
        match descriptor.id {
            ArrayId::Position => self.positions = vec![Point3::origin(); n],
            ArrayId::Normal => self.normals = vec![Vector3::zeros(); n],
            ArrayId::Tangent => self.tangents = vec![Vector4::zeros(); n],
            ArrayId::Color => self.colors = vec![Color::WHITE; n],
            ArrayId::Texcoord0 => self.texcoords0 = vec![Point2::origin(); n],
            ArrayId::Texcoord1 => self.texcoords1 = vec![Point2::origin(); n],
            ArrayId::SurfaceIndex => self.surface_indices = vec![0; n],
            ArrayId::Skin => {
                self.skin_size = skin_size;
                self.skin = vec![BoneInfluence::default(); n * skin_size];
            }
            ArrayId::Morph => self.morphs = vec![MorphTarget::zeroed(n); morph_count],
            ArrayId::Triangle => self.triangles = vec![Triangle::default(); descriptor.count],
            ArrayId::Segment => self.segments = vec![Segment::default(); descriptor.count],
        }
    }

    fn clear_array(&mut self, id: ArrayId) {
        match id {
            ArrayId::Position => self.positions.clear(),
            ArrayId::Normal => self.normals.clear(),
            ArrayId::Tangent => self.tangents.clear(),
            ArrayId::Color => self.colors.clear(),
            ArrayId::Texcoord0 => self.texcoords0.clear(),
            ArrayId::Texcoord1 => self.texcoords1.clear(),
            ArrayId::SurfaceIndex => self.surface_indices.clear(),
            ArrayId::Skin => {
                self.skin.clear();
                self.skin_size = 0;
            }
            ArrayId::Morph => self.morphs.clear(),
            ArrayId::Triangle => self.triangles.clear(),
            ArrayId::Segment => self.segments.clear(),
        }
    }

    /// Deep-copy `source` into this mesh, skipping excluded arrays
    pub fn copy_mesh(&mut self, source: &Mesh, exclude: ArrayMask) {
        *self = source.clone();
        for id in ArrayId::ALL {
            if exclude.contains_id(id) {
                self.clear_array(id);
            }
        }
    }

    /// Deep-copy without skin and morph data
    pub fn copy_rigid_mesh(&mut self, source: &Mesh, exclude: ArrayMask) {
        self.copy_mesh(source, exclude | ArrayMask::DEFORM);
    }

    /// Check the array-length and index invariants
    pub fn validate(&self) -> Result<()> {
        for id in ArrayId::ALL {
            let actual = self.array_len(id);
            if id.is_per_vertex() && actual != 0 && actual != self.vertex_count {
                return Err(GeometryError::ArrayLength {
                    id,
                    expected: self.vertex_count,
                    actual,
                });
            }
        }
        if !self.skin.is_empty() && self.skin.len() != self.vertex_count * self.skin_size {
            return Err(GeometryError::ArrayLength {
                id: ArrayId::Skin,
                expected: self.vertex_count * self.skin_size,
                actual: self.skin.len(),
            });
        }
        for morph in &self.morphs {
            let actual = morph.position_deltas.len().min(morph.normal_deltas.len());
            if morph.position_deltas.len() != self.vertex_count
                || morph.normal_deltas.len() != self.vertex_count
            {
                return Err(GeometryError::ArrayLength {
                    id: ArrayId::Morph,
                    expected: self.vertex_count,
                    actual,
                });
            }
        }
        for (t, triangle) in self.triangles.iter().enumerate() {
            if let Some(&index) = triangle
                .indices
                .iter()
                .find(|&&i| i as usize >= self.vertex_count)
            {
                return Err(GeometryError::IndexOutOfRange {
                    triangle: t,
                    index,
                    vertex_count: self.vertex_count,
                });
            }
        }
        for (s, segment) in self.segments.iter().enumerate() {
            let end = segment.triangle_start as usize + segment.triangle_count as usize;
            if end > self.triangles.len() {
                return Err(GeometryError::SegmentOutOfRange {
                    segment: s,
                    triangle_count: self.triangles.len(),
                });
            }
        }
        Ok(())
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.positions)
    }

    /// Apply an affine transform to positions, normals, tangents and morph deltas.
    ///
    /// Tangents are transformed as plain directions; rebuild them afterwards
    /// when the transform contains non-uniform scale.
    pub fn transform_mesh(&mut self, matrix: &Matrix4<f32>) {
        let linear: Matrix3<f32> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(linear);

        for position in &mut self.positions {
            *position = matrix.transform_point(position);
        }
        for normal in &mut self.normals {
            *normal = unit_or_z(normal_matrix * *normal);
        }
        for tangent in &mut self.tangents {
            let direction = linear * tangent.xyz();
            *tangent = Vector4::new(direction.x, direction.y, direction.z, tangent.w);
        }
        for morph in &mut self.morphs {
            for delta in &mut morph.position_deltas {
                *delta = linear * *delta;
            }
            for delta in &mut morph.normal_deltas {
                *delta = normal_matrix * *delta;
            }
        }
    }

    pub fn translate_mesh(&mut self, offset: &Vector3<f32>) {
        for position in &mut self.positions {
            *position += offset;
        }
    }

    pub fn scale_mesh(&mut self, scale: &Vector3<f32>) {
        self.transform_mesh(&Matrix4::new_nonuniform_scaling(scale));
    }

    /// Flip orientation: normals, tangent handedness, morph normals and winding
    pub fn invert_mesh(&mut self) {
        for normal in &mut self.normals {
            *normal = -*normal;
        }
        for tangent in &mut self.tangents {
            tangent.w = -tangent.w;
        }
        for morph in &mut self.morphs {
            for delta in &mut morph.normal_deltas {
                *delta = -*delta;
            }
        }
        for triangle in &mut self.triangles {
            *triangle = triangle.flipped();
        }
    }

    /// Append another mesh; arrays present on only one side are default-filled
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertex_count as u32;
        let own = self.vertex_count;
        let theirs = other.vertex_count;

        merge_array(&mut self.positions, &other.positions, own, theirs, Point3::origin());
        merge_array(&mut self.normals, &other.normals, own, theirs, Vector3::z());
        merge_array(&mut self.tangents, &other.tangents, own, theirs, Vector4::new(1.0, 0.0, 0.0, 1.0));
        merge_array(&mut self.colors, &other.colors, own, theirs, Color::WHITE);
        merge_array(&mut self.texcoords0, &other.texcoords0, own, theirs, Point2::origin());
        merge_array(&mut self.texcoords1, &other.texcoords1, own, theirs, Point2::origin());
        merge_array(&mut self.surface_indices, &other.surface_indices, own, theirs, 0);
        // deform data only survives when both sides agree on its layout
        if self.skin_size == other.skin_size && !self.skin.is_empty() && !other.skin.is_empty() {
            self.skin.extend_from_slice(&other.skin);
        } else {
            self.skin.clear();
            self.skin_size = 0;
        }
        if self.morphs.len() == other.morphs.len() {
            for (mine, theirs) in self.morphs.iter_mut().zip(&other.morphs) {
                mine.position_deltas.extend_from_slice(&theirs.position_deltas);
                mine.normal_deltas.extend_from_slice(&theirs.normal_deltas);
            }
        } else {
            self.morphs.clear();
        }

        let triangle_offset = self.triangles.len() as u32;
        self.triangles.extend(other.triangles.iter().map(|t| {
            Triangle::new(t.indices.map(|i| i + offset))
        }));
        self.segments.extend(other.segments.iter().map(|s| Segment {
            triangle_start: s.triangle_start + triangle_offset,
            ..*s
        }));
        self.vertex_count = own + theirs;
    }

    /// Build a smaller mesh keeping the vertices listed in `kept` (new index
    /// order) and the given triangles, already expressed in new indices.
    pub fn remap_vertices(&self, kept: &[u32], triangles: Vec<Triangle>) -> Mesh {
        fn gather<T: Clone>(data: &[T], kept: &[u32]) -> Vec<T> {
            if data.is_empty() {
                return Vec::new();
            }
            kept.iter().map(|&i| data[i as usize].clone()).collect()
        }

        let skin = if self.skin_size > 0 {
            kept.iter()
                .flat_map(|&i| {
                    let start = i as usize * self.skin_size;
                    self.skin[start..start + self.skin_size].iter().copied()
                })
                .collect()
        } else {
            Vec::new()
        };

        Mesh {
            vertex_count: kept.len(),
            positions: gather(&self.positions, kept),
            normals: gather(&self.normals, kept),
            tangents: gather(&self.tangents, kept),
            colors: gather(&self.colors, kept),
            texcoords0: gather(&self.texcoords0, kept),
            texcoords1: gather(&self.texcoords1, kept),
            surface_indices: gather(&self.surface_indices, kept),
            skin_size: if skin.is_empty() { 0 } else { self.skin_size },
            skin,
            morphs: self
                .morphs
                .iter()
                .map(|m| MorphTarget {
                    position_deltas: gather(&m.position_deltas, kept),
                    normal_deltas: gather(&m.normal_deltas, kept),
                })
                .collect(),
            triangles,
            segments: Vec::new(),
        }
    }
}

fn merge_array<T: Clone>(mine: &mut Vec<T>, theirs: &[T], own: usize, other: usize, fill: T) {
    if mine.is_empty() && theirs.is_empty() {
        return;
    }
    if mine.is_empty() {
        mine.resize(own, fill.clone());
    }
    if theirs.is_empty() {
        mine.extend(std::iter::repeat(fill).take(other));
    } else {
        mine.extend_from_slice(theirs);
    }
}

/// Normalize, falling back to +Z for zero-length vectors
pub(crate) fn unit_or_z(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(f32::MIN_POSITIVE).unwrap_or_else(Vector3::z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;

    fn full_descriptors(n: usize) -> Vec<ArrayDescriptor> {
        vec![
            ArrayDescriptor::new(ArrayId::Position, n),
            ArrayDescriptor::new(ArrayId::Normal, n),
            ArrayDescriptor::new(ArrayId::Tangent, n),
            ArrayDescriptor::new(ArrayId::Skin, n * 2),
            ArrayDescriptor::new(ArrayId::Morph, n),
            ArrayDescriptor::new(ArrayId::Triangle, 1),
        ]
    }

    #[test]
    fn test_allocate_storage_sizes() {
        let mut mesh = Mesh::new();
        mesh.allocate_storage(3, &full_descriptors(3), 2, 1);

        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.tangents.len(), 3);
        assert_eq!(mesh.skin.len(), 6);
        assert_eq!(mesh.morphs.len(), 1);
        assert_eq!(mesh.triangles.len(), 1);
        assert!(mesh.colors.is_empty());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_allocate_storage_from_keeps_unlisted_arrays() {
        let mut source = Mesh::new();
        source.allocate_storage(3, &full_descriptors(3), 2, 1);
        source.positions[1] = Point3::new(1.0, 2.0, 3.0);

        let mut derived = Mesh::new();
        derived.allocate_storage_from(
            &source,
            &[ArrayDescriptor::new(ArrayId::Color, 3), ArrayDescriptor::new(ArrayId::Tangent, 3)],
        );

        assert_eq!(derived.positions[1], Point3::new(1.0, 2.0, 3.0));
        assert_eq!(derived.colors.len(), 3);
        assert_eq!(derived.skin.len(), 6);
        assert_eq!(derived.morphs.len(), 1);
    }

    #[test]
    fn test_padded_byte_size() {
        let descriptor = ArrayDescriptor::new(ArrayId::Position, 3);
        assert_eq!(descriptor.byte_size(), 36);
        assert_eq!(descriptor.padded_byte_size(), 48);
        assert_eq!(ArrayDescriptor::new(ArrayId::Tangent, 2).padded_byte_size(), 32);
    }

    #[test]
    fn test_copy_rigid_excludes_deform_arrays() {
        let mut source = Mesh::new();
        source.allocate_storage(3, &full_descriptors(3), 2, 1);

        let mut rigid = Mesh::new();
        rigid.copy_rigid_mesh(&source, ArrayMask::TANGENT);
        assert!(rigid.skin.is_empty());
        assert!(rigid.morphs.is_empty());
        assert!(rigid.tangents.is_empty());
        assert_eq!(rigid.normals.len(), 3);
    }

    #[test]
    fn test_validate_reports_bad_index() {
        let mut mesh = Primitive::quad(1.0).to_mesh();
        mesh.triangles[1].indices[2] = 9;
        assert!(matches!(
            mesh.validate(),
            Err(GeometryError::IndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn test_transform_renormalizes_normals() {
        let mut mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), true).to_mesh();
        mesh.scale_mesh(&Vector3::new(2.0, 1.0, 0.5));

        for normal in &mesh.normals {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-5);
        }
        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.size().x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.size().z, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_invert_flips_winding_and_normals() {
        let mut mesh = Primitive::quad(1.0).to_mesh();
        let before = mesh.triangles[0];
        mesh.invert_mesh();

        assert_eq!(mesh.triangles[0].indices[0], before.indices[0]);
        assert_eq!(mesh.triangles[0].indices[1], before.indices[2]);
        assert_eq!(mesh.triangles[0].indices[2], before.indices[1]);
        assert!(mesh.normals.iter().all(|n| n.z < 0.0));
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = Primitive::quad(1.0).to_mesh();
        let b = Primitive::quad(1.0).to_mesh();
        a.merge(&b);

        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.triangle_count(), 4);
        assert_eq!(a.triangles[2].indices.iter().min(), Some(&4));
        assert!(a.validate().is_ok());
    }
}
