// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Raw little-endian array blobs exchanged with the resource layer.
//!
//! Every blob holds the array's elements back to back in the layout given by
//! [`ArrayId::element_size`], zero-padded to a 16-byte boundary. Morph data
//! is stored target after target, each target holding position then normal
//! deltas per vertex.

use super::{ArrayId, BoneInfluence, Color, Mesh, Segment, Triangle};
use crate::error::{GeometryError, Result};
use nalgebra::{Point2, Point3, Vector3, Vector4};

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32_le(data, offset))
}

fn read_f32s<const N: usize>(data: &[u8], offset: usize) -> [f32; N] {
    std::array::from_fn(|i| read_f32_le(data, offset + i * 4))
}

fn write_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

impl Mesh {
    /// Serialize one array to its padded little-endian blob
    pub fn array_bytes(&self, id: ArrayId) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.array_len(id) * id.element_size() + 16);
        match id {
            ArrayId::Position => self.positions.iter().for_each(|p| write_f32s(&mut out, p.coords.as_slice())),
            ArrayId::Normal => self.normals.iter().for_each(|n| write_f32s(&mut out, n.as_slice())),
            ArrayId::Tangent => self.tangents.iter().for_each(|t| write_f32s(&mut out, t.as_slice())),
            ArrayId::Color => self.colors.iter().for_each(|c| out.extend_from_slice(&c.0)),
            ArrayId::Texcoord0 => self.texcoords0.iter().for_each(|t| write_f32s(&mut out, t.coords.as_slice())),
            ArrayId::Texcoord1 => self.texcoords1.iter().for_each(|t| write_f32s(&mut out, t.coords.as_slice())),
            ArrayId::SurfaceIndex => self.surface_indices.iter().for_each(|s| out.extend_from_slice(&s.to_le_bytes())),
            ArrayId::Skin => {
                for influence in &self.skin {
                    out.extend_from_slice(&influence.bone.to_le_bytes());
                    out.extend_from_slice(&[0, 0]);
                    out.extend_from_slice(&influence.weight.to_le_bytes());
                }
            }
            ArrayId::Morph => {
                for morph in &self.morphs {
                    for (position, normal) in morph.position_deltas.iter().zip(&morph.normal_deltas) {
                        write_f32s(&mut out, position.as_slice());
                        write_f32s(&mut out, normal.as_slice());
                    }
                }
            }
            ArrayId::Triangle => {
                for triangle in &self.triangles {
                    triangle.indices.iter().for_each(|i| out.extend_from_slice(&i.to_le_bytes()));
                }
            }
            ArrayId::Segment => {
                for segment in &self.segments {
                    for value in [segment.material_index, segment.triangle_start, segment.triangle_count] {
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
        }
        let padded = (out.len() + 15) & !15;
        out.resize(padded, 0);
        out
    }

    /// Populate an already allocated array from its blob.
    ///
    /// The element count comes from the current allocation (see
    /// [`Mesh::allocate_storage`]); the blob must hold at least that many
    /// elements, trailing padding is ignored.
    pub fn load_array_bytes(&mut self, id: ArrayId, bytes: &[u8]) -> Result<()> {
        let count = self.array_len(id);
        let size = id.element_size();
        let expected = count * size;
        if bytes.len() < expected {
            return Err(GeometryError::BlobSize {
                id,
                len: bytes.len(),
                expected,
            });
        }

        let at = |i: usize| i * size;
        match id {
            ArrayId::Position => {
                for (i, p) in self.positions.iter_mut().enumerate() {
                    *p = Point3::from(read_f32s::<3>(bytes, at(i)));
                }
            }
            ArrayId::Normal => {
                for (i, n) in self.normals.iter_mut().enumerate() {
                    *n = Vector3::from(read_f32s::<3>(bytes, at(i)));
                }
            }
            ArrayId::Tangent => {
                for (i, t) in self.tangents.iter_mut().enumerate() {
                    *t = Vector4::from(read_f32s::<4>(bytes, at(i)));
                }
            }
            ArrayId::Color => {
                for (i, c) in self.colors.iter_mut().enumerate() {
                    let o = at(i);
                    *c = Color([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
                }
            }
            ArrayId::Texcoord0 | ArrayId::Texcoord1 => {
                let set = if id == ArrayId::Texcoord0 { &mut self.texcoords0 } else { &mut self.texcoords1 };
                for (i, t) in set.iter_mut().enumerate() {
                    *t = Point2::from(read_f32s::<2>(bytes, at(i)));
                }
            }
            ArrayId::SurfaceIndex => {
                for (i, s) in self.surface_indices.iter_mut().enumerate() {
                    *s = read_u32_le(bytes, at(i));
                }
            }
            ArrayId::Skin => {
                for (i, influence) in self.skin.iter_mut().enumerate() {
                    *influence = BoneInfluence {
                        bone: read_u16_le(bytes, at(i)),
                        weight: read_f32_le(bytes, at(i) + 4),
                    };
                }
            }
            ArrayId::Morph => {
                let vertex_count = self.vertex_count;
                for (m, morph) in self.morphs.iter_mut().enumerate() {
                    for v in 0..vertex_count {
                        let o = at(m * vertex_count + v);
                        morph.position_deltas[v] = Vector3::from(read_f32s::<3>(bytes, o));
                        morph.normal_deltas[v] = Vector3::from(read_f32s::<3>(bytes, o + 12));
                    }
                }
            }
            ArrayId::Triangle => {
                for (i, triangle) in self.triangles.iter_mut().enumerate() {
                    let o = at(i);
                    *triangle = Triangle::new([0, 1, 2].map(|k| read_u32_le(bytes, o + k * 4)));
                }
            }
            ArrayId::Segment => {
                for (i, segment) in self.segments.iter_mut().enumerate() {
                    let o = at(i);
                    *segment = Segment {
                        material_index: read_u32_le(bytes, o),
                        triangle_start: read_u32_le(bytes, o + 4),
                        triangle_count: read_u32_le(bytes, o + 8),
                    };
                }
            }
        }
        Ok(())
    }
}
