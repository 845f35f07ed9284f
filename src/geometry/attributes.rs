// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Derived vertex attributes: smooth normals and tangent frames

use super::mesh::unit_or_z;
use super::Mesh;
use ahash::AHashMap;
use nalgebra::{Vector3, Vector4};

/// cos(45°): contributions further apart than this start a new tangent group
const TANGENT_MERGE_COS: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Accumulated tangent contributions that agree in handedness and direction
#[derive(Debug, Clone)]
struct TangentGroup {
    tangent: Vector3<f32>,
    bitangent: Vector3<f32>,
    right_handed: bool,
    /// Unit tangent of every contribution, all within 45° of the average
    members: Vec<Vector3<f32>>,
}

impl Mesh {
    /// Allocate the normal array if needed and fill it with smooth normals
    pub fn build_normal_array(&mut self) {
        self.normals = self.calculate_normal_array();
    }

    /// Area-weighted vertex normals.
    ///
    /// Vertices of the same surface at bit-identical positions share one
    /// accumulated normal, so split seams shade smoothly.
    pub fn calculate_normal_array(&self) -> Vec<Vector3<f32>> {
        let mut sums: AHashMap<(u32, [u32; 3]), Vector3<f32>> = AHashMap::new();
        let key = |v: usize| {
            let p = self.positions[v];
            (self.surface_of(v), [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits))
        };

        for triangle in &self.triangles {
            let [a, b, c] = self.triangle_positions(triangle);
            // unnormalized cross product is twice the area times the normal
            let weighted = (b - a).cross(&(c - a));
            for &i in &triangle.indices {
                *sums.entry(key(i as usize)).or_insert_with(Vector3::zeros) += weighted;
            }
        }

        (0..self.vertex_count)
            .map(|v| unit_or_z(sums.get(&key(v)).copied().unwrap_or_else(Vector3::zeros)))
            .collect()
    }

    /// Build normals when absent, then fill the tangent array
    pub fn build_tangent_array(&mut self) {
        if self.normals.is_empty() {
            self.build_normal_array();
        }
        self.tangents = self.calculate_tangent_array();
    }

    /// Per-vertex tangents with handedness in `w`.
    ///
    /// Each triangle contributes a tangent and bitangent from its UV
    /// gradients, or an arbitrary basis around the face normal when the UV
    /// mapping is degenerate. Per vertex, contributions are grouped when they
    /// share handedness and every member stays within 45° of the group
    /// average; the largest group wins and is orthogonalized against the
    /// vertex normal.
    pub fn calculate_tangent_array(&self) -> Vec<Vector4<f32>> {
        let normal_of = |v: usize| self.normals.get(v).copied().unwrap_or_else(Vector3::z);
        let mut groups: Vec<Vec<TangentGroup>> = vec![Vec::new(); self.vertex_count];

        for triangle in &self.triangles {
            let [p0, p1, p2] = self.triangle_positions(triangle);
            let edge1 = p1 - p0;
            let edge2 = p2 - p0;
            let face_normal = unit_or_z(edge1.cross(&edge2));

            let (tangent, bitangent) = match self.uv_gradients(triangle.indices, edge1, edge2) {
                Some(frame) => frame,
                None => {
                    let tangent = orthogonal_to(&face_normal);
                    (tangent, face_normal.cross(&tangent))
                }
            };

            for &i in &triangle.indices {
                let v = i as usize;
                let right_handed = normal_of(v).cross(&tangent).dot(&bitangent) >= 0.0;
                add_contribution(&mut groups[v], tangent, bitangent, right_handed);
            }
        }

        groups
            .iter()
            .enumerate()
            .map(|(v, vertex_groups)| {
                let normal = normal_of(v);
                let chosen = vertex_groups.iter().max_by_key(|g| g.members.len());
                let (tangent, bitangent) = match chosen {
                    Some(group) => (group.tangent, group.bitangent),
                    None => {
                        let tangent = orthogonal_to(&normal);
                        (tangent, normal.cross(&tangent))
                    }
                };

                // Gram-Schmidt against the normal
                let projected = tangent - normal * normal.dot(&tangent);
                let tangent = projected
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(|| orthogonal_to(&normal));
                let w = if normal.cross(&tangent).dot(&bitangent) >= 0.0 { 1.0 } else { -1.0 };
                Vector4::new(tangent.x, tangent.y, tangent.z, w)
            })
            .collect()
    }

    /// Tangent and bitangent from texcoord0 deltas, `None` when the UV
    /// Jacobian is degenerate or the mesh has no texcoords
    fn uv_gradients(
        &self,
        indices: [u32; 3],
        edge1: Vector3<f32>,
        edge2: Vector3<f32>,
    ) -> Option<(Vector3<f32>, Vector3<f32>)> {
        if self.texcoords0.is_empty() {
            return None;
        }
        let [t0, t1, t2] = indices.map(|i| self.texcoords0[i as usize]);
        let duv1 = t1 - t0;
        let duv2 = t2 - t0;
        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let r = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;
        Some((tangent.try_normalize(f32::MIN_POSITIVE)?, bitangent.try_normalize(f32::MIN_POSITIVE)?))
    }
}

fn add_contribution(
    groups: &mut Vec<TangentGroup>,
    tangent: Vector3<f32>,
    bitangent: Vector3<f32>,
    right_handed: bool,
) {
    for group in groups.iter_mut() {
        if group.right_handed != right_handed {
            continue;
        }
        let Some(average) = (group.tangent + tangent).try_normalize(f32::EPSILON) else {
            continue;
        };
        let agrees = |member: &Vector3<f32>| average.dot(member) > TANGENT_MERGE_COS;
        if agrees(&tangent) && group.members.iter().all(agrees) {
            group.tangent += tangent;
            group.bitangent += bitangent;
            group.members.push(tangent);
            return;
        }
    }
    groups.push(TangentGroup {
        tangent,
        bitangent,
        right_handed,
        members: vec![tangent],
    });
}

/// Any unit vector perpendicular to `normal`
fn orthogonal_to(normal: &Vector3<f32>) -> Vector3<f32> {
    let axis = if normal.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    unit_or_z(axis - normal * normal.dot(&axis))
}
