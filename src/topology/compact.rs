// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Dense renumbering of what survives simplification

use super::TopologyGraph;
use crate::geometry::{Mesh, Triangle};

/// Old to new vertex numbering plus the surviving triangles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactResult {
    /// New index per old vertex; `None` for removed vertices
    pub remap: Vec<Option<u32>>,
    pub vertex_count: usize,
    /// Live faces followed by the protected triangles, in new indices
    pub triangles: Vec<Triangle>,
}

impl CompactResult {
    /// Old indices of the kept vertices, in new order
    pub fn kept_vertices(&self) -> Vec<u32> {
        let mut kept = vec![0u32; self.vertex_count];
        for (old, new) in self.remap.iter().enumerate() {
            if let Some(new) = new {
                kept[*new as usize] = old as u32;
            }
        }
        kept
    }

    /// Shrink auxiliary per-vertex data the same way as the mesh
    pub fn gather<T: Clone>(&self, data: &[T]) -> Vec<T> {
        self.kept_vertices()
            .iter()
            .map(|&old| data[old as usize].clone())
            .collect()
    }

    /// Smaller copy of the mesh the graph was built from.
    ///
    /// The segment table is not carried over; rebuild it with
    /// [`Mesh::build_segment_array`].
    pub fn rebuild(&self, mesh: &Mesh) -> Mesh {
        mesh.remap_vertices(&self.kept_vertices(), self.triangles.clone())
    }
}

impl TopologyGraph {
    /// Number the referenced vertices densely in their original order
    pub fn compact_mesh(&self) -> CompactResult {
        let mut remap = vec![None; self.vertices.len()];
        let mut vertex_count = 0usize;
        for v in 0..self.vertices.len() as u32 {
            if self.is_referenced(v) {
                remap[v as usize] = Some(vertex_count as u32);
                vertex_count += 1;
            }
        }

        let renumber = |indices: [u32; 3]| -> Option<Triangle> {
            let mut out = [0u32; 3];
            for (slot, i) in out.iter_mut().zip(indices) {
                *slot = remap[i as usize]?;
            }
            Some(Triangle::new(out))
        };
        let triangles: Vec<Triangle> = self
            .faces
            .iter()
            .filter(|f| f.alive)
            .map(|f| f.vertices)
            .chain(self.protected.iter().map(|t| t.indices))
            .filter_map(renumber)
            .collect();

        CompactResult {
            remap,
            vertex_count,
            triangles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;

    #[test]
    fn test_untouched_graph_compacts_to_identity() {
        let mesh = Primitive::grid(2, 2.0).to_mesh();
        let compact = TopologyGraph::build(&mesh).compact_mesh();

        assert_eq!(compact.vertex_count, 9);
        assert_eq!(compact.triangles, mesh.triangles);
        assert_eq!(compact.rebuild(&mesh), mesh);
    }

    #[test]
    fn test_collapse_shrinks_mesh() {
        let mesh = Primitive::grid(2, 2.0).to_mesh();
        let mut graph = TopologyGraph::build(&mesh);
        graph.collapse(4, 0);
        let compact = graph.compact_mesh();

        assert_eq!(compact.remap[4], None);
        assert_eq!(compact.remap[5], Some(4));
        assert_eq!(compact.vertex_count, 8);
        assert_eq!(compact.triangles.len(), 6);

        let smaller = compact.rebuild(&mesh);
        assert!(smaller.validate().is_ok());
        assert_eq!(smaller.positions[4], mesh.positions[5]);
        assert_eq!(compact.gather(&mesh.texcoords0), smaller.texcoords0);
    }

    #[test]
    fn test_protected_tail_follows_faces() {
        let mesh = Primitive::grid(2, 2.0).to_mesh();
        let compact = TopologyGraph::build_partial(&mesh, 5).compact_mesh();
        assert_eq!(compact.triangles.len(), 8);
        assert_eq!(compact.triangles[5..], mesh.triangles[5..]);
    }
}
