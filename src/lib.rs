// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! meshcore geometry kernel
//!
//! Typed multi-array meshes, mesh consolidation, a compact octree index with
//! segment and swept-sphere queries, polygon booleans and edge-collapse
//! simplification.

pub mod boolean;
pub mod collision;
pub mod config;
pub mod error;
pub mod geometry;
pub mod spatial;
pub mod topology;

pub use boolean::{boolean, boolean_levels, BooleanOp, BooleanOperand, BooleanOptions, BooleanResult};
pub use collision::{CollisionHit, CollisionMask, CollisionShape, SegmentQuery};
pub use config::KernelConfig;
pub use error::{GeometryError, Result};
pub use geometry::{Mesh, Primitive};
pub use spatial::{CompactOctree, Octree};
pub use topology::TopologyGraph;

/// Weld, mend and unify a mesh with the configured tolerances
pub fn consolidate(mesh: &Mesh, config: &KernelConfig) -> Mesh {
    let mut work = mesh.clone();
    work.weld_mesh(config.weld.epsilon);
    work.mend_mesh(
        config.mend.vertex_epsilon,
        config.mend.normal_epsilon,
        config.mend.texcoord_epsilon,
    );
    Mesh::unify_mesh(&work)
}

/// Simplify a mesh with the configured collapse threshold
pub fn simplify(mesh: &Mesh, config: &KernelConfig) -> Mesh {
    let mut graph = TopologyGraph::build(mesh);
    if config.simplify.boundary_edges {
        graph.simplify_boundary_edges();
    }
    graph.optimize_mesh(config.simplify.collapse_threshold);
    if graph.collapse_count() == 0 {
        return mesh.clone();
    }
    let mut smaller = graph.compact_mesh().rebuild(mesh);
    if !mesh.segments.is_empty() {
        smaller.build_segment_array(&surface_materials(mesh));
    }
    smaller
}

/// Material per surface index, read back from the segment table
fn surface_materials(mesh: &Mesh) -> Vec<u32> {
    let mut materials = Vec::new();
    for segment in &mesh.segments {
        let start = segment.triangle_start as usize;
        let end = start + segment.triangle_count as usize;
        for triangle in mesh.triangles.get(start..end).unwrap_or_default() {
            let surface = mesh.surface_of(triangle.indices[0] as usize) as usize;
            if materials.len() <= surface {
                materials.resize(surface + 1, 0);
            }
            materials[surface] = segment.material_index;
        }
    }
    materials
}
