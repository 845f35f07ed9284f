// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh invariants, volume sign and consolidation behavior

use approx::assert_relative_eq;
use meshcore::geometry::{analyze, ArrayDescriptor, ArrayId, Mesh, Primitive, Triangle};
use meshcore::{consolidate, GeometryError, KernelConfig};
use nalgebra::{Point3, Vector3};

fn primitives() -> Vec<Mesh> {
    vec![
        Primitive::cube(Vector3::new(1.0, 2.0, 3.0), true).to_mesh(),
        Primitive::quad(2.0).to_mesh(),
        Primitive::grid(5, 3.0).to_mesh(),
        Primitive::sphere(1.5, 12).to_mesh(),
    ]
}

#[test]
fn test_primitives_hold_array_invariant() {
    for mesh in primitives() {
        assert!(mesh.validate().is_ok());
        for descriptor in mesh.array_descriptors() {
            if descriptor.id.is_per_vertex() {
                assert_eq!(descriptor.count, mesh.vertex_count());
            }
        }
        for triangle in &mesh.triangles {
            assert!(triangle.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        }
    }
}

#[test]
fn test_out_of_range_index_is_reported() {
    let mut mesh = Mesh::with_arrays(
        3,
        &[
            ArrayDescriptor::new(ArrayId::Position, 3),
            ArrayDescriptor::new(ArrayId::Triangle, 1),
        ],
    );
    mesh.triangles[0] = Triangle::new([0, 1, 3]);
    assert_eq!(
        mesh.validate(),
        Err(GeometryError::IndexOutOfRange {
            triangle: 0,
            index: 3,
            vertex_count: 3,
        })
    );
}

#[test]
fn test_merge_keeps_invariant() {
    let mut mesh = Primitive::cube(Vector3::repeat(1.0), false).to_mesh();
    let mut other = Primitive::grid(2, 1.0).to_mesh();
    other.normals.clear();
    mesh.merge(&other);
    assert!(mesh.validate().is_ok());
    assert_eq!(mesh.normals.len(), mesh.vertex_count());
}

#[test]
fn test_volume_sign_follows_winding() {
    let mut cube = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
    assert_relative_eq!(cube.calculate_volume(), 8.0, epsilon = 1e-5);

    cube.invert_mesh();
    assert_relative_eq!(cube.calculate_volume(), -8.0, epsilon = 1e-5);
}

#[test]
fn test_volume_is_translation_invariant() {
    let mut cube = Primitive::cube(Vector3::new(1.0, 2.0, 3.0), false).to_mesh();
    cube.translate_mesh(&Vector3::new(10.0, -4.0, 7.5));
    assert_relative_eq!(cube.calculate_volume(), 6.0, epsilon = 1e-3);
}

#[test]
fn test_unify_is_idempotent() {
    for mesh in primitives() {
        let once = Mesh::unify_mesh(&mesh);
        let twice = Mesh::unify_mesh(&once);
        assert_eq!(once.vertex_count(), twice.vertex_count());
        assert_eq!(once.triangle_count(), twice.triangle_count());
    }
}

#[test]
fn test_consolidated_sphere_keeps_its_volume() {
    let sphere = Primitive::sphere(1.0, 16).to_mesh();
    let merged = consolidate(&sphere, &KernelConfig::default());
    assert!(merged.vertex_count() <= sphere.vertex_count());
    assert_relative_eq!(merged.calculate_volume(), sphere.calculate_volume(), epsilon = 1e-4);
}

#[test]
fn test_weld_joins_coincident_quads_of_different_surfaces() {
    let epsilon = 1e-4;
    let mut mesh = Primitive::quad(1.0).to_mesh();
    let mut other = Primitive::quad(1.0).to_mesh();
    other.surface_indices.iter_mut().for_each(|s| *s = 1);
    other.translate_mesh(&Vector3::new(0.0, 0.0, epsilon * 0.5));
    mesh.merge(&other);

    mesh.weld_mesh(epsilon);

    let half = mesh.vertex_count() / 2;
    for v in 0..half {
        assert_eq!(mesh.positions[v], mesh.positions[v + half]);
    }
}

#[test]
fn test_weld_leaves_one_surface_alone() {
    let mut mesh = Primitive::quad(1.0).to_mesh();
    let mut other = Primitive::quad(1.0).to_mesh();
    other.translate_mesh(&Vector3::new(0.0, 0.0, 1e-5));
    mesh.merge(&other);
    let before = mesh.positions.clone();

    mesh.weld_mesh(1e-4);
    assert_eq!(mesh.positions, before);
}

#[test]
fn test_analyze_closed_cube() {
    let cube = Primitive::cube(Vector3::repeat(1.0), true).to_mesh();
    let merged = consolidate(&cube, &KernelConfig::default());
    let stats = analyze(&merged);
    assert_relative_eq!(stats.volume, 1.0, epsilon = 1e-5);
    assert_relative_eq!(stats.surface_area, 6.0, epsilon = 1e-4);
    assert!(stats.is_manifold);
    assert_eq!(stats.bbox[3], 0.5);
    assert_eq!(merged.bounding_box().min, Point3::new(-0.5, -0.5, -0.5));
}
