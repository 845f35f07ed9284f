// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Spatial index round trip and collision queries

use approx::assert_relative_eq;
use meshcore::collision::HitFeature;
use meshcore::geometry::{ArrayDescriptor, ArrayId, BoundingBox, Mesh, Primitive, Triangle};
use meshcore::{CollisionShape, CompactOctree, Octree, SegmentQuery};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn triangle_soup(positions: Vec<Point3<f32>>) -> Mesh {
    let triangle_count = positions.len() / 3;
    let mut mesh = Mesh::with_arrays(
        positions.len(),
        &[
            ArrayDescriptor::new(ArrayId::Position, positions.len()),
            ArrayDescriptor::new(ArrayId::Triangle, triangle_count),
        ],
    );
    mesh.positions = positions;
    for (t, triangle) in mesh.triangles.iter_mut().enumerate() {
        let base = (t * 3) as u32;
        *triangle = Triangle::new([base, base + 1, base + 2]);
    }
    mesh
}

#[test]
fn test_compressed_index_locates_each_triangle_once() {
    let mut rng = StdRng::seed_from_u64(0x0c7a);
    let bounds = BoundingBox::new(Point3::origin(), Point3::new(10.0, 10.0, 10.0));

    let mut positions: Vec<Point3<f32>> = Vec::new();
    for _ in 0..500 {
        let anchor = Point3::new(rng.gen_range(0.0..9.0), rng.gen_range(0.0..9.0), rng.gen_range(0.0..9.0));
        for _ in 0..3 {
            let offset = Vector3::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
            positions.push(anchor + offset);
        }
    }
    let mesh = triangle_soup(positions);

    let compact = Octree::build(&mesh, &bounds).compress().expect("index fits the compact format");
    let reloaded = CompactOctree::from_bytes(compact.as_bytes().to_vec()).expect("valid buffer");

    for (t, triangle) in mesh.triangles.iter().enumerate() {
        let [a, b, c] = mesh.triangle_positions(triangle);
        let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
        let holders = reloaded
            .nodes_containing_point(&centroid)
            .into_iter()
            .filter(|node| node.triangles().any(|i| i as usize == t))
            .count();
        assert_eq!(holders, 1, "triangle {} found in {} nodes", t, holders);
    }
}

#[test]
fn test_ray_down_through_centroid_hits_plane() {
    let mesh = triangle_soup(vec![
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ]);
    let shape = CollisionShape::from_mesh(&mesh).expect("single triangle fits");

    let centroid = Point3::new(1.0 / 3.0, 1.0 / 3.0, 1.0);
    let query = SegmentQuery::ray(centroid + Vector3::new(0.0, 0.0, 3.0), centroid - Vector3::new(0.0, 0.0, 1.0));
    let hit = shape.query(&query).expect("ray crosses the triangle");

    assert_relative_eq!(hit.t, 0.75, epsilon = 1e-5);
    assert_relative_eq!(hit.normal, Vector3::z(), epsilon = 1e-5);
    assert_relative_eq!(hit.position, centroid, epsilon = 1e-5);
    assert_eq!(hit.triangle, 0);
    assert_eq!(hit.feature, HitFeature::Face);
}

#[test]
fn test_ray_stopping_short_misses() {
    let mesh = Primitive::quad(1.0).to_mesh();
    let shape = CollisionShape::from_mesh(&mesh).expect("quad fits");
    let query = SegmentQuery::ray(Point3::new(0.5, 0.5, 2.0), Point3::new(0.5, 0.5, 0.5));
    assert!(shape.query(&query).is_none());
}

#[test]
fn test_zero_length_query_never_hits() {
    let mesh = Primitive::quad(1.0).to_mesh();
    let shape = CollisionShape::from_mesh(&mesh).expect("quad fits");
    let point = Point3::new(0.5, 0.5, 0.0);
    assert!(shape.query(&SegmentQuery::sphere(point, point, 0.25)).is_none());
}

#[test]
fn test_sphere_sweep_stops_a_radius_early() {
    let mesh = Primitive::grid(4, 4.0).to_mesh();
    let shape = CollisionShape::from_mesh(&mesh).expect("grid fits");
    let query = SegmentQuery::sphere(Point3::new(2.1, 1.9, 2.0), Point3::new(2.1, 1.9, -2.0), 0.5);
    let hit = shape.query(&query).expect("sphere lands on the grid");

    // center stops at z = 0.5 on its way from 2 to -2
    assert_relative_eq!(hit.t, 0.375, epsilon = 1e-4);
    assert_relative_eq!(hit.position.z, 0.0, epsilon = 1e-5);
    assert!(hit.normal.dot(&Vector3::z()) > 0.99);
}

#[test]
fn test_sphere_grazing_edge_reports_edge() {
    let mesh = Primitive::quad(1.0).to_mesh();
    let shape = CollisionShape::from_mesh(&mesh).expect("quad fits");
    // passes beside the x = 1 edge, closer than the radius
    let query = SegmentQuery::sphere(Point3::new(1.2, 0.5, 1.0), Point3::new(1.2, 0.5, -1.0), 0.25);
    let hit = shape.query(&query).expect("sphere clips the edge");
    assert_eq!(hit.feature, HitFeature::Edge);
    assert_relative_eq!(hit.position.x, 1.0, epsilon = 1e-5);
}

#[test]
fn test_batch_queries_agree_with_single_queries() {
    let mesh = Primitive::sphere(1.0, 12).to_mesh();
    let shape = CollisionShape::from_mesh(&mesh).expect("sphere fits");
    let mut rng = StdRng::seed_from_u64(7);
    let queries: Vec<SegmentQuery> = (0..64)
        .map(|_| {
            let x = rng.gen_range(-1.5..1.5);
            let z = rng.gen_range(-1.5..1.5);
            SegmentQuery::ray(Point3::new(x, 3.0, z), Point3::new(x, -3.0, z))
        })
        .collect();

    let batch = shape.query_batch(&queries);
    for (query, hit) in queries.iter().zip(&batch) {
        assert_eq!(shape.query(query), *hit);
    }
}
