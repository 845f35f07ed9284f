// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Collision shape: compact index plus the triangle data it refers to

use super::sweep::{segment_triangle, sphere_sweep_triangle, TriangleHit};
use super::{CollisionHit, CollisionMask, SegmentQuery};
use crate::error::Result;
use crate::geometry::{BoundingBox, Mesh, Triangle};
use crate::spatial::{CompactNode, CompactOctree, Octree, DEFAULT_MAX_DEPTH};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

/// Immutable collision geometry.
///
/// Queries only read the shape, so one shape can serve any number of
/// concurrent queries. Rebuilding it while queries run is the owner's
/// responsibility to prevent.
#[derive(Debug, Clone)]
pub struct CollisionShape {
    index: CompactOctree,
    positions: Vec<Point3<f32>>,
    triangles: Vec<Triangle>,
    /// Per-triangle kind; empty means every triangle is solid
    kinds: Vec<CollisionMask>,
}

/// Running best result of one query
struct Search<'q> {
    query: &'q SegmentQuery,
    direction: Vector3<f32>,
    t_max: f32,
    best: Option<CollisionHit>,
}

impl CollisionShape {
    /// Index every triangle of a mesh as solid geometry
    pub fn from_mesh(mesh: &Mesh) -> Result<Self> {
        Self::build(mesh, &[], DEFAULT_MAX_DEPTH)
    }

    /// Index a mesh with per-surface collision kinds.
    ///
    /// A triangle takes the kind of its first vertex's surface; surfaces
    /// past the end of `surface_kinds` are solid.
    pub fn build(mesh: &Mesh, surface_kinds: &[CollisionMask], max_depth: u8) -> Result<Self> {
        let bounds = mesh.bounding_box();
        let bounds = if bounds.is_empty() {
            BoundingBox::from_center(Point3::origin(), Vector3::repeat(1.0))
        } else {
            bounds
        };
        let index = Octree::build_with_depth(mesh, &bounds, max_depth).compress()?;

        let kinds = if surface_kinds.is_empty() {
            Vec::new()
        } else {
            mesh.triangles
                .iter()
                .map(|t| {
                    let surface = mesh.surface_of(t.indices[0] as usize) as usize;
                    surface_kinds.get(surface).copied().unwrap_or_default()
                })
                .collect()
        };

        Ok(Self {
            index,
            positions: mesh.positions.clone(),
            triangles: mesh.triangles.clone(),
            kinds,
        })
    }

    /// Assemble a shape from an index loaded elsewhere
    pub fn from_parts(
        index: CompactOctree,
        positions: Vec<Point3<f32>>,
        triangles: Vec<Triangle>,
        kinds: Vec<CollisionMask>,
    ) -> Self {
        debug_assert!(kinds.is_empty() || kinds.len() == triangles.len());
        Self {
            index,
            positions,
            triangles,
            kinds,
        }
    }

    pub fn index(&self) -> &CompactOctree {
        &self.index
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn kind(&self, triangle: u32) -> CollisionMask {
        self.kinds
            .get(triangle as usize)
            .copied()
            .unwrap_or(CollisionMask::SOLID)
    }

    fn triangle_positions(&self, triangle: u32) -> [Point3<f32>; 3] {
        self.triangles[triangle as usize]
            .indices
            .map(|i| self.positions[i as usize])
    }

    /// Earliest contact along the query segment, if any
    pub fn query(&self, query: &SegmentQuery) -> Option<CollisionHit> {
        let direction = query.direction();
        if direction.norm_squared() <= f32::MIN_POSITIVE {
            return None;
        }
        let mut search = Search {
            query,
            direction,
            t_max: 1.0,
            best: None,
        };
        self.visit(self.index.root(), &mut search);
        search.best
    }

    /// Run independent queries in parallel against this shape
    pub fn query_batch(&self, queries: &[SegmentQuery]) -> Vec<Option<CollisionHit>> {
        queries.par_iter().map(|query| self.query(query)).collect()
    }

    fn visit(&self, node: CompactNode<'_>, search: &mut Search<'_>) {
        let bounds = node.bounds().inflated(search.query.radius);
        if !clip_segment(&search.query.start, &search.direction, &bounds, search.t_max) {
            return;
        }

        for triangle in node.triangles() {
            if !self.kind(triangle).intersects(search.query.mask) {
                continue;
            }
            let vertices = self.triangle_positions(triangle);
            let hit = if search.query.radius > 0.0 {
                sphere_sweep_triangle(&search.query.start, &search.query.end, search.query.radius, &vertices)
            } else {
                segment_triangle(&search.query.start, &search.query.end, &vertices)
            };
            if let Some(TriangleHit {
                t,
                position,
                normal,
                feature,
            }) = hit
            {
                if search.best.is_none() || t < search.t_max {
                    search.t_max = t;
                    search.best = Some(CollisionHit {
                        position,
                        normal,
                        triangle,
                        t,
                        feature,
                    });
                }
            }
        }

        for child in node.children() {
            self.visit(child, search);
        }
    }
}

/// Slab test of `start + t * direction`, `t` in `[0, t_max]`, against a box
fn clip_segment(start: &Point3<f32>, direction: &Vector3<f32>, bounds: &BoundingBox, t_max: f32) -> bool {
    let mut near = 0.0f32;
    let mut far = t_max;
    for axis in 0..3 {
        let origin = start[axis];
        let delta = direction[axis];
        if delta.abs() <= f32::MIN_POSITIVE {
            if origin < bounds.min[axis] || origin > bounds.max[axis] {
                return false;
            }
            continue;
        }
        let inv = 1.0 / delta;
        let mut t0 = (bounds.min[axis] - origin) * inv;
        let mut t1 = (bounds.max[axis] - origin) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        near = near.max(t0);
        far = far.min(t1);
        if near > far {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_shape_is_shareable() {
        assert_send_sync::<CollisionShape>();
        assert_send_sync::<CompactOctree>();
    }

    #[test]
    fn test_clip_segment() {
        let bounds = BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let start = Point3::new(-1.0, 0.5, 0.5);
        assert!(clip_segment(&start, &Vector3::new(2.0, 0.0, 0.0), &bounds, 1.0));
        // shortened search no longer reaches the box
        assert!(!clip_segment(&start, &Vector3::new(2.0, 0.0, 0.0), &bounds, 0.4));
        assert!(!clip_segment(&start, &Vector3::new(0.0, 2.0, 0.0), &bounds, 1.0));
    }

    #[test]
    fn test_earliest_hit_wins() {
        let mut mesh = Primitive::grid(4, 4.0).to_mesh();
        let mut upper = Primitive::grid(4, 4.0).to_mesh();
        upper.translate_mesh(&Vector3::new(0.0, 0.0, 1.0));
        mesh.merge(&upper);
        let shape = CollisionShape::from_mesh(&mesh).expect("small mesh");

        let hit = shape
            .query(&SegmentQuery::ray(Point3::new(1.3, 2.1, 5.0), Point3::new(1.3, 2.1, -5.0)))
            .expect("ray crosses both grids");
        assert_relative_eq!(hit.t, 0.4, epsilon = 1e-5);
        assert!(hit.triangle as usize >= 32);
    }

    #[test]
    fn test_mask_filters_kinds() {
        let mut mesh = Primitive::quad(1.0).to_mesh();
        let mut water = Primitive::quad(1.0).to_mesh();
        water.translate_mesh(&Vector3::new(0.0, 0.0, 1.0));
        water.surface_indices.fill(1);
        mesh.merge(&water);
        let shape = CollisionShape::build(
            &mesh,
            &[CollisionMask::SOLID, CollisionMask::WATER],
            DEFAULT_MAX_DEPTH,
        )
        .expect("small mesh");

        let ray = SegmentQuery::ray(Point3::new(0.5, 0.4, 3.0), Point3::new(0.5, 0.4, -1.0));
        let any = shape.query(&ray).expect("hits water first");
        assert!(any.triangle >= 2);
        let solid = shape
            .query(&ray.with_mask(CollisionMask::SOLID))
            .expect("hits the floor");
        assert!(solid.triangle < 2);
        assert_relative_eq!(solid.t, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_batch_matches_serial() {
        let mesh = Primitive::sphere(2.0, 16).to_mesh();
        let shape = CollisionShape::from_mesh(&mesh).expect("small mesh");
        let queries: Vec<SegmentQuery> = (0..32)
            .map(|i| {
                let angle = i as f32 * 0.2;
                let start = Point3::new(5.0 * angle.cos(), 0.3, 5.0 * angle.sin());
                SegmentQuery::sphere(start, Point3::origin(), 0.25)
            })
            .collect();

        let batch = shape.query_batch(&queries);
        for (query, hit) in queries.iter().zip(&batch) {
            assert_eq!(*hit, shape.query(query));
            assert!(hit.is_some());
        }
    }
}
