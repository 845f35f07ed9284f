// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mutable octree over mesh triangles

use super::compact::CompactOctree;
use crate::error::Result;
use crate::geometry::{BoundingBox, Mesh};
use nalgebra::{Point3, Vector3};

/// Default maximum subdivision depth
pub const DEFAULT_MAX_DEPTH: u8 = 12;

/// Octree node, addressed by its index in [`Octree::nodes`]
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub center: Point3<f32>,
    pub half_extents: Vector3<f32>,
    /// Child node index per octant
    pub children: [Option<u32>; 8],
    /// Triangles whose vertices do not all fall in one child octant
    pub triangles: Vec<u32>,
    pub depth: u8,
}

impl OctreeNode {
    fn new(center: Point3<f32>, half_extents: Vector3<f32>, depth: u8) -> Self {
        Self {
            center,
            half_extents,
            children: [None; 8],
            triangles: Vec::new(),
            depth,
        }
    }

    /// Cell box of this node
    pub fn cell_bounds(&self) -> BoundingBox {
        BoundingBox::from_center(self.center, self.half_extents)
    }

    /// Octant of a point: bit 0 for +x, bit 1 for +y, bit 2 for +z
    pub fn octant(&self, point: &Point3<f32>) -> usize {
        (point.x >= self.center.x) as usize
            | ((point.y >= self.center.y) as usize) << 1
            | ((point.z >= self.center.z) as usize) << 2
    }

    fn child_cell(&self, octant: usize) -> (Point3<f32>, Vector3<f32>) {
        let half = self.half_extents * 0.5;
        let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
        let center = self.center + Vector3::new(sign(1) * half.x, sign(2) * half.y, sign(4) * half.z);
        (center, half)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Octree built once over a mesh, then compressed for queries.
///
/// Each triangle is stored in exactly one node: the deepest node in whose
/// cell all three vertices share an octant, capped at the maximum depth.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    triangle_bounds: Vec<BoundingBox>,
    max_depth: u8,
}

impl Octree {
    /// Build with the default maximum depth
    pub fn build(mesh: &Mesh, bounds: &BoundingBox) -> Self {
        Self::build_with_depth(mesh, bounds, DEFAULT_MAX_DEPTH)
    }

    pub fn build_with_depth(mesh: &Mesh, bounds: &BoundingBox, max_depth: u8) -> Self {
        let mut octree = Self {
            nodes: vec![OctreeNode::new(bounds.center(), bounds.half_extents(), 0)],
            triangle_bounds: Vec::with_capacity(mesh.triangle_count()),
            max_depth,
        };

        for (t, triangle) in mesh.triangles.iter().enumerate() {
            let vertices = mesh.triangle_positions(triangle);
            octree.triangle_bounds.push(BoundingBox::from_points(&vertices));
            octree.insert(t as u32, &vertices);
        }

        log::debug!(
            "octree: {} triangles in {} nodes (max depth {})",
            mesh.triangle_count(),
            octree.nodes.len(),
            max_depth
        );
        octree
    }

    fn insert(&mut self, triangle: u32, vertices: &[Point3<f32>; 3]) {
        let mut current = 0usize;
        loop {
            let node = &self.nodes[current];
            if node.depth >= self.max_depth {
                break;
            }
            let octant = node.octant(&vertices[0]);
            if vertices[1..].iter().any(|v| node.octant(v) != octant) {
                break;
            }
            current = match node.children[octant] {
                Some(child) => child as usize,
                None => {
                    let (center, half) = node.child_cell(octant);
                    let depth = node.depth + 1;
                    let child = self.nodes.len();
                    self.nodes.push(OctreeNode::new(center, half, depth));
                    self.nodes[current].children[octant] = Some(child as u32);
                    child
                }
            };
        }
        self.nodes[current].triangles.push(triangle);
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: u32) -> &OctreeNode {
        &self.nodes[index as usize]
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Bounds of the vertices of one indexed triangle
    pub fn triangle_bounds(&self, triangle: u32) -> &BoundingBox {
        &self.triangle_bounds[triangle as usize]
    }

    /// Node index holding a triangle
    pub fn locate(&self, triangle: u32) -> Option<u32> {
        self.nodes
            .iter()
            .position(|node| node.triangles.contains(&triangle))
            .map(|i| i as u32)
    }

    /// Serialize into the immutable compact form.
    ///
    /// Fails when a triangle index, a node's triangle count or a child
    /// offset exceeds the 16-bit fields of the compact format.
    pub fn compress(&self) -> Result<CompactOctree> {
        CompactOctree::from_octree(self)
    }
}
