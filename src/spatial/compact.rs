// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Immutable, pointer-free octree encoding.
//!
//! Nodes are laid out depth-first in one little-endian byte buffer:
//!
//! | offset | size | field                                            |
//! |--------|------|--------------------------------------------------|
//! | 0      | 12   | bounds min, 3 x f32                              |
//! | 12     | 12   | bounds max, 3 x f32                              |
//! | 24     | 16   | child offsets, 8 x u16 in 8-byte units, 0 = none |
//! | 40     | 2    | triangle count, u16                              |
//! | 42     | 1    | child mask, bit per octant                       |
//! | 43     | 1    | depth                                            |
//! | 44     | 2n   | triangle indices, u16                            |
//!
//! Each node is zero-padded to a multiple of 8 bytes. Child offsets are
//! relative to the start of the parent node. Node bounds cover the node's
//! cell and every triangle stored in its subtree.

use super::octree::Octree;
use crate::error::{GeometryError, Result};
use crate::geometry::BoundingBox;
use ahash::AHashSet;
use nalgebra::Point3;

pub const NODE_HEADER_SIZE: usize = 44;
pub const NODE_ALIGNMENT: usize = 8;

const CHILD_OFFSETS: usize = 24;
const TRIANGLE_COUNT: usize = 40;
const CHILD_MASK: usize = 42;
const DEPTH: usize = 43;

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn write_point(data: &mut [u8], offset: usize, point: &Point3<f32>) {
    for axis in 0..3 {
        let at = offset + axis * 4;
        data[at..at + 4].copy_from_slice(&point[axis].to_le_bytes());
    }
}

/// Read-only compact octree, safe to share across query threads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactOctree {
    bytes: Vec<u8>,
}

impl CompactOctree {
    pub(crate) fn from_octree(octree: &Octree) -> Result<Self> {
        let mut bytes = Vec::new();
        write_node(octree, 0, &mut bytes)?;
        log::debug!(
            "compressed octree: {} nodes into {} bytes",
            octree.node_count(),
            bytes.len()
        );
        Ok(Self { bytes })
    }

    /// Load a buffer produced by [`CompactOctree::as_bytes`], checking that
    /// every node header, index list and child offset stays in bounds.
    ///
    /// Children must start after their parent's index list and every node
    /// must have exactly one parent, so a walk over the tree visits each
    /// node offset at most once.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut visited: AHashSet<usize> = AHashSet::new();
        let mut stack = vec![0usize];
        while let Some(start) = stack.pop() {
            if !visited.insert(start) {
                return Err(GeometryError::MalformedIndex(format!(
                    "node at byte {start} is the child of more than one node"
                )));
            }
            if start % NODE_ALIGNMENT != 0 {
                return Err(GeometryError::MalformedIndex(format!(
                    "node at byte {start} is not 8-byte aligned"
                )));
            }
            if start + NODE_HEADER_SIZE > bytes.len() {
                return Err(GeometryError::MalformedIndex(format!(
                    "node header at byte {start} runs past the end of the buffer"
                )));
            }
            let count = read_u16_le(&bytes, start + TRIANGLE_COUNT) as usize;
            let end = start + NODE_HEADER_SIZE + count * 2;
            if end > bytes.len() {
                return Err(GeometryError::MalformedIndex(format!(
                    "triangle list of node at byte {start} runs past the end of the buffer"
                )));
            }
            let mask = bytes[start + CHILD_MASK];
            let mut previous = 0usize;
            for octant in 0..8 {
                let offset = read_u16_le(&bytes, start + CHILD_OFFSETS + octant * 2) as usize;
                let present = mask & (1 << octant) != 0;
                if present != (offset != 0) {
                    return Err(GeometryError::MalformedIndex(format!(
                        "child mask of node at byte {start} disagrees with octant {octant}"
                    )));
                }
                if !present {
                    continue;
                }
                let child = start + offset * NODE_ALIGNMENT;
                // siblings follow each other in octant order after the parent
                if child < end || child <= previous {
                    return Err(GeometryError::MalformedIndex(format!(
                        "octant {octant} of node at byte {start} points back to byte {child}"
                    )));
                }
                previous = child;
                stack.push(child);
            }
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn root(&self) -> CompactNode<'_> {
        CompactNode {
            bytes: &self.bytes,
            start: 0,
        }
    }

    /// Depth-first list of every node
    pub fn nodes(&self) -> Vec<CompactNode<'_>> {
        let mut nodes = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            stack.extend(node.children());
            nodes.push(node);
        }
        nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Every node whose bounds contain the point
    pub fn nodes_containing_point(&self, point: &Point3<f32>) -> Vec<CompactNode<'_>> {
        let mut found = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if !node.bounds().contains_point(point) {
                continue;
            }
            stack.extend(node.children());
            found.push(node);
        }
        found
    }
}

/// View of one node inside a [`CompactOctree`]
#[derive(Debug, Clone, Copy)]
pub struct CompactNode<'a> {
    bytes: &'a [u8],
    start: usize,
}

impl<'a> CompactNode<'a> {
    /// Byte offset of the node inside the buffer
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn bounds(&self) -> BoundingBox {
        let at = |i: usize| read_f32_le(self.bytes, self.start + i * 4);
        BoundingBox::new(Point3::new(at(0), at(1), at(2)), Point3::new(at(3), at(4), at(5)))
    }

    pub fn depth(&self) -> u8 {
        self.bytes[self.start + DEPTH]
    }

    pub fn child_mask(&self) -> u8 {
        self.bytes[self.start + CHILD_MASK]
    }

    pub fn triangle_count(&self) -> usize {
        read_u16_le(self.bytes, self.start + TRIANGLE_COUNT) as usize
    }

    pub fn triangles(&self) -> impl Iterator<Item = u32> + 'a {
        let bytes = self.bytes;
        let first = self.start + NODE_HEADER_SIZE;
        (0..self.triangle_count()).map(move |i| read_u16_le(bytes, first + i * 2) as u32)
    }

    pub fn child(&self, octant: usize) -> Option<CompactNode<'a>> {
        let offset = read_u16_le(self.bytes, self.start + CHILD_OFFSETS + octant * 2) as usize;
        (offset != 0).then(|| CompactNode {
            bytes: self.bytes,
            start: self.start + offset * NODE_ALIGNMENT,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = CompactNode<'a>> + 'a {
        let node = *self;
        (0..8).filter_map(move |octant| node.child(octant))
    }
}

/// Write a node and its subtree, returning the subtree bounds
fn write_node(octree: &Octree, index: u32, bytes: &mut Vec<u8>) -> Result<BoundingBox> {
    let node = octree.node(index);
    let start = bytes.len();

    if node.triangles.len() > u16::MAX as usize {
        log::warn!(
            "octree node at depth {} holds {} triangles, too many for a compact node",
            node.depth,
            node.triangles.len()
        );
        return Err(GeometryError::NodeTriangleOverflow {
            count: node.triangles.len(),
        });
    }

    let mut bounds = node.cell_bounds();
    bytes.resize(start + NODE_HEADER_SIZE, 0);
    for &triangle in &node.triangles {
        let Ok(compact) = u16::try_from(triangle) else {
            log::warn!("triangle {} does not fit a 16-bit compact index", triangle);
            return Err(GeometryError::TriangleIndexOverflow {
                index: triangle as usize,
            });
        };
        bytes.extend_from_slice(&compact.to_le_bytes());
        bounds = bounds.union(octree.triangle_bounds(triangle));
    }
    let padded = (bytes.len() + NODE_ALIGNMENT - 1) & !(NODE_ALIGNMENT - 1);
    bytes.resize(padded, 0);

    let mut mask = 0u8;
    for (octant, child) in node.children.iter().enumerate() {
        let Some(child) = *child else { continue };
        let relative = bytes.len() - start;
        let units = relative / NODE_ALIGNMENT;
        if units > u16::MAX as usize {
            log::warn!(
                "child {} of octree node at depth {} lies {} bytes away, beyond the 16-bit offset range",
                octant,
                node.depth,
                relative
            );
            return Err(GeometryError::ChildOffsetOverflow { offset: relative });
        }
        let child_bounds = write_node(octree, child, bytes)?;
        bounds = bounds.union(&child_bounds);

        let at = start + CHILD_OFFSETS + octant * 2;
        bytes[at..at + 2].copy_from_slice(&(units as u16).to_le_bytes());
        mask |= 1 << octant;
    }

    write_point(bytes, start, &bounds.min);
    write_point(bytes, start + 12, &bounds.max);
    bytes[start + TRIANGLE_COUNT..start + TRIANGLE_COUNT + 2]
        .copy_from_slice(&(node.triangles.len() as u16).to_le_bytes());
    bytes[start + CHILD_MASK] = mask;
    bytes[start + DEPTH] = node.depth;
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ArrayDescriptor, ArrayId, Mesh, Primitive, Triangle};
    use nalgebra::Vector3;

    #[test]
    fn test_header_layout() {
        let mesh = Primitive::quad(1.0).to_mesh();
        let octree = Octree::build(&mesh, &mesh.bounding_box().inflated(1.0));
        let compact = octree.compress().expect("small mesh fits");

        let root = compact.root();
        assert_eq!(compact.as_bytes().len() % NODE_ALIGNMENT, 0);
        assert_eq!(root.depth(), 0);
        assert_eq!(root.bounds().min, Point3::new(-1.0, -1.0, -1.0));
        let total: usize = compact.nodes().iter().map(|n| n.triangle_count()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_node_bounds_cover_triangles() {
        let mesh = Primitive::grid(6, 3.0).to_mesh();
        let octree = Octree::build(&mesh, &mesh.bounding_box());
        let compact = octree.compress().expect("small mesh fits");

        for node in compact.nodes() {
            let bounds = node.bounds();
            for t in node.triangles() {
                for p in mesh.triangle_positions(&mesh.triangles[t as usize]) {
                    assert!(bounds.contains_point(&p));
                }
            }
        }
    }

    #[test]
    fn test_from_bytes_round_trip_and_rejects_truncation() {
        let mesh = Primitive::sphere(1.0, 10).to_mesh();
        let compact = Octree::build(&mesh, &mesh.bounding_box())
            .compress()
            .expect("small mesh fits");

        let reloaded = CompactOctree::from_bytes(compact.as_bytes().to_vec()).expect("valid buffer");
        assert_eq!(reloaded, compact);

        let truncated = compact.as_bytes()[..compact.as_bytes().len() - 8].to_vec();
        assert!(matches!(
            CompactOctree::from_bytes(truncated),
            Err(GeometryError::MalformedIndex(_))
        ));
    }

    /// Chain of childless-header nodes where every octant of each node
    /// points at the node right after it
    fn shared_child_chain(length: usize) -> Vec<u8> {
        let node_size = 48;
        let mut bytes = vec![0u8; node_size * length];
        for n in 0..length - 1 {
            let start = n * node_size;
            for octant in 0..8 {
                let at = start + CHILD_OFFSETS + octant * 2;
                bytes[at..at + 2].copy_from_slice(&((node_size / NODE_ALIGNMENT) as u16).to_le_bytes());
            }
            bytes[start + CHILD_MASK] = 0xff;
            bytes[start + DEPTH] = n as u8;
        }
        bytes
    }

    #[test]
    fn test_from_bytes_rejects_shared_children() {
        assert!(matches!(
            CompactOctree::from_bytes(shared_child_chain(12)),
            Err(GeometryError::MalformedIndex(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_child_inside_parent() {
        let mut bytes = vec![0u8; 96];
        let at = CHILD_OFFSETS;
        // one unit forward lands inside the root header
        bytes[at..at + 2].copy_from_slice(&1u16.to_le_bytes());
        bytes[CHILD_MASK] = 1;
        assert!(matches!(
            CompactOctree::from_bytes(bytes),
            Err(GeometryError::MalformedIndex(_))
        ));
    }

    #[test]
    fn test_from_bytes_accepts_single_child_chain() {
        let mut bytes = shared_child_chain(3);
        for start in [0, 48] {
            bytes[start + CHILD_MASK] = 1;
            for octant in 1..8 {
                let at = start + CHILD_OFFSETS + octant * 2;
                bytes[at..at + 2].copy_from_slice(&0u16.to_le_bytes());
            }
        }
        let compact = CompactOctree::from_bytes(bytes).expect("chain of single children");
        assert_eq!(compact.node_count(), 3);
    }

    #[test]
    fn test_triangle_index_overflow_is_an_error() {
        let count = u16::MAX as usize + 3;
        let mut mesh = Mesh::with_arrays(
            6,
            &[
                ArrayDescriptor::new(ArrayId::Position, 6),
                ArrayDescriptor::new(ArrayId::Triangle, count),
            ],
        );
        mesh.positions = vec![
            Point3::new(-0.9, -0.9, -0.9),
            Point3::new(-0.8, -0.9, -0.9),
            Point3::new(-0.9, -0.8, -0.9),
            Point3::new(0.8, 0.8, 0.8),
            Point3::new(0.9, 0.8, 0.8),
            Point3::new(0.8, 0.9, 0.8),
        ];
        // alternate between two octants so no node exceeds the count limit
        for (t, triangle) in mesh.triangles.iter_mut().enumerate() {
            *triangle = if t % 2 == 0 {
                Triangle::new([0, 1, 2])
            } else {
                Triangle::new([3, 4, 5])
            };
        }
        let bounds = BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let octree = Octree::build(&mesh, &bounds);

        assert!(matches!(
            octree.compress(),
            Err(GeometryError::TriangleIndexOverflow { index }) if index > u16::MAX as usize
        ));
    }

    #[test]
    fn test_child_offset_overflow_is_an_error() {
        // thousands of tiny isolated triangles in one octant each grow a
        // private chain of nodes down to the depth limit
        let mut mesh = Mesh::new();
        for i in 0..20 {
            for j in 0..20 {
                for k in 0..12 {
                    let mut speck = Primitive::quad(1e-5).to_mesh();
                    speck.translate_mesh(&Vector3::new(
                        -0.9001 + i as f32 * 0.04,
                        -0.9001 + j as f32 * 0.04,
                        -0.9001 + k as f32 * 0.04,
                    ));
                    mesh.merge(&speck);
                }
            }
        }
        let mut far = Primitive::quad(0.1).to_mesh();
        far.translate_mesh(&Vector3::new(0.5, 0.5, 0.5));
        mesh.merge(&far);
        assert!(mesh.triangle_count() <= u16::MAX as usize);

        let bounds = BoundingBox::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert!(matches!(
            Octree::build(&mesh, &bounds).compress(),
            Err(GeometryError::ChildOffsetOverflow { .. })
        ));
    }
}
