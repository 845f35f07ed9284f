// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Spatial index: a mutable octree over mesh triangles and its compact,
//! read-only byte encoding used by collision queries

mod compact;
mod octree;

pub use compact::{CompactNode, CompactOctree, NODE_ALIGNMENT, NODE_HEADER_SIZE};
pub use octree::{Octree, OctreeNode, DEFAULT_MAX_DEPTH};
