// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Topology simplification: a connectivity graph built from a mesh,
//! boundary straightening, greedy edge collapse and compaction back into a
//! smaller mesh.
//!
//! ```no_run
//! use meshcore::geometry::Primitive;
//! use meshcore::topology::TopologyGraph;
//!
//! let mesh = Primitive::grid(8, 1.0).to_mesh();
//! let mut graph = TopologyGraph::build(&mesh);
//! graph.simplify_boundary_edges();
//! graph.optimize_mesh(0.5);
//! let smaller = graph.compact_mesh().rebuild(&mesh);
//! assert!(smaller.triangle_count() <= mesh.triangle_count());
//! ```

mod compact;
mod graph;
mod simplify;

pub use compact::CompactResult;
pub use graph::{TopoEdge, TopoFace, TopoVertex, TopologyGraph};
pub use simplify::BOUNDARY_COLLINEAR_COS;
