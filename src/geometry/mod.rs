// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and operations

mod attributes;
mod bbox;
mod blob;
mod consolidate;
mod mesh;
mod primitives;
mod segments;
pub mod analytics;

pub use analytics::{analyze, GeometryStats};
pub use bbox::BoundingBox;
pub use mesh::{
    ArrayDescriptor, ArrayId, ArrayMask, BoneInfluence, Color, Mesh, MorphTarget, Segment,
    Triangle,
};
pub use primitives::Primitive;

pub(crate) use mesh::unit_or_z;
