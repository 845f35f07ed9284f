// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the geometry kernel

use crate::geometry::ArrayId;
use thiserror::Error;

/// Errors surfaced by the kernel.
///
/// Geometry algorithms assume well-formed input and do not report errors;
/// these variants cover format capacity limits, explicit validation and
/// decoding of raw byte blobs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// A triangle index does not fit the 16-bit compact index format
    #[error("triangle index {index} exceeds the 16-bit compact index capacity")]
    TriangleIndexOverflow { index: usize },

    /// A child node lies too far away to be addressed by a 16-bit offset
    #[error("child offset of {offset} bytes exceeds the 16-bit compact offset capacity")]
    ChildOffsetOverflow { offset: usize },

    /// A node holds more triangles than its 16-bit count field can describe
    #[error("node holds {count} triangles, more than a compact node can store")]
    NodeTriangleOverflow { count: usize },

    /// Compact index bytes are truncated or inconsistent
    #[error("malformed compact index: {0}")]
    MalformedIndex(String),

    /// A vertex array length disagrees with the mesh vertex count
    #[error("array {id:?} has {actual} elements, expected {expected}")]
    ArrayLength {
        id: ArrayId,
        expected: usize,
        actual: usize,
    },

    /// A triangle references a vertex past the end of the vertex arrays
    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    /// A segment range runs past the end of the triangle array
    #[error("segment {segment} covers triangles beyond the triangle count {triangle_count}")]
    SegmentOutOfRange {
        segment: usize,
        triangle_count: usize,
    },

    /// A raw array blob has the wrong size for its element layout
    #[error("blob for array {id:?} is {len} bytes, expected at least {expected}")]
    BlobSize {
        id: ArrayId,
        len: usize,
        expected: usize,
    },
}

/// Result alias used throughout the kernel
pub type Result<T> = std::result::Result<T, GeometryError>;
