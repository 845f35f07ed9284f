// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Segment and swept-sphere queries against a compact spatial index

mod shape;
mod sweep;

pub use shape::CollisionShape;
pub use sweep::{segment_triangle, sphere_sweep_triangle, TriangleHit};

use bitflags::bitflags;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Collision kinds carried per triangle and selected per query
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionMask: u32 {
        const SOLID = 1 << 0;
        const CAMERA = 1 << 1;
        const PROJECTILE = 1 << 2;
        const TRIGGER = 1 << 3;
        const WATER = 1 << 4;

        const ALL = u32::MAX;
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        CollisionMask::SOLID
    }
}

/// Line segment from `start` to `end`, optionally swept by a sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentQuery {
    pub start: Point3<f32>,
    pub end: Point3<f32>,
    /// Sphere radius; zero for a plain segment
    pub radius: f32,
    /// Only triangles whose kind intersects this mask are tested
    pub mask: CollisionMask,
}

impl SegmentQuery {
    pub fn ray(start: Point3<f32>, end: Point3<f32>) -> Self {
        Self {
            start,
            end,
            radius: 0.0,
            mask: CollisionMask::ALL,
        }
    }

    pub fn sphere(start: Point3<f32>, end: Point3<f32>, radius: f32) -> Self {
        Self {
            start,
            end,
            radius,
            mask: CollisionMask::ALL,
        }
    }

    pub fn with_mask(mut self, mask: CollisionMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.end - self.start
    }

    /// Point at parameter `t` along the segment
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.start + self.direction() * t
    }
}

/// Which part of the triangle was touched first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitFeature {
    Face,
    Edge,
    Vertex,
}

/// Earliest contact found by a query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionHit {
    /// Contact point on the triangle
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub triangle: u32,
    /// Parameter along the query segment, in `[0, 1]`
    pub t: f32,
    pub feature: HitFeature,
}
