// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-material triangle ranges

use super::{Mesh, Segment};

impl Mesh {
    /// Material of a triangle, looked up through its first vertex's surface
    pub fn triangle_material(&self, triangle: usize, surface_materials: &[u32]) -> u32 {
        let surface = self.surface_of(self.triangles[triangle].indices[0] as usize);
        surface_materials.get(surface as usize).copied().unwrap_or(0)
    }

    /// Group triangles into contiguous per-material ranges.
    ///
    /// Triangles are stable-sorted by material index and one segment is
    /// emitted per material. A mesh using a single material gets an empty
    /// segment table and keeps its triangle order.
    pub fn build_segment_array(&mut self, surface_materials: &[u32]) {
        let materials: Vec<u32> = (0..self.triangles.len())
            .map(|t| self.triangle_material(t, surface_materials))
            .collect();

        let single = materials.windows(2).all(|pair| pair[0] == pair[1]);
        if single {
            self.segments.clear();
            return;
        }

        let mut order: Vec<usize> = (0..self.triangles.len()).collect();
        order.sort_by_key(|&t| materials[t]);
        self.triangles = order.iter().map(|&t| self.triangles[t]).collect();

        self.segments.clear();
        for (position, &t) in order.iter().enumerate() {
            let material = materials[t];
            match self.segments.last_mut() {
                Some(segment) if segment.material_index == material => segment.triangle_count += 1,
                _ => self.segments.push(Segment {
                    material_index: material,
                    triangle_start: position as u32,
                    triangle_count: 1,
                }),
            }
        }
    }
}
