// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Vertex consolidation: welding across surfaces, mending within a surface
//! and exact full-attribute deduplication

use super::{BoundingBox, Mesh, Segment, Triangle};
use ahash::RandomState;
use nalgebra::{Point3, Vector3};
use std::hash::{BuildHasher, Hash, Hasher};

const GRID_CELLS: usize = 8;
const UNIFY_BUCKETS: usize = 512;

/// Uniform 8x8x8 grid over a bounding box holding leader vertex indices
struct VertexGrid {
    bounds: BoundingBox,
    cell_size: Vector3<f32>,
    cells: Vec<Vec<u32>>,
}

impl VertexGrid {
    fn new(bounds: BoundingBox) -> Self {
        let cell_size = bounds.size() / GRID_CELLS as f32;
        Self {
            bounds,
            cell_size,
            cells: vec![Vec::new(); GRID_CELLS * GRID_CELLS * GRID_CELLS],
        }
    }

    fn cell_coord(&self, value: f32, axis: usize) -> usize {
        if self.cell_size[axis] <= 0.0 {
            return 0;
        }
        let cell = ((value - self.bounds.min[axis]) / self.cell_size[axis]).floor();
        cell.clamp(0.0, (GRID_CELLS - 1) as f32) as usize
    }

    fn cell_index(x: usize, y: usize, z: usize) -> usize {
        (z * GRID_CELLS + y) * GRID_CELLS + x
    }

    fn insert(&mut self, point: &Point3<f32>, vertex: u32) {
        let index = Self::cell_index(
            self.cell_coord(point.x, 0),
            self.cell_coord(point.y, 1),
            self.cell_coord(point.z, 2),
        );
        self.cells[index].push(vertex);
    }

    /// Visit every leader in cells overlapping the cube of half-size `radius`
    fn for_each_near(&self, point: &Point3<f32>, radius: f32, mut visit: impl FnMut(u32)) {
        let lo: [usize; 3] = [0, 1, 2].map(|axis| self.cell_coord(point[axis] - radius, axis));
        let hi: [usize; 3] = [0, 1, 2].map(|axis| self.cell_coord(point[axis] + radius, axis));
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    for &vertex in &self.cells[Self::cell_index(x, y, z)] {
                        visit(vertex);
                    }
                }
            }
        }
    }
}

impl Mesh {
    /// Snap vertices onto nearby vertices of a different surface.
    ///
    /// Vertices are visited in index order and only ever snap to an earlier
    /// vertex that itself found no match (a leader). The result therefore
    /// depends on vertex order; a symmetric merge would change output.
    pub fn weld_mesh(&mut self, epsilon: f32) {
        if self.positions.is_empty() {
            return;
        }
        let mut grid = VertexGrid::new(self.bounding_box());
        let epsilon_sq = epsilon * epsilon;
        let mut snapped = 0usize;

        for v in 0..self.vertex_count {
            let point = self.positions[v];
            let surface = self.surface_of(v);
            let mut best: Option<(f32, u32)> = None;

            grid.for_each_near(&point, epsilon, |leader| {
                if self.surface_of(leader as usize) == surface {
                    return;
                }
                let distance_sq = (self.positions[leader as usize] - point).norm_squared();
                if distance_sq <= epsilon_sq && best.map_or(true, |(d, _)| distance_sq < d) {
                    best = Some((distance_sq, leader));
                }
            });

            match best {
                Some((_, leader)) => {
                    self.positions[v] = self.positions[leader as usize];
                    snapped += 1;
                }
                None => grid.insert(&point, v as u32),
            }
        }
        log::debug!("weld: snapped {} of {} vertices", snapped, self.vertex_count);
    }

    /// Snap near-identical vertices of the same surface together.
    ///
    /// A match needs positions within `vertex_epsilon`, normals with a dot
    /// product above `1 - normal_epsilon` and texcoords differing by less than
    /// `texcoord_epsilon` per component. The leader's position, normal and
    /// texcoords are copied onto the matching vertex; follow with
    /// [`Mesh::unify_mesh`] to merge them.
    pub fn mend_mesh(&mut self, vertex_epsilon: f32, normal_epsilon: f32, texcoord_epsilon: f32) {
        if self.positions.is_empty() {
            return;
        }
        let mut grid = VertexGrid::new(self.bounding_box());
        let epsilon_sq = vertex_epsilon * vertex_epsilon;
        let mut mended = 0usize;

        for v in 0..self.vertex_count {
            let point = self.positions[v];
            let surface = self.surface_of(v);
            let mut best: Option<(f32, u32)> = None;

            grid.for_each_near(&point, vertex_epsilon, |leader| {
                let l = leader as usize;
                if self.surface_of(l) != surface {
                    return;
                }
                let distance_sq = (self.positions[l] - point).norm_squared();
                if distance_sq > epsilon_sq {
                    return;
                }
                if !self.normals.is_empty()
                    && self.normals[l].dot(&self.normals[v]) <= 1.0 - normal_epsilon
                {
                    return;
                }
                let texcoords_close = |set: &[nalgebra::Point2<f32>]| {
                    set.is_empty() || (set[l] - set[v]).amax() < texcoord_epsilon
                };
                if !texcoords_close(&self.texcoords0) || !texcoords_close(&self.texcoords1) {
                    return;
                }
                if best.map_or(true, |(d, _)| distance_sq < d) {
                    best = Some((distance_sq, leader));
                }
            });

            match best {
                Some((_, leader)) => {
                    let l = leader as usize;
                    self.positions[v] = self.positions[l];
                    if !self.normals.is_empty() {
                        self.normals[v] = self.normals[l];
                    }
                    if !self.texcoords0.is_empty() {
                        self.texcoords0[v] = self.texcoords0[l];
                    }
                    if !self.texcoords1.is_empty() {
                        self.texcoords1[v] = self.texcoords1[l];
                    }
                    mended += 1;
                }
                None => grid.insert(&point, v as u32),
            }
        }
        log::debug!("mend: matched {} of {} vertices", mended, self.vertex_count);
    }

    /// Deduplicate vertices with identical attributes within a surface.
    ///
    /// Compares position, both texcoord sets, normal, color, tangent
    /// direction with handedness, skin and morph data. Triangles that become
    /// degenerate are dropped and segment ranges shrink to match. The
    /// tangent array is stripped; rebuild it with
    /// [`Mesh::build_tangent_array`].
    pub fn unify_mesh(input: &Mesh) -> Mesh {
        let hasher = RandomState::with_seeds(0x5eed, 0x0c7a, 0x11ee, 0x3d17);
        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); UNIFY_BUCKETS];
        let mut remap = vec![0u32; input.vertex_count];
        let mut kept: Vec<u32> = Vec::new();

        for v in 0..input.vertex_count {
            let bucket = input.unify_hash(&hasher, v) as usize % UNIFY_BUCKETS;
            let existing = buckets[bucket]
                .iter()
                .copied()
                .find(|&k| input.same_vertex(kept[k as usize] as usize, v));
            match existing {
                Some(k) => remap[v] = k,
                None => {
                    let k = kept.len() as u32;
                    kept.push(v as u32);
                    buckets[bucket].push(k);
                    remap[v] = k;
                }
            }
        }

        let mut triangles = Vec::with_capacity(input.triangles.len());
        let mut survivors = vec![false; input.triangles.len()];
        for (t, triangle) in input.triangles.iter().enumerate() {
            let remapped = Triangle::new(triangle.indices.map(|i| remap[i as usize]));
            if !remapped.is_degenerate() {
                survivors[t] = true;
                triangles.push(remapped);
            }
        }
        let mut segments = Vec::with_capacity(input.segments.len());
        let mut start = 0u32;
        for segment in &input.segments {
            let range = segment.triangle_start as usize
                ..(segment.triangle_start + segment.triangle_count) as usize;
            let count = survivors[range].iter().filter(|&&alive| alive).count() as u32;
            if count > 0 {
                segments.push(Segment {
                    material_index: segment.material_index,
                    triangle_start: start,
                    triangle_count: count,
                });
                start += count;
            }
        }

        let dropped = input.triangles.len() - triangles.len();
        if dropped > 0 {
            log::debug!("unify: dropped {} degenerate triangles", dropped);
        }

        let mut output = input.remap_vertices(&kept, triangles);
        output.tangents.clear();
        output.segments = segments;
        output
    }

    fn unify_hash(&self, hasher: &RandomState, v: usize) -> u64 {
        let mut state = hasher.build_hasher();
        self.surface_of(v).hash(&mut state);
        if let Some(p) = self.positions.get(v) {
            // +0.0 and -0.0 compare equal and must hash equal
            [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits).hash(&mut state);
        }
        state.finish()
    }

    fn same_vertex(&self, a: usize, b: usize) -> bool {
        fn same<T: PartialEq>(data: &[T], a: usize, b: usize) -> bool {
            data.is_empty() || data[a] == data[b]
        }

        let tangents_match = self.tangents.is_empty()
            || (self.tangents[a].xyz() == self.tangents[b].xyz()
                && (self.tangents[a].w < 0.0) == (self.tangents[b].w < 0.0));
        let skin_match = self.skin_size == 0
            || self.skin[a * self.skin_size..(a + 1) * self.skin_size]
                == self.skin[b * self.skin_size..(b + 1) * self.skin_size];
        let morph_match = self.morphs.iter().all(|m| {
            m.position_deltas[a] == m.position_deltas[b] && m.normal_deltas[a] == m.normal_deltas[b]
        });

        self.surface_of(a) == self.surface_of(b)
            && same(&self.positions, a, b)
            && same(&self.texcoords0, a, b)
            && same(&self.texcoords1, a, b)
            && same(&self.normals, a, b)
            && same(&self.colors, a, b)
            && tangents_match
            && skin_match
            && morph_match
    }
}
