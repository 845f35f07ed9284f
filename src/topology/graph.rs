// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Directed-edge connectivity graph over a mesh snapshot

use crate::geometry::{Mesh, Triangle};
use ahash::AHashSet;
use nalgebra::{Point3, Vector3};

/// Vertex of the graph with its incident edges and faces.
///
/// Handle lists may hold dead edges and faces; readers skip them.
#[derive(Debug, Clone)]
pub struct TopoVertex {
    pub position: Point3<f32>,
    pub outgoing: Vec<u32>,
    pub incoming: Vec<u32>,
    pub faces: Vec<u32>,
    /// Used by the protected triangles; never removed
    pub locked: bool,
    pub alive: bool,
}

/// Directed edge `start -> finish` of one face
#[derive(Debug, Clone, Copy)]
pub struct TopoEdge {
    pub start: u32,
    pub finish: u32,
    pub face: u32,
    /// Cost of collapsing `start` into `finish`, infinite when not allowed
    pub cost: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TopoFace {
    pub vertices: [u32; 3],
    pub edges: [u32; 3],
    /// Unit normal at build time
    pub original_normal: Vector3<f32>,
    /// Area at build time
    pub original_area: f32,
    pub alive: bool,
}

/// Why a collapse was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    Dead,
    Locked,
    Boundary,
    NonManifold,
    Distortion,
}

/// Retained faces must keep this share of their original area
const MIN_AREA_RATIO: f32 = 0.125;

/// Connectivity graph used by simplification.
///
/// Vertices, edges and faces live in arenas addressed by `u32` handles.
/// Collapses only mark elements dead, so handles stay valid for the
/// graph's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    pub(crate) vertices: Vec<TopoVertex>,
    pub(crate) edges: Vec<TopoEdge>,
    pub(crate) faces: Vec<TopoFace>,
    /// Triangles excluded from simplification, in original vertex indices
    pub(crate) protected: Vec<Triangle>,
    pub(crate) collapse_count: usize,
}

impl TopologyGraph {
    /// Graph over every triangle of the mesh
    pub fn build(mesh: &Mesh) -> Self {
        Self::build_partial(mesh, mesh.triangle_count())
    }

    /// Graph over the first `simplify_triangle_count` triangles.
    ///
    /// The remaining triangles are carried through unchanged and their
    /// vertices are locked in place.
    pub fn build_partial(mesh: &Mesh, simplify_triangle_count: usize) -> Self {
        let split = simplify_triangle_count.min(mesh.triangle_count());
        let mut graph = Self {
            vertices: mesh
                .positions
                .iter()
                .map(|&position| TopoVertex {
                    position,
                    outgoing: Vec::new(),
                    incoming: Vec::new(),
                    faces: Vec::new(),
                    locked: false,
                    alive: true,
                })
                .collect(),
            protected: mesh.triangles[split..].to_vec(),
            ..Self::default()
        };
        for triangle in &graph.protected {
            for &i in &triangle.indices {
                graph.vertices[i as usize].locked = true;
            }
        }

        let mut skipped = 0usize;
        for triangle in &mesh.triangles[..split] {
            if triangle.is_degenerate() {
                skipped += 1;
                continue;
            }
            graph.add_face(triangle.indices);
        }
        if skipped > 0 {
            log::debug!("topology: skipped {} degenerate triangles", skipped);
        }
        graph
    }

    fn add_face(&mut self, vertices: [u32; 3]) {
        let face = self.faces.len() as u32;
        let first_edge = self.edges.len() as u32;
        for k in 0..3 {
            let start = vertices[k];
            let finish = vertices[(k + 1) % 3];
            self.edges.push(TopoEdge {
                start,
                finish,
                face,
                cost: f32::INFINITY,
                alive: true,
            });
            self.vertices[start as usize].outgoing.push(first_edge + k as u32);
            self.vertices[finish as usize].incoming.push(first_edge + k as u32);
            self.vertices[start as usize].faces.push(face);
        }

        let [a, b, c] = vertices.map(|v| self.vertices[v as usize].position);
        let cross = (b - a).cross(&(c - a));
        let area = cross.norm() * 0.5;
        self.faces.push(TopoFace {
            vertices,
            edges: [first_edge, first_edge + 1, first_edge + 2],
            original_normal: cross.try_normalize(f32::MIN_POSITIVE).unwrap_or_else(Vector3::z),
            original_area: area,
            alive: true,
        });
    }

    pub fn vertices(&self) -> &[TopoVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[TopoEdge] {
        &self.edges
    }

    pub fn faces(&self) -> &[TopoFace] {
        &self.faces
    }

    pub fn collapse_count(&self) -> usize {
        self.collapse_count
    }

    /// Live faces plus the protected triangles
    pub fn live_triangle_count(&self) -> usize {
        self.faces.iter().filter(|f| f.alive).count() + self.protected.len()
    }

    /// Vertices used by a live face or a protected triangle
    pub fn live_vertex_count(&self) -> usize {
        (0..self.vertices.len() as u32).filter(|&v| self.is_referenced(v)).count()
    }

    pub(crate) fn is_referenced(&self, v: u32) -> bool {
        let vertex = &self.vertices[v as usize];
        vertex.alive && (vertex.locked || self.live_faces(v).next().is_some())
    }

    pub(crate) fn live_faces(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        self.vertices[v as usize]
            .faces
            .iter()
            .copied()
            .filter(|&f| self.faces[f as usize].alive)
    }

    pub(crate) fn live_outgoing(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        self.vertices[v as usize]
            .outgoing
            .iter()
            .copied()
            .filter(|&e| self.edges[e as usize].alive)
    }

    pub(crate) fn live_incoming(&self, v: u32) -> impl Iterator<Item = u32> + '_ {
        self.vertices[v as usize]
            .incoming
            .iter()
            .copied()
            .filter(|&e| self.edges[e as usize].alive)
    }

    pub(crate) fn position(&self, v: u32) -> Point3<f32> {
        self.vertices[v as usize].position
    }

    /// No live edge runs the opposite way
    pub fn is_boundary_edge(&self, e: u32) -> bool {
        let edge = self.edges[e as usize];
        !self
            .live_outgoing(edge.finish)
            .any(|o| self.edges[o as usize].finish == edge.start)
    }

    pub(crate) fn is_boundary_vertex(&self, v: u32) -> bool {
        self.live_outgoing(v).any(|e| self.is_boundary_edge(e))
            || self.live_incoming(v).any(|e| self.is_boundary_edge(e))
    }

    /// Every vertex has at most one live edge to and from each neighbor
    pub fn is_edge_manifold(&self) -> bool {
        (0..self.vertices.len() as u32).all(|v| {
            let mut finishes = AHashSet::new();
            let mut starts = AHashSet::new();
            self.live_outgoing(v)
                .all(|e| finishes.insert(self.edges[e as usize].finish))
                && self
                    .live_incoming(v)
                    .all(|e| starts.insert(self.edges[e as usize].start))
        })
    }

    fn face_has(&self, f: u32, v: u32) -> bool {
        self.faces[f as usize].vertices.contains(&v)
    }

    /// Check that `v` may be merged into `w`
    pub(crate) fn check_collapse(&self, v: u32, w: u32, allow_boundary: bool) -> Result<(), Rejection> {
        let (vertex, target) = (&self.vertices[v as usize], &self.vertices[w as usize]);
        if !vertex.alive || !target.alive || v == w {
            return Err(Rejection::Dead);
        }
        if vertex.locked {
            return Err(Rejection::Locked);
        }
        if !allow_boundary && self.is_boundary_vertex(v) {
            return Err(Rejection::Boundary);
        }

        // edges of faces holding both ends disappear, the rest are retargeted
        let mut finishes = AHashSet::new();
        let mut starts = AHashSet::new();
        for u in [v, w] {
            for e in self.live_outgoing(u) {
                let edge = self.edges[e as usize];
                if self.face_has(edge.face, v) && self.face_has(edge.face, w) {
                    continue;
                }
                let finish = if edge.finish == v { w } else { edge.finish };
                if !finishes.insert(finish) {
                    return Err(Rejection::NonManifold);
                }
            }
            for e in self.live_incoming(u) {
                let edge = self.edges[e as usize];
                if self.face_has(edge.face, v) && self.face_has(edge.face, w) {
                    continue;
                }
                let start = if edge.start == v { w } else { edge.start };
                if !starts.insert(start) {
                    return Err(Rejection::NonManifold);
                }
            }
        }

        let moved = self.position(w);
        for f in self.live_faces(v) {
            if self.face_has(f, w) {
                continue;
            }
            let face = &self.faces[f as usize];
            let [a, b, c] = face.vertices.map(|u| if u == v { moved } else { self.position(u) });
            let cross = (b - a).cross(&(c - a));
            let current = self.face_normal(f);
            if cross.dot(&current) <= 0.0
                || cross.dot(&face.original_normal) * 0.5 < MIN_AREA_RATIO * face.original_area
            {
                return Err(Rejection::Distortion);
            }
        }
        Ok(())
    }

    /// Current unit normal of a face
    pub(crate) fn face_normal(&self, f: u32) -> Vector3<f32> {
        let [a, b, c] = self.faces[f as usize].vertices.map(|u| self.position(u));
        (b - a)
            .cross(&(c - a))
            .try_normalize(f32::MIN_POSITIVE)
            .unwrap_or(self.faces[f as usize].original_normal)
    }

    fn kill_face(&mut self, f: u32) {
        let face = &mut self.faces[f as usize];
        face.alive = false;
        for e in face.edges {
            self.edges[e as usize].alive = false;
        }
    }

    /// Merge `v` into `w`: faces holding both die, the others are retargeted
    pub(crate) fn collapse(&mut self, v: u32, w: u32) {
        for f in std::mem::take(&mut self.vertices[v as usize].faces) {
            if !self.faces[f as usize].alive {
                continue;
            }
            if self.face_has(f, w) {
                self.kill_face(f);
            } else {
                for slot in &mut self.faces[f as usize].vertices {
                    if *slot == v {
                        *slot = w;
                    }
                }
                self.vertices[w as usize].faces.push(f);
            }
        }
        for e in std::mem::take(&mut self.vertices[v as usize].outgoing) {
            if self.edges[e as usize].alive {
                self.edges[e as usize].start = w;
                self.vertices[w as usize].outgoing.push(e);
            }
        }
        for e in std::mem::take(&mut self.vertices[v as usize].incoming) {
            if self.edges[e as usize].alive {
                self.edges[e as usize].finish = w;
                self.vertices[w as usize].incoming.push(e);
            }
        }
        self.vertices[v as usize].alive = false;

        let (edges, faces) = (&self.edges, &self.faces);
        let target = &mut self.vertices[w as usize];
        target.outgoing.retain(|&e| edges[e as usize].alive);
        target.incoming.retain(|&e| edges[e as usize].alive);
        target.faces.retain(|&f| faces[f as usize].alive);
        self.collapse_count += 1;
    }
}
