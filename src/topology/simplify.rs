// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boundary straightening and greedy edge-collapse simplification

use super::graph::{Rejection, TopoEdge, TopologyGraph};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Boundary turns straighter than this are removed
pub const BOUNDARY_COLLINEAR_COS: f32 = 0.9999;

/// Totally ordered collapse cost
#[derive(Debug, Clone, Copy)]
struct Cost(f32);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default)]
struct RejectionTally {
    locked: usize,
    boundary: usize,
    non_manifold: usize,
    distortion: usize,
}

impl RejectionTally {
    fn record(&mut self, rejection: Rejection) {
        log::trace!("collapse rejected: {:?}", rejection);
        match rejection {
            Rejection::Dead => {}
            Rejection::Locked => self.locked += 1,
            Rejection::Boundary => self.boundary += 1,
            Rejection::NonManifold => self.non_manifold += 1,
            Rejection::Distortion => self.distortion += 1,
        }
    }
}

impl std::fmt::Display for RejectionTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "locked {}, boundary {}, non-manifold {}, distortion {}",
            self.locked, self.boundary, self.non_manifold, self.distortion
        )
    }
}

impl TopologyGraph {
    /// Remove boundary vertices where the boundary runs straight on.
    ///
    /// A vertex qualifies when it has exactly one boundary edge in and one
    /// out and the two are collinear; it is merged into the nearer of its two
    /// boundary neighbors. Repeats until nothing changes. Returns the number
    /// of vertices removed.
    pub fn simplify_boundary_edges(&mut self) -> usize {
        let mut removed = 0;
        let mut rejected = RejectionTally::default();
        loop {
            let mut changed = false;
            for v in 0..self.vertices.len() as u32 {
                let vertex = &self.vertices[v as usize];
                if !vertex.alive || vertex.locked {
                    continue;
                }
                let Some((previous, next)) = self.straight_boundary(v) else {
                    continue;
                };
                let position = self.position(v);
                let target = if (position - self.position(previous)).norm() <= (self.position(next) - position).norm() {
                    previous
                } else {
                    next
                };
                match self.check_collapse(v, target, true) {
                    Ok(()) => {
                        self.collapse(v, target);
                        removed += 1;
                        changed = true;
                    }
                    Err(rejection) => rejected.record(rejection),
                }
            }
            if !changed {
                break;
            }
        }
        log::debug!("boundary simplification: removed {} vertices, rejected: {}", removed, rejected);
        removed
    }

    /// Neighbors `(previous, next)` when `v` sits on a straight boundary run
    fn straight_boundary(&self, v: u32) -> Option<(u32, u32)> {
        let mut incoming = self.live_incoming(v).filter(|&e| self.is_boundary_edge(e));
        let into = incoming.next()?;
        if incoming.next().is_some() {
            return None;
        }
        let mut outgoing = self.live_outgoing(v).filter(|&e| self.is_boundary_edge(e));
        let out = outgoing.next()?;
        if outgoing.next().is_some() {
            return None;
        }

        let previous = self.edges[into as usize].start;
        let next = self.edges[out as usize].finish;
        if previous == next {
            return None;
        }
        let a = (self.position(v) - self.position(previous)).try_normalize(f32::MIN_POSITIVE)?;
        let b = (self.position(next) - self.position(v)).try_normalize(f32::MIN_POSITIVE)?;
        (a.dot(&b) > BOUNDARY_COLLINEAR_COS).then_some((previous, next))
    }

    /// Cost of merging the start of edge `e` into its finish.
    ///
    /// `length × penalty² × outgoing`, where the penalty grows with how far
    /// the edge leaves the planes of the faces around its start and
    /// `outgoing` counts the start's live outgoing edges.
    fn collapse_cost(&self, e: u32) -> Result<f32, Rejection> {
        let edge = self.edges[e as usize];
        if !edge.alive {
            return Err(Rejection::Dead);
        }
        self.check_collapse(edge.start, edge.finish, false)?;

        let direction = self.position(edge.finish) - self.position(edge.start);
        let length = direction.norm();
        if length <= f32::MIN_POSITIVE {
            return Ok(0.0);
        }
        let unit = direction / length;
        let deviation = self
            .live_faces(edge.start)
            .map(|f| self.face_normal(f).dot(&unit).abs())
            .fold(0.0f32, f32::max);
        let penalty = 1.0 + deviation;
        let outgoing = self.live_outgoing(edge.start).count() as f32;
        Ok(length * penalty * penalty * outgoing)
    }

    fn refresh_cost(&mut self, e: u32, queue: &mut BTreeSet<(Cost, u32)>, rejected: &mut RejectionTally) {
        queue.remove(&(Cost(self.edges[e as usize].cost), e));
        let cost = match self.collapse_cost(e) {
            Ok(cost) => cost,
            Err(rejection) => {
                rejected.record(rejection);
                f32::INFINITY
            }
        };
        self.edges[e as usize].cost = cost;
        if cost.is_finite() {
            queue.insert((Cost(cost), e));
        }
    }

    /// Collapse the cheapest legal edge until none costs at most
    /// `collapse_threshold`. Returns the number of collapses performed.
    ///
    /// Boundary and locked vertices never move. A collapse is refused when
    /// it would give a vertex two edges to the same neighbor, or shrink a
    /// retained face below 12.5% of its original area measured along its
    /// original normal.
    pub fn optimize_mesh(&mut self, collapse_threshold: f32) -> usize {
        let mut queue = BTreeSet::new();
        let mut rejected = RejectionTally::default();
        for e in 0..self.edges.len() as u32 {
            self.edges[e as usize].cost = f32::INFINITY;
            self.refresh_cost(e, &mut queue, &mut rejected);
        }

        let mut performed = 0;
        while let Some((Cost(cost), e)) = queue.pop_first() {
            if cost > collapse_threshold {
                break;
            }
            // costs of distant edges can go stale; never collapse on one
            match self.collapse_cost(e) {
                Ok(current) if current == cost => {}
                Ok(current) => {
                    self.edges[e as usize].cost = current;
                    queue.insert((Cost(current), e));
                    continue;
                }
                Err(rejection) => {
                    rejected.record(rejection);
                    self.edges[e as usize].cost = f32::INFINITY;
                    continue;
                }
            }

            let TopoEdge { start, finish, .. } = self.edges[e as usize];
            self.collapse(start, finish);
            performed += 1;

            let mut affected: Vec<u32> = vec![finish];
            affected.extend(self.live_outgoing(finish).map(|o| self.edges[o as usize].finish));
            affected.extend(self.live_incoming(finish).map(|i| self.edges[i as usize].start));
            affected.sort_unstable();
            affected.dedup();
            let edges: Vec<u32> = affected
                .iter()
                .flat_map(|&v| self.live_outgoing(v).chain(self.live_incoming(v)).collect::<Vec<_>>())
                .collect();
            for edge in edges {
                self.refresh_cost(edge, &mut queue, &mut rejected);
            }
        }

        log::debug!(
            "optimize: {} collapses at threshold {}, rejected: {}",
            performed,
            collapse_threshold,
            rejected
        );
        performed
    }
}
