// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Section loops: where a plane cuts the surface of a closed solid

use crate::geometry::Mesh;
use nalgebra::{Point3, Vector3};

/// Plane distances closer to zero than this count as on the plane
const PLANE_EPSILON: f64 = 1e-7;

/// How vertices lying exactly on the cutting plane are classified.
///
/// `Below` treats them as above the plane, which is the same as cutting
/// slightly below it; `Above` treats them as below. Clipping the two
/// operands with opposite biases keeps exactly one copy of coplanar faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoplanarBias {
    Below,
    Above,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    pub(crate) fn through(triangle: &[Point3<f64>; 3]) -> Option<Self> {
        let normal = (triangle[1] - triangle[0])
            .cross(&(triangle[2] - triangle[0]))
            .try_normalize(f64::MIN_POSITIVE)?;
        Some(Self {
            normal,
            offset: normal.dot(&triangle[0].coords),
        })
    }

    fn distance(&self, point: &Point3<f64>) -> f64 {
        let d = self.normal.dot(&point.coords) - self.offset;
        if d.abs() < PLANE_EPSILON {
            0.0
        } else {
            d
        }
    }
}

/// Closed triangle surface used as a clipping volume
#[derive(Debug, Clone)]
pub(crate) struct Solid {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
    face_normals: Vec<Vector3<f64>>,
    min: Point3<f64>,
    max: Point3<f64>,
    /// Inward-facing surface: the solid is everything outside it
    pub unbounded: bool,
}

impl Solid {
    pub(crate) fn from_mesh(mesh: &Mesh, inverted: bool) -> Self {
        let positions: Vec<Point3<f64>> = mesh.positions.iter().map(|p| p.cast::<f64>()).collect();
        let mut triangles = Vec::with_capacity(mesh.triangle_count());
        let mut face_normals = Vec::with_capacity(mesh.triangle_count());
        let mut volume = 0.0;

        for triangle in &mesh.triangles {
            let [a, b, c] = triangle.indices;
            let indices = if inverted { [a, c, b] } else { [a, b, c] };
            let [p0, p1, p2] = indices.map(|i| positions[i as usize]);
            let normal = (p1 - p0).cross(&(p2 - p0));
            volume += p0.coords.dot(&p1.coords.cross(&p2.coords));
            // degenerate faces never cross a plane in a useful way
            if let Some(unit) = normal.try_normalize(f64::MIN_POSITIVE) {
                triangles.push(indices);
                face_normals.push(unit);
            }
        }

        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &positions {
            min = min.inf(p);
            max = max.sup(p);
        }

        Self {
            positions,
            triangles,
            face_normals,
            min,
            max,
            unbounded: volume < 0.0,
        }
    }

    /// Axis-aligned overlap with the bounds of some points, grown by `margin`
    pub(crate) fn overlaps(&self, points: &[Point3<f64>], margin: f64) -> bool {
        (0..3).all(|axis| {
            let lo = points.iter().map(|p| p[axis]).fold(f64::INFINITY, f64::min);
            let hi = points.iter().map(|p| p[axis]).fold(f64::NEG_INFINITY, f64::max);
            lo <= self.max[axis] + margin && hi >= self.min[axis] - margin
        })
    }

    /// Directed cut segments, oriented so the solid's cross-section lies to
    /// their left when seen from the plane's front
    fn section_segments(&self, plane: &Plane, bias: CoplanarBias, weld_epsilon: f64) -> Vec<(Point3<f64>, Point3<f64>)> {
        let mut segments = Vec::new();
        for (indices, face_normal) in self.triangles.iter().zip(&self.face_normals) {
            let points = indices.map(|i| self.positions[i as usize]);
            let distances = points.map(|p| plane.distance(&p));
            let above = distances.map(|d| match bias {
                CoplanarBias::Below => d >= 0.0,
                CoplanarBias::Above => d > 0.0,
            });
            if above[0] == above[1] && above[1] == above[2] {
                continue;
            }

            let mut crossing = Vec::with_capacity(2);
            for i in 0..3 {
                let j = (i + 1) % 3;
                if above[i] != above[j] {
                    crossing.push(edge_crossing(&points[i], distances[i], &points[j], distances[j]));
                }
            }
            let [p, q] = [crossing[0], crossing[1]];
            if (q - p).norm() <= weld_epsilon {
                continue;
            }
            let direction = plane.normal.cross(face_normal);
            if (q - p).dot(&direction) >= 0.0 {
                segments.push((p, q));
            } else {
                segments.push((q, p));
            }
        }
        segments
    }

    /// Closed loops where `plane` cuts this solid.
    ///
    /// Segments are chained by matching each loop end to the nearest unused
    /// segment start within `weld_epsilon`; chains that never close are
    /// dropped. Loops wind counter-clockwise around the plane normal around
    /// material and clockwise around holes.
    pub(crate) fn section_loops(
        &self,
        plane: &Plane,
        bias: CoplanarBias,
        weld_epsilon: f64,
        collinear_cos: f64,
    ) -> Vec<Vec<Point3<f64>>> {
        let segments = self.section_segments(plane, bias, weld_epsilon);
        let mut used = vec![false; segments.len()];
        let mut loops = Vec::new();
        let mut open = 0usize;

        for first in 0..segments.len() {
            if used[first] {
                continue;
            }
            used[first] = true;
            let (start, mut end) = segments[first];
            let mut points = vec![start, end];

            let closed = loop {
                if points.len() > 2 && (end - start).norm() <= weld_epsilon {
                    points.pop();
                    break true;
                }
                let next = segments
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| !used[*k])
                    .map(|(k, (p, _))| (k, (p - end).norm()))
                    .filter(|(_, distance)| *distance <= weld_epsilon)
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                match next {
                    Some((k, _)) => {
                        used[k] = true;
                        end = segments[k].1;
                        points.push(end);
                    }
                    None => break false,
                }
            };

            if !closed {
                open += 1;
                continue;
            }
            prune_collinear(&mut points, collinear_cos, weld_epsilon);
            if points.len() >= 3 {
                loops.push(points);
            }
        }

        if open > 0 {
            log::debug!("section: dropped {} open chains", open);
        }
        loops
    }
}

/// Point where edge `a-b` meets the plane, interpolated from a canonical
/// endpoint order so both faces sharing the edge produce the same point
fn edge_crossing(a: &Point3<f64>, da: f64, b: &Point3<f64>, db: f64) -> Point3<f64> {
    let ordered = (a.x, a.y, a.z) <= (b.x, b.y, b.z);
    let (a, da, b, db) = if ordered { (a, da, b, db) } else { (b, db, a, da) };
    if da == 0.0 {
        return *a;
    }
    if db == 0.0 {
        return *b;
    }
    let t = da / (da - db);
    a + (b - a) * t
}

/// Remove repeated points and vertices where the loop runs straight on
pub(crate) fn prune_collinear(points: &mut Vec<Point3<f64>>, collinear_cos: f64, epsilon: f64) {
    let mut changed = true;
    while changed && points.len() >= 3 {
        changed = false;
        let mut i = 0;
        while i < points.len() && points.len() >= 3 {
            let n = points.len();
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            let incoming = points[i] - prev;
            let outgoing = next - points[i];
            let straight = match (incoming.try_normalize(epsilon), outgoing.try_normalize(epsilon)) {
                (Some(a), Some(b)) => a.dot(&b) > collinear_cos,
                _ => true,
            };
            if straight {
                points.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;

    fn unit_cube() -> Mesh {
        Primitive::cube(nalgebra::Vector3::new(1.0, 1.0, 1.0), false).to_mesh()
    }

    fn horizontal(z: f64) -> Plane {
        Plane {
            normal: Vector3::z(),
            offset: z,
        }
    }

    fn loop_area(points: &[Point3<f64>], normal: &Vector3<f64>) -> f64 {
        let n = points.len();
        (0..n)
            .map(|i| points[i].coords.cross(&points[(i + 1) % n].coords).dot(normal))
            .sum::<f64>()
            * 0.5
    }

    #[test]
    fn test_cube_section_is_one_square() {
        let solid = Solid::from_mesh(&unit_cube(), false);
        let loops = solid.section_loops(&horizontal(0.5), CoplanarBias::Below, 1e-6, 0.9999);

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
        assert_relative_eq!(loop_area(&loops[0], &Vector3::z()), 1.0, epsilon = 1e-12);
        assert!(!solid.unbounded);
    }

    #[test]
    fn test_inverted_solid_winds_clockwise() {
        let solid = Solid::from_mesh(&unit_cube(), true);
        let loops = solid.section_loops(&horizontal(0.5), CoplanarBias::Below, 1e-6, 0.9999);

        assert!(solid.unbounded);
        assert_relative_eq!(loop_area(&loops[0], &Vector3::z()), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coplanar_bias() {
        let solid = Solid::from_mesh(&unit_cube(), false);
        // cutting at the top face: below-bias sees the cube, above-bias does not
        assert_eq!(solid.section_loops(&horizontal(1.0), CoplanarBias::Below, 1e-6, 0.9999).len(), 1);
        assert!(solid.section_loops(&horizontal(1.0), CoplanarBias::Above, 1e-6, 0.9999).is_empty());
    }

    #[test]
    fn test_prune_collinear() {
        let mut points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        prune_collinear(&mut points, 0.9999, 1e-9);
        assert_eq!(points.len(), 4);
    }
}
