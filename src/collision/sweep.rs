// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact per-triangle tests: segment against triangle, and a sphere swept
//! along a segment against the triangle's face, edges and vertices

use super::HitFeature;
use nalgebra::{Point3, Vector3};

const PARALLEL_EPSILON: f32 = 1e-12;

/// Contact between a query and one triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub feature: HitFeature,
}

/// Two-sided Möller-Trumbore segment test.
///
/// The reported normal is the triangle's plane normal from its winding,
/// regardless of which side the segment arrives from.
pub fn segment_triangle(
    start: &Point3<f32>,
    end: &Point3<f32>,
    triangle: &[Point3<f32>; 3],
) -> Option<TriangleHit> {
    let [a, b, c] = triangle;
    let direction = end - start;
    let edge1 = b - a;
    let edge2 = c - a;

    let p = direction.cross(&edge2);
    let det = edge1.dot(&p);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = start - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(&q) * inv_det;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let normal = edge1.cross(&edge2).try_normalize(f32::MIN_POSITIVE)?;
    Some(TriangleHit {
        t,
        position: start + direction * t,
        normal,
        feature: HitFeature::Face,
    })
}

/// Sphere of `radius` swept from `start` to `end` against a triangle.
///
/// The face is tested first; when the sphere meets the plane inside the
/// triangle that contact is the earliest. Otherwise the three edges and three
/// vertices are tested and the smallest parameter wins. Normals point from
/// the contact towards the sphere center. A sphere already touching the
/// triangle at `start` reports `t = 0`.
pub fn sphere_sweep_triangle(
    start: &Point3<f32>,
    end: &Point3<f32>,
    radius: f32,
    triangle: &[Point3<f32>; 3],
) -> Option<TriangleHit> {
    let [a, b, c] = triangle;
    let normal = (b - a).cross(&(c - a)).try_normalize(f32::MIN_POSITIVE)?;
    let direction = end - start;

    // signed plane distance along the segment must reach the slab [-r, r]
    let d0 = normal.dot(&(start - a));
    let dd = normal.dot(&direction);
    let d1 = d0 + dd;
    if d0.min(d1) > radius || d0.max(d1) < -radius {
        return None;
    }

    if let Some(hit) = sweep_face(start, &direction, radius, triangle, &normal, d0, dd) {
        return Some(hit);
    }

    let mut best: Option<TriangleHit> = None;
    let mut keep = |candidate: Option<TriangleHit>| {
        if let Some(hit) = candidate {
            if best.map_or(true, |b| hit.t < b.t) {
                best = Some(hit);
            }
        }
    };
    for i in 0..3 {
        keep(sweep_edge(start, &direction, radius, &triangle[i], &triangle[(i + 1) % 3]));
    }
    for vertex in triangle {
        keep(sweep_vertex(start, &direction, radius, vertex));
    }
    best
}

fn sweep_face(
    start: &Point3<f32>,
    direction: &Vector3<f32>,
    radius: f32,
    triangle: &[Point3<f32>; 3],
    normal: &Vector3<f32>,
    d0: f32,
    dd: f32,
) -> Option<TriangleHit> {
    let (t, side) = if d0.abs() <= radius {
        (0.0, if d0 >= 0.0 { 1.0 } else { -1.0 })
    } else if d0 > radius {
        if dd >= 0.0 {
            return None;
        }
        ((radius - d0) / dd, 1.0)
    } else {
        if dd <= 0.0 {
            return None;
        }
        ((-radius - d0) / dd, -1.0)
    };
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let center = start + direction * t;
    let contact = center - normal * normal.dot(&(center - triangle[0]));
    if !inside_triangle(&contact, triangle, normal) {
        return None;
    }
    Some(TriangleHit {
        t,
        position: contact,
        normal: normal * side,
        feature: HitFeature::Face,
    })
}

/// Point on the triangle's plane lies inside all three edges
fn inside_triangle(point: &Point3<f32>, triangle: &[Point3<f32>; 3], normal: &Vector3<f32>) -> bool {
    (0..3).all(|i| {
        let a = triangle[i];
        let b = triangle[(i + 1) % 3];
        (b - a).cross(&(point - a)).dot(normal) >= 0.0
    })
}

/// Sphere against the infinite cylinder around edge `a-b`, restricted to
/// contacts projecting inside the edge
fn sweep_edge(
    start: &Point3<f32>,
    direction: &Vector3<f32>,
    radius: f32,
    a: &Point3<f32>,
    b: &Point3<f32>,
) -> Option<TriangleHit> {
    let edge = b - a;
    let m = start - a;
    let ee = edge.dot(&edge);
    if ee <= f32::MIN_POSITIVE {
        return None;
    }
    let ed = edge.dot(direction);
    let em = edge.dot(&m);
    let qa = ee * direction.dot(direction) - ed * ed;
    let qb = ee * m.dot(direction) - em * ed;
    let qc = ee * (m.dot(&m) - radius * radius) - em * em;

    let t = if qc < 0.0 {
        0.0
    } else {
        if qa.abs() < PARALLEL_EPSILON {
            return None;
        }
        let discriminant = qb * qb - qa * qc;
        if discriminant < 0.0 {
            return None;
        }
        (-qb - discriminant.sqrt()) / qa
    };
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let s = (em + t * ed) / ee;
    if !(0.0..=1.0).contains(&s) {
        return None;
    }
    let center = start + direction * t;
    let contact = a + edge * s;
    Some(TriangleHit {
        t,
        position: contact,
        normal: (center - contact).try_normalize(f32::MIN_POSITIVE)?,
        feature: HitFeature::Edge,
    })
}

fn sweep_vertex(
    start: &Point3<f32>,
    direction: &Vector3<f32>,
    radius: f32,
    vertex: &Point3<f32>,
) -> Option<TriangleHit> {
    let m = start - vertex;
    let qa = direction.dot(direction);
    let qb = m.dot(direction);
    let qc = m.dot(&m) - radius * radius;

    let t = if qc < 0.0 {
        0.0
    } else {
        if qa < PARALLEL_EPSILON {
            return None;
        }
        let discriminant = qb * qb - qa * qc;
        if discriminant < 0.0 {
            return None;
        }
        (-qb - discriminant.sqrt()) / qa
    };
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let center = start + direction * t;
    Some(TriangleHit {
        t,
        position: *vertex,
        normal: (center - vertex).try_normalize(f32::MIN_POSITIVE)?,
        feature: HitFeature::Vertex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor() -> [Point3<f32>; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn test_segment_hits_from_either_side() {
        let down = segment_triangle(&Point3::new(0.5, 0.5, 1.0), &Point3::new(0.5, 0.5, -1.0), &floor())
            .expect("segment crosses the triangle");
        assert_relative_eq!(down.t, 0.5);
        assert_relative_eq!(down.normal.z, 1.0);

        let up = segment_triangle(&Point3::new(0.5, 0.5, -1.0), &Point3::new(0.5, 0.5, 3.0), &floor())
            .expect("two-sided test");
        assert_relative_eq!(up.t, 0.25);
    }

    #[test]
    fn test_segment_misses_outside_and_short() {
        assert!(segment_triangle(&Point3::new(1.5, 1.5, 1.0), &Point3::new(1.5, 1.5, -1.0), &floor()).is_none());
        assert!(segment_triangle(&Point3::new(0.5, 0.5, 1.0), &Point3::new(0.5, 0.5, 0.5), &floor()).is_none());
    }

    #[test]
    fn test_sphere_face_contact() {
        let hit = sphere_sweep_triangle(&Point3::new(0.5, 0.5, 2.0), &Point3::new(0.5, 0.5, -2.0), 0.5, &floor())
            .expect("sphere lands on the face");
        assert_eq!(hit.feature, HitFeature::Face);
        // center reaches z = 0.5 after travelling 1.5 of 4 units
        assert_relative_eq!(hit.t, 0.375, epsilon = 1e-6);
        assert_relative_eq!(hit.position.z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(hit.normal.z, 1.0);
    }

    #[test]
    fn test_sphere_edge_contact() {
        // in-plane sweep along +y into the edge lying on the x axis
        let hit = sphere_sweep_triangle(&Point3::new(1.0, -2.0, 0.0), &Point3::new(1.0, 2.0, 0.0), 0.5, &floor())
            .expect("sphere meets the edge");
        assert_eq!(hit.feature, HitFeature::Edge);
        assert_relative_eq!(hit.t, 0.375, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_vertex_contact() {
        let hit = sphere_sweep_triangle(&Point3::new(-2.0, -2.0, 0.0), &Point3::new(0.0, 0.0, 0.0), 0.5, &floor())
            .expect("sphere meets the corner");
        assert_eq!(hit.feature, HitFeature::Vertex);
        assert_eq!(hit.position, Point3::origin());
        let travelled = 8.0f32.sqrt() * hit.t;
        assert_relative_eq!(travelled, 8.0f32.sqrt() - 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_sphere_already_touching() {
        let hit = sphere_sweep_triangle(&Point3::new(0.5, 0.5, 0.25), &Point3::new(0.5, 0.5, 3.0), 0.5, &floor())
            .expect("overlapping at start");
        assert_eq!(hit.t, 0.0);
    }

    #[test]
    fn test_sphere_passing_far_away() {
        assert!(
            sphere_sweep_triangle(&Point3::new(5.0, 5.0, 2.0), &Point3::new(5.0, 5.0, -2.0), 0.5, &floor())
                .is_none()
        );
    }
}
