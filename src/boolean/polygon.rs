// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar polygon kernel: projection, convex decomposition and convex
//! clipping, all in f64

use nalgebra::{Point2, Point3, Vector3};

pub(crate) type Polygon = Vec<Point2<f64>>;

/// Distance below which a point counts as lying on a line
const SIDE_EPSILON: f64 = 1e-9;
/// Polygons with less area than this are dropped
const AREA_EPSILON: f64 = 1e-12;

/// Orthonormal in-plane basis with `u × v = normal`, so counter-clockwise
/// around the normal in 3D stays counter-clockwise in 2D
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaneBasis {
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl PlaneBasis {
    pub(crate) fn new(normal: &Vector3<f64>) -> Self {
        let axis = if normal.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        let u = (axis - normal * normal.dot(&axis)).normalize();
        let v = normal.cross(&u);
        Self { u, v }
    }

    pub(crate) fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        Point2::new(point.coords.dot(&self.u), point.coords.dot(&self.v))
    }
}

/// Twice the signed area of triangle `o a b`
pub(crate) fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - o).perp(&(b - o))
}

/// Signed area, positive for counter-clockwise winding
pub(crate) fn signed_area(polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|i| polygon[i].coords.perp(&polygon[(i + 1) % n].coords))
        .sum::<f64>()
        * 0.5
}

pub(crate) fn is_degenerate(polygon: &[Point2<f64>]) -> bool {
    polygon.len() < 3 || signed_area(polygon).abs() <= AREA_EPSILON
}

/// Signed distance of `p` from the directed line `a -> b`, positive on the left
fn side(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> f64 {
    let edge = b - a;
    let length = edge.norm();
    if length <= f64::MIN_POSITIVE {
        return 0.0;
    }
    edge.perp(&(p - a)) / length
}

/// Turn at `b` on the way `a -> b -> c`, normalized by the edge lengths
fn turn(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    let d1 = b - a;
    let d2 = c - b;
    let lengths = d1.norm() * d2.norm();
    if lengths <= f64::MIN_POSITIVE {
        return 0.0;
    }
    d1.perp(&d2) / lengths
}

fn is_reflex(polygon: &[Point2<f64>], i: usize) -> bool {
    let n = polygon.len();
    turn(&polygon[(i + n - 1) % n], &polygon[i], &polygon[(i + 1) % n]) < -SIDE_EPSILON
}

fn is_convex(polygon: &[Point2<f64>]) -> bool {
    (0..polygon.len()).all(|i| !is_reflex(polygon, i))
}

/// Point inside or on the boundary of a counter-clockwise convex polygon
fn contains_or_touches(convex: &[Point2<f64>], point: &Point2<f64>) -> bool {
    let n = convex.len();
    (0..n).all(|i| side(&convex[i], &convex[(i + 1) % n], point) >= -SIDE_EPSILON)
}

/// Drop repeated vertices
pub(crate) fn dedup(polygon: &mut Polygon) {
    polygon.dedup_by(|a, b| (*a - *b).norm() <= SIDE_EPSILON);
    while polygon.len() > 1 && (polygon[0] - polygon[polygon.len() - 1]).norm() <= SIDE_EPSILON {
        polygon.pop();
    }
}

/// Split a simple counter-clockwise polygon into convex pieces.
///
/// Walks to the first reflex vertex and grows a window of following
/// vertices for as long as the window stays convex and no other vertex lies
/// inside it; the window is cut off along its closing diagonal and the
/// remainder is decomposed recursively. When no window of three vertices
/// works an ear is clipped instead.
pub(crate) fn decompose_convex(polygon: &[Point2<f64>]) -> Vec<Polygon> {
    let mut pieces = Vec::new();
    let mut remaining: Polygon = polygon.to_vec();

    loop {
        dedup(&mut remaining);
        if is_degenerate(&remaining) {
            break;
        }
        if is_convex(&remaining) {
            pieces.push(remaining);
            break;
        }
        let n = remaining.len();
        let Some(reflex) = (0..n).find(|&i| is_reflex(&remaining, i)) else {
            break;
        };

        match grow_window(&remaining, reflex) {
            Some(length) => {
                let piece: Polygon = (0..length).map(|k| remaining[(reflex + k) % n]).collect();
                // keep the window's end points, drop the vertices strictly inside it
                let rest: Polygon = (length - 1..=n)
                    .map(|k| remaining[(reflex + k) % n])
                    .collect();
                if !is_degenerate(&piece) {
                    pieces.push(piece);
                }
                remaining = rest;
            }
            None => match clip_ear(&remaining) {
                Some((ear, rest)) => {
                    pieces.push(ear);
                    remaining = rest;
                }
                None => {
                    log::debug!("convex decomposition found no ear in a {}-gon, dropping it", n);
                    break;
                }
            },
        }
    }
    pieces
}

/// Longest convex window starting at `start` that holds no other vertex
fn grow_window(polygon: &[Point2<f64>], start: usize) -> Option<usize> {
    let n = polygon.len();
    let mut best = None;
    for length in 3..n {
        let window: Polygon = (0..length).map(|k| polygon[(start + k) % n]).collect();
        if !is_convex(&window) || signed_area(&window) <= AREA_EPSILON {
            break;
        }
        let blocked = (length..n).any(|k| {
            let candidate = &polygon[(start + k) % n];
            // coincident copies of the window's end points do not block it
            window
                .iter()
                .all(|w| (w - candidate).norm() > SIDE_EPSILON)
                && contains_or_touches(&window, candidate)
        });
        if blocked {
            break;
        }
        best = Some(length);
    }
    best
}

fn clip_ear(polygon: &[Point2<f64>]) -> Option<(Polygon, Polygon)> {
    let n = polygon.len();
    for i in 0..n {
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        if turn(&polygon[prev], &polygon[i], &polygon[next]) <= SIDE_EPSILON {
            continue;
        }
        let ear = vec![polygon[prev], polygon[i], polygon[next]];
        let blocked = (0..n)
            .filter(|&k| k != prev && k != i && k != next)
            .any(|k| contains_or_touches(&ear, &polygon[k]));
        if !blocked {
            let rest = (0..n).filter(|&k| k != i).map(|k| polygon[k]).collect();
            return Some((ear, rest));
        }
    }
    None
}

/// Split a convex polygon by the directed line `a -> b` into its left
/// (inside) and right (outside) parts
fn split(polygon: &[Point2<f64>], a: &Point2<f64>, b: &Point2<f64>) -> (Polygon, Polygon) {
    let mut left = Vec::with_capacity(polygon.len() + 1);
    let mut right = Vec::with_capacity(polygon.len() + 1);
    let n = polygon.len();
    for i in 0..n {
        let p = polygon[i];
        let q = polygon[(i + 1) % n];
        let sp = side(a, b, &p);
        let sq = side(a, b, &q);
        if sp >= -SIDE_EPSILON {
            left.push(p);
        }
        if sp <= SIDE_EPSILON {
            right.push(p);
        }
        let crosses = (sp > SIDE_EPSILON && sq < -SIDE_EPSILON) || (sp < -SIDE_EPSILON && sq > SIDE_EPSILON);
        if crosses {
            let t = sp / (sp - sq);
            let x = p + (q - p) * t;
            left.push(x);
            right.push(x);
        }
    }
    (left, right)
}

/// Intersection of two counter-clockwise convex polygons
pub(crate) fn intersect_convex(subject: &[Point2<f64>], clip: &[Point2<f64>]) -> Option<Polygon> {
    let mut result: Polygon = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        result = split(&result, &clip[i], &clip[(i + 1) % n]).0;
        if result.len() < 3 {
            return None;
        }
    }
    dedup(&mut result);
    (!is_degenerate(&result)).then_some(result)
}

/// `subject` minus `clip`, as disjoint convex pieces
pub(crate) fn subtract_convex(subject: &[Point2<f64>], clip: &[Point2<f64>]) -> Vec<Polygon> {
    let mut pieces = Vec::new();
    let mut inside: Polygon = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        let (left, mut right) = split(&inside, &clip[i], &clip[(i + 1) % n]);
        dedup(&mut right);
        if !is_degenerate(&right) {
            pieces.push(right);
        }
        inside = left;
        if is_degenerate(&inside) {
            break;
        }
    }
    pieces
}

/// Barycentric coordinates of `p` in triangle `t`
pub(crate) fn barycentric(t: &[Point2<f64>; 3], p: &Point2<f64>) -> [f64; 3] {
    let area = cross(&t[0], &t[1], &t[2]);
    if area.abs() <= f64::MIN_POSITIVE {
        return [1.0, 0.0, 0.0];
    }
    [
        cross(p, &t[1], &t[2]) / area,
        cross(&t[0], p, &t[2]) / area,
        cross(&t[0], &t[1], p) / area,
    ]
}
