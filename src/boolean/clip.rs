// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Clipping one operand's triangles against the other operand's volume and
//! collecting the surviving convex pieces into a polygon soup

use super::loops::{CoplanarBias, Plane, Solid};
use super::polygon::{
    barycentric, decompose_convex, dedup, intersect_convex, is_degenerate, signed_area, subtract_convex,
    PlaneBasis, Polygon,
};
use super::{BooleanOptions, TextureAlignment};
use crate::geometry::{unit_or_z, Color, Mesh, Triangle};
use nalgebra::{Point2, Point3, Vector3, Vector4};

/// Triangles of one operand, already expressed in the result's frame
pub(crate) struct ClipSource<'a> {
    pub mesh: &'a Mesh,
    /// Added to every local surface index in the output
    pub surface_offset: u32,
    /// Per local surface; missing entries mean natural texture coordinates
    pub alignments: &'a [TextureAlignment],
}

impl ClipSource<'_> {
    fn alignment(&self, surface: u32) -> TextureAlignment {
        self.alignments
            .get(surface as usize)
            .copied()
            .unwrap_or(TextureAlignment::Natural)
    }
}

/// Which optional attributes the output carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SoupLayout {
    pub normals: bool,
    pub colors: bool,
    pub texcoords0: bool,
    pub texcoords1: bool,
}

/// Unwelded output: every polygon owns its vertices
#[derive(Debug, Default)]
pub(crate) struct PolygonSoup {
    layout: SoupLayout,
    mesh: Mesh,
    dropped: usize,
}

impl PolygonSoup {
    pub(crate) fn new(layout: SoupLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub(crate) fn polygon_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub(crate) fn into_mesh(self) -> Mesh {
        if self.dropped > 0 {
            log::debug!("polygon soup: dropped {} degenerate polygons", self.dropped);
        }
        self.mesh
    }

    fn push_vertex(&mut self, vertex: SoupVertex) -> u32 {
        let index = self.mesh.vertex_count as u32;
        self.mesh.positions.push(vertex.position);
        if self.layout.normals {
            self.mesh.normals.push(vertex.normal);
        }
        if self.layout.colors {
            self.mesh.colors.push(vertex.color);
        }
        if self.layout.texcoords0 {
            self.mesh.texcoords0.push(vertex.texcoord0);
        }
        if self.layout.texcoords1 {
            self.mesh.texcoords1.push(vertex.texcoord1);
        }
        self.mesh.surface_indices.push(vertex.surface);
        self.mesh.vertex_count += 1;
        index
    }

    /// Fan-triangulate a convex polygon
    fn push_polygon(&mut self, vertices: Vec<SoupVertex>) {
        if vertices.len() < 3 {
            self.dropped += 1;
            return;
        }
        let indices: Vec<u32> = vertices.into_iter().map(|v| self.push_vertex(v)).collect();
        for k in 1..indices.len() - 1 {
            self.mesh
                .triangles
                .push(Triangle::new([indices[0], indices[k], indices[k + 1]]));
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SoupVertex {
    position: Point3<f32>,
    normal: Vector3<f32>,
    color: Color,
    texcoord0: Point2<f32>,
    texcoord1: Point2<f32>,
    surface: u32,
}

/// Clip every triangle of `source` against `volume`.
///
/// With more than one bias a piece must be inside the volume under every
/// bias, which drops faces lying on the volume's surface regardless of
/// which way they face.
pub(crate) fn clip_mesh(
    source: &ClipSource<'_>,
    volume: &Solid,
    biases: &[CoplanarBias],
    options: &BooleanOptions,
    soup: &mut PolygonSoup,
) {
    for triangle in &source.mesh.triangles {
        let points = source.mesh.triangle_positions(triangle).map(|p| p.cast::<f64>());
        let Some(plane) = Plane::through(&points) else {
            continue;
        };
        let basis = PlaneBasis::new(&plane.normal);
        let corners = points.map(|p| basis.project(&p));

        let mut region: Option<Vec<Polygon>> = None;
        for &bias in biases {
            let pieces = covered_region(volume, &plane, &basis, &points, &corners, bias, options);
            region = Some(match region {
                None => pieces,
                Some(previous) => intersect_sets(&previous, &pieces),
            });
        }

        for piece in region.unwrap_or_default() {
            let vertices = piece
                .iter()
                .map(|q| interpolate_vertex(source, triangle, &points, &corners, &plane.normal, q))
                .collect();
            soup.push_polygon(vertices);
        }
    }
}

/// Part of the triangle inside `volume`, as disjoint convex pieces in the
/// triangle's plane coordinates
fn covered_region(
    volume: &Solid,
    plane: &Plane,
    basis: &PlaneBasis,
    points: &[Point3<f64>; 3],
    corners: &[Point2<f64>; 3],
    bias: CoplanarBias,
    options: &BooleanOptions,
) -> Vec<Polygon> {
    let triangle: Polygon = corners.to_vec();
    let epsilon = f64::from(options.weld_epsilon);
    let loops = if volume.overlaps(points, epsilon) {
        volume.section_loops(plane, bias, epsilon, f64::from(options.collinear_cos))
    } else {
        Vec::new()
    };

    if loops.is_empty() {
        log::debug!(
            "clip: no section loops, triangle {}",
            if volume.unbounded { "kept" } else { "dropped" }
        );
        return if volume.unbounded { vec![triangle] } else { Vec::new() };
    }

    let mut outlines: Vec<(f64, Polygon)> = loops
        .iter()
        .filter_map(|section| {
            let mut outline: Polygon = section.iter().map(|p| basis.project(p)).collect();
            dedup(&mut outline);
            if is_degenerate(&outline) {
                return None;
            }
            Some((signed_area(&outline), outline))
        })
        .collect();
    // outer loops before the holes and islands nested in them
    outlines.sort_by(|a, b| b.0.abs().total_cmp(&a.0.abs()));

    let mut region = if volume.unbounded { vec![triangle.clone()] } else { Vec::new() };
    for (area, mut outline) in outlines {
        if area > 0.0 {
            for piece in decompose_convex(&outline) {
                region.extend(intersect_convex(&triangle, &piece));
            }
        } else {
            outline.reverse();
            for hole in decompose_convex(&outline) {
                region = region.iter().flat_map(|p| subtract_convex(p, &hole)).collect();
            }
        }
    }
    region
}

fn intersect_sets(a: &[Polygon], b: &[Polygon]) -> Vec<Polygon> {
    a.iter()
        .flat_map(|p| b.iter().filter_map(move |q| intersect_convex(p, q)))
        .collect()
}

/// Same value at all three corners is copied, anything else is blended
fn blend<T: Copy + PartialEq>(values: [T; 3], weights: &[f64; 3], mix: impl FnOnce([T; 3], &[f64; 3]) -> T) -> T {
    if values[0] == values[1] && values[1] == values[2] {
        values[0]
    } else {
        mix(values, weights)
    }
}

fn mix_point2(values: [Point2<f32>; 3], weights: &[f64; 3]) -> Point2<f32> {
    let mut sum = nalgebra::Vector2::<f64>::zeros();
    for (value, weight) in values.iter().zip(weights) {
        sum += value.coords.cast::<f64>() * *weight;
    }
    Point2::from(sum.cast::<f32>())
}

fn mix_color(values: [Color; 3], weights: &[f64; 3]) -> Color {
    let mut channels = [0u8; 4];
    for (c, channel) in channels.iter_mut().enumerate() {
        let sum: f64 = values
            .iter()
            .zip(weights)
            .map(|(value, weight)| f64::from(value.0[c]) * weight)
            .sum();
        *channel = sum.round().clamp(0.0, 255.0) as u8;
    }
    Color(channels)
}

fn planar_coordinate(plane: &Vector4<f32>, position: &Point3<f32>) -> f32 {
    plane.x * position.x + plane.y * position.y + plane.z * position.z + plane.w
}

fn interpolate_vertex(
    source: &ClipSource<'_>,
    triangle: &Triangle,
    points: &[Point3<f64>; 3],
    corners: &[Point2<f64>; 3],
    face_normal: &Vector3<f64>,
    at: &Point2<f64>,
) -> SoupVertex {
    let mesh = source.mesh;
    let indices = triangle.indices.map(|i| i as usize);
    let weights = barycentric(corners, at);

    let position = Point3::from(
        (points[0].coords * weights[0] + points[1].coords * weights[1] + points[2].coords * weights[2])
            .cast::<f32>(),
    );

    let normal = if mesh.normals.is_empty() {
        face_normal.cast::<f32>()
    } else {
        blend(indices.map(|i| mesh.normals[i]), &weights, |n, w| {
            unit_or_z(n[0] * w[0] as f32 + n[1] * w[1] as f32 + n[2] * w[2] as f32)
        })
    };

    let color = if mesh.colors.is_empty() {
        Color::WHITE
    } else {
        blend(indices.map(|i| mesh.colors[i]), &weights, mix_color)
    };

    let local_surface = mesh.surface_of(indices[0]);
    let texcoord0 = match source.alignment(local_surface) {
        TextureAlignment::Planar { s, t } => {
            Point2::new(planar_coordinate(&s, &position), planar_coordinate(&t, &position))
        }
        TextureAlignment::Natural if mesh.texcoords0.is_empty() => Point2::origin(),
        TextureAlignment::Natural => blend(indices.map(|i| mesh.texcoords0[i]), &weights, mix_point2),
    };
    let texcoord1 = if mesh.texcoords1.is_empty() {
        Point2::origin()
    } else {
        blend(indices.map(|i| mesh.texcoords1[i]), &weights, mix_point2)
    };

    SoupVertex {
        position,
        normal,
        color,
        texcoord0,
        texcoord1,
        surface: local_surface + source.surface_offset,
    }
}
