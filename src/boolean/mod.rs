// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operations on closed meshes.
//!
//! Each triangle of one operand is cut by the plane sections of the other
//! operand's volume: the section loops of the volume in the triangle's plane
//! are split into convex pieces and the triangle is intersected with or
//! reduced by them. The surviving pieces of both operands form a polygon
//! soup which is welded, unified and simplified into the result mesh.

mod clip;
mod loops;
mod polygon;

use crate::geometry::{ArrayMask, Mesh};
use crate::topology::TopologyGraph;
use clip::{clip_mesh, ClipSource, PolygonSoup, SoupLayout};
use loops::{CoplanarBias, Solid};
use nalgebra::{Matrix3, Matrix4, Vector4};
use serde::{Deserialize, Serialize};

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Intersection,
    Subtract,
}

/// How a surface gets its primary texture coordinates in the result
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TextureAlignment {
    /// Interpolated from the source triangle
    #[default]
    Natural,
    /// `u = s · [p, 1]`, `v = t · [p, 1]` in the operand's local frame
    Planar { s: Vector4<f32>, t: Vector4<f32> },
}

/// Material and texturing of one surface
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceInfo {
    pub material_index: u32,
    pub alignment: TextureAlignment,
}

/// One input of a boolean operation
#[derive(Debug, Clone, Copy)]
pub struct BooleanOperand<'a> {
    pub mesh: &'a Mesh,
    /// Local to world transform
    pub transform: Matrix4<f32>,
    /// Indexed by the mesh's surface indices; empty means one default surface
    pub surfaces: &'a [SurfaceInfo],
}

impl<'a> BooleanOperand<'a> {
    pub fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            transform: Matrix4::identity(),
            surfaces: &[],
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_surfaces(mut self, surfaces: &'a [SurfaceInfo]) -> Self {
        self.surfaces = surfaces;
        self
    }

    fn surface_count(&self) -> usize {
        let used = self
            .mesh
            .surface_indices
            .iter()
            .max()
            .map_or(1, |&max| max as usize + 1);
        used.max(self.surfaces.len())
    }

    fn surface(&self, index: usize) -> SurfaceInfo {
        self.surfaces.get(index).copied().unwrap_or_default()
    }
}

/// Tolerances of the boolean pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanOptions {
    /// Distance under which section points and result vertices are merged
    pub weld_epsilon: f32,
    /// Section loop vertices with a straighter turn than this are removed
    pub collinear_cos: f32,
    /// Straighten collinear boundary vertices of the result
    pub simplify_boundaries: bool,
    pub normal_epsilon: f32,
    pub texcoord_epsilon: f32,
}

impl Default for BooleanOptions {
    fn default() -> Self {
        Self {
            weld_epsilon: 1e-4,
            collinear_cos: 0.9999,
            simplify_boundaries: true,
            normal_epsilon: 1e-3,
            texcoord_epsilon: 1e-4,
        }
    }
}

/// Result mesh in the first operand's frame plus its surface table: the
/// first operand's surfaces followed by the second operand's
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanResult {
    pub mesh: Mesh,
    pub surfaces: Vec<SurfaceInfo>,
}

impl BooleanResult {
    pub fn materials(&self) -> Vec<u32> {
        self.surfaces.iter().map(|s| s.material_index).collect()
    }
}

/// Transform taking the second operand's local frame into the first's
fn relative_transform(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
    match a.try_inverse() {
        Some(inverse) => inverse * b,
        None => {
            log::warn!("boolean: first operand transform is singular, using identity");
            *b
        }
    }
}

/// Express a planar alignment of the second operand in the first's frame
fn reexpress(alignment: TextureAlignment, frame: &Matrix4<f32>) -> TextureAlignment {
    match alignment {
        TextureAlignment::Planar { s, t } => match frame.try_inverse() {
            Some(inverse) => {
                let planes = inverse.transpose();
                TextureAlignment::Planar {
                    s: planes * s,
                    t: planes * t,
                }
            }
            None => alignment,
        },
        TextureAlignment::Natural => alignment,
    }
}

/// Combine two closed meshes.
///
/// The result lives in `a`'s local frame. Faces shared by both operands
/// appear once for union and intersection; subtraction removes them.
pub fn boolean(
    a: &BooleanOperand<'_>,
    b: &BooleanOperand<'_>,
    op: BooleanOp,
    options: &BooleanOptions,
) -> BooleanResult {
    let frame = relative_transform(&a.transform, &b.transform);

    let mut first = Mesh::new();
    first.copy_rigid_mesh(a.mesh, ArrayMask::TANGENT | ArrayMask::SEGMENT);
    let mut second = Mesh::new();
    second.copy_rigid_mesh(b.mesh, ArrayMask::TANGENT | ArrayMask::SEGMENT);
    second.transform_mesh(&frame);
    let linear: Matrix3<f32> = frame.fixed_view::<3, 3>(0, 0).into_owned();
    if linear.determinant() < 0.0 {
        for triangle in &mut second.triangles {
            *triangle = triangle.flipped();
        }
    }
    if op == BooleanOp::Subtract {
        second.invert_mesh();
    }

    let first_count = a.surface_count();
    let second_count = b.surface_count();
    let mut surfaces: Vec<SurfaceInfo> = (0..first_count).map(|i| a.surface(i)).collect();
    surfaces.extend((0..second_count).map(|i| {
        let info = b.surface(i);
        SurfaceInfo {
            alignment: reexpress(info.alignment, &frame),
            ..info
        }
    }));
    let first_alignments: Vec<TextureAlignment> = surfaces[..first_count].iter().map(|s| s.alignment).collect();
    let second_alignments: Vec<TextureAlignment> = surfaces[first_count..].iter().map(|s| s.alignment).collect();

    let had_normals = !first.normals.is_empty() || !second.normals.is_empty();
    let had_tangents = !a.mesh.tangents.is_empty() || !b.mesh.tangents.is_empty();
    let layout = SoupLayout {
        normals: had_normals,
        colors: !first.colors.is_empty() || !second.colors.is_empty(),
        texcoords0: !first.texcoords0.is_empty()
            || !second.texcoords0.is_empty()
            || surfaces.iter().any(|s| matches!(s.alignment, TextureAlignment::Planar { .. })),
        texcoords1: !first.texcoords1.is_empty() || !second.texcoords1.is_empty(),
    };

    // union keeps what lies outside the other operand
    let outside = op == BooleanOp::Union;
    let volume_a = Solid::from_mesh(&first, outside);
    let volume_b = Solid::from_mesh(&second, outside);
    let first_biases: &[CoplanarBias] = if outside {
        &[CoplanarBias::Above]
    } else {
        &[CoplanarBias::Below]
    };
    let second_biases = &[CoplanarBias::Below, CoplanarBias::Above];

    let mut soup = PolygonSoup::new(layout);
    let first_source = ClipSource {
        mesh: &first,
        surface_offset: 0,
        alignments: &first_alignments,
    };
    clip_mesh(&first_source, &volume_b, first_biases, options, &mut soup);
    let second_source = ClipSource {
        mesh: &second,
        surface_offset: first_count as u32,
        alignments: &second_alignments,
    };
    clip_mesh(&second_source, &volume_a, second_biases, options, &mut soup);
    log::debug!("boolean {:?}: {} triangles before consolidation", op, soup.polygon_count());

    let mut mesh = soup.into_mesh();
    mesh.weld_mesh(options.weld_epsilon);
    mesh.mend_mesh(options.weld_epsilon, options.normal_epsilon, options.texcoord_epsilon);
    let mut mesh = Mesh::unify_mesh(&mesh);

    if options.simplify_boundaries {
        let mut graph = TopologyGraph::build(&mesh);
        graph.simplify_boundary_edges();
        if graph.collapse_count() > 0 {
            mesh = graph.compact_mesh().rebuild(&mesh);
        }
    }
    if !had_normals {
        mesh.build_normal_array();
    }
    if had_tangents {
        mesh.build_tangent_array();
    }
    let materials: Vec<u32> = surfaces.iter().map(|s| s.material_index).collect();
    mesh.build_segment_array(&materials);

    BooleanResult { mesh, surfaces }
}

/// Run one boolean per detail level.
///
/// Levels are paired by index; the shorter list repeats its last level.
pub fn boolean_levels(
    a_levels: &[BooleanOperand<'_>],
    b_levels: &[BooleanOperand<'_>],
    op: BooleanOp,
    options: &BooleanOptions,
) -> Vec<BooleanResult> {
    if a_levels.is_empty() || b_levels.is_empty() {
        return Vec::new();
    }
    let levels = a_levels.len().max(b_levels.len());
    (0..levels)
        .map(|level| {
            let a = &a_levels[level.min(a_levels.len() - 1)];
            let b = &b_levels[level.min(b_levels.len() - 1)];
            boolean(a, b, op, options)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_cube() -> Mesh {
        Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh()
    }

    fn shifted_cube(x: f32) -> Mesh {
        let mut cube = unit_cube();
        cube.translate_mesh(&Vector3::new(x, 0.0, 0.0));
        cube
    }

    fn run(op: BooleanOp, shift: f32) -> BooleanResult {
        let a = unit_cube();
        let b = shifted_cube(shift);
        boolean(
            &BooleanOperand::new(&a),
            &BooleanOperand::new(&b),
            op,
            &BooleanOptions::default(),
        )
    }

    #[test]
    fn test_union_of_overlapping_cubes() {
        let result = run(BooleanOp::Union, 0.5);
        assert_relative_eq!(result.mesh.calculate_volume(), 1.5, epsilon = 1e-3);
        assert!(result.mesh.validate().is_ok());
        let bbox = result.mesh.bounding_box();
        assert_relative_eq!(bbox.max.x, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_intersection_of_overlapping_cubes() {
        let result = run(BooleanOp::Intersection, 0.5);
        assert_relative_eq!(result.mesh.calculate_volume(), 0.5, epsilon = 1e-3);
        let bbox = result.mesh.bounding_box();
        assert_relative_eq!(bbox.min.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(bbox.max.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_subtract_overlapping_cubes() {
        let result = run(BooleanOp::Subtract, 0.5);
        assert_relative_eq!(result.mesh.calculate_volume(), 0.5, epsilon = 1e-3);
        let bbox = result.mesh.bounding_box();
        assert_relative_eq!(bbox.max.x, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_disjoint_operands() {
        let union = run(BooleanOp::Union, 3.0);
        assert_relative_eq!(union.mesh.calculate_volume(), 2.0, epsilon = 1e-4);
        assert_eq!(union.surfaces.len(), 2);

        let intersection = run(BooleanOp::Intersection, 3.0);
        assert_eq!(intersection.mesh.triangle_count(), 0);

        let difference = run(BooleanOp::Subtract, 3.0);
        assert_relative_eq!(difference.mesh.calculate_volume(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_touching_cubes_merge_without_inner_faces() {
        let result = run(BooleanOp::Union, 1.0);
        assert_relative_eq!(result.mesh.calculate_volume(), 2.0, epsilon = 1e-3);
        // nothing of the shared wall survives inside the union
        let inner = result
            .mesh
            .triangles
            .iter()
            .filter(|t| result.mesh.triangle_positions(t).iter().all(|p| (p.x - 1.0).abs() < 1e-4))
            .count();
        assert_eq!(inner, 0);
    }

    #[test]
    fn test_second_operand_transform() {
        let a = unit_cube();
        let b = unit_cube();
        let result = boolean(
            &BooleanOperand::new(&a),
            &BooleanOperand::new(&b).with_transform(Matrix4::new_translation(&Vector3::new(0.5, 0.0, 0.0))),
            BooleanOp::Union,
            &BooleanOptions::default(),
        );
        assert_relative_eq!(result.mesh.calculate_volume(), 1.5, epsilon = 1e-3);
    }

    #[test]
    fn test_surfaces_and_materials() {
        let a = unit_cube();
        let b = shifted_cube(0.5);
        let a_surfaces = [SurfaceInfo {
            material_index: 7,
            ..SurfaceInfo::default()
        }];
        let b_surfaces = [SurfaceInfo {
            material_index: 2,
            alignment: TextureAlignment::Planar {
                s: Vector4::new(1.0, 0.0, 0.0, 0.0),
                t: Vector4::new(0.0, 1.0, 0.0, 0.0),
            },
        }];
        let result = boolean(
            &BooleanOperand::new(&a).with_surfaces(&a_surfaces),
            &BooleanOperand::new(&b)
                .with_surfaces(&b_surfaces)
                .with_transform(Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0))),
            BooleanOp::Union,
            &BooleanOptions::default(),
        );

        assert_eq!(result.materials(), vec![7, 2]);
        match result.surfaces[1].alignment {
            TextureAlignment::Planar { s, .. } => {
                assert_relative_eq!(s, Vector4::new(1.0, 0.0, 0.0, -1.0), epsilon = 1e-6);
            }
            TextureAlignment::Natural => panic!("alignment lost"),
        }
        // two materials give two draw segments, sorted by material
        assert_eq!(result.mesh.segments.len(), 2);
        assert_eq!(result.mesh.segments[0].material_index, 2);
    }

    #[test]
    fn test_levels_repeat_last() {
        let a = unit_cube();
        let coarse = unit_cube();
        let b = shifted_cube(0.5);
        let a_levels = [BooleanOperand::new(&a), BooleanOperand::new(&coarse)];
        let b_levels = [BooleanOperand::new(&b)];

        let results = boolean_levels(&a_levels, &b_levels, BooleanOp::Union, &BooleanOptions::default());
        assert_eq!(results.len(), 2);
        for result in &results {
            assert_relative_eq!(result.mesh.calculate_volume(), 1.5, epsilon = 1e-3);
        }
        assert!(boolean_levels(&[], &b_levels, BooleanOp::Union, &BooleanOptions::default()).is_empty());
    }
}
