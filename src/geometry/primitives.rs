// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator

use super::{ArrayDescriptor, ArrayId, Mesh, Triangle};
use nalgebra::{Point2, Point3, Vector3};
use std::f32::consts::PI;

/// Geometric primitives
pub enum Primitive {
    Cube { size: Vector3<f32>, center: bool },
    Quad { size: f32 },
    Grid { cells: u32, size: f32 },
    Sphere { r: f32, segments: u32 },
}

impl Primitive {
    pub fn cube(size: Vector3<f32>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    /// Square in the XY plane facing +Z
    pub fn quad(size: f32) -> Self {
        Self::Quad { size }
    }

    /// Subdivided square in the XY plane facing +Z
    pub fn grid(cells: u32, size: f32) -> Self {
        Self::Grid {
            cells: cells.max(1),
            size,
        }
    }

    pub fn sphere(r: f32, segments: u32) -> Self {
        let segments = if segments > 2 { segments } else { 16 };
        Self::Sphere { r, segments }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cube { size, center } => generate_cube_mesh(*size, *center),
            Self::Quad { size } => generate_grid_mesh(1, *size),
            Self::Grid { cells, size } => generate_grid_mesh(*cells, *size),
            Self::Sphere { r, segments } => generate_sphere_mesh(*r, *segments),
        }
    }
}

fn surface_mesh(vertex_count: usize, triangle_count: usize) -> Mesh {
    Mesh::with_arrays(
        vertex_count,
        &[
            ArrayDescriptor::new(ArrayId::Position, vertex_count),
            ArrayDescriptor::new(ArrayId::Normal, vertex_count),
            ArrayDescriptor::new(ArrayId::Texcoord0, vertex_count),
            ArrayDescriptor::new(ArrayId::SurfaceIndex, vertex_count),
            ArrayDescriptor::new(ArrayId::Triangle, triangle_count),
        ],
    )
}

fn generate_cube_mesh(size: Vector3<f32>, center: bool) -> Mesh {
    let min = if center { -size / 2.0 } else { Vector3::zeros() };
    let max = min + size;
    let corner = |x: bool, y: bool, z: bool| {
        Point3::new(
            if x { max.x } else { min.x },
            if y { max.y } else { min.y },
            if z { max.z } else { min.z },
        )
    };

    // 4 corners per face, counter-clockwise seen from outside
    let faces = [
        (
            [corner(true, false, false), corner(true, true, false), corner(true, true, true), corner(true, false, true)],
            Vector3::x(),
        ),
        (
            [corner(false, false, false), corner(false, false, true), corner(false, true, true), corner(false, true, false)],
            -Vector3::x(),
        ),
        (
            [corner(false, true, false), corner(false, true, true), corner(true, true, true), corner(true, true, false)],
            Vector3::y(),
        ),
        (
            [corner(false, false, false), corner(true, false, false), corner(true, false, true), corner(false, false, true)],
            -Vector3::y(),
        ),
        (
            [corner(false, false, true), corner(true, false, true), corner(true, true, true), corner(false, true, true)],
            Vector3::z(),
        ),
        (
            [corner(false, false, false), corner(false, true, false), corner(true, true, false), corner(true, false, false)],
            -Vector3::z(),
        ),
    ];
    let uvs = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];

    let mut mesh = surface_mesh(24, 12);
    for (f, (corners, normal)) in faces.iter().enumerate() {
        let base = f * 4;
        for k in 0..4 {
            mesh.positions[base + k] = corners[k];
            mesh.normals[base + k] = *normal;
            mesh.texcoords0[base + k] = uvs[k];
        }
        let b = base as u32;
        mesh.triangles[f * 2] = Triangle::new([b, b + 1, b + 2]);
        mesh.triangles[f * 2 + 1] = Triangle::new([b, b + 2, b + 3]);
    }
    mesh
}

fn generate_grid_mesh(cells: u32, size: f32) -> Mesh {
    let row = cells as usize + 1;
    let mut mesh = surface_mesh(row * row, (cells * cells * 2) as usize);
    let step = size / cells as f32;

    for j in 0..row {
        for i in 0..row {
            let v = j * row + i;
            mesh.positions[v] = Point3::new(i as f32 * step, j as f32 * step, 0.0);
            mesh.normals[v] = Vector3::z();
            mesh.texcoords0[v] = Point2::new(i as f32 / cells as f32, j as f32 / cells as f32);
        }
    }

    let mut t = 0;
    for j in 0..cells as usize {
        for i in 0..cells as usize {
            let a = (j * row + i) as u32;
            let b = a + 1;
            let c = a + row as u32 + 1;
            let d = a + row as u32;
            mesh.triangles[t] = Triangle::new([a, b, c]);
            mesh.triangles[t + 1] = Triangle::new([a, c, d]);
            t += 2;
        }
    }
    mesh
}

fn generate_sphere_mesh(radius: f32, segments: u32) -> Mesh {
    let stacks = segments as usize;
    let slices = segments as usize;
    let mut mesh = surface_mesh((stacks + 1) * (slices + 1), stacks * slices * 2);

    for i in 0..=stacks {
        let phi = PI * i as f32 / stacks as f32;
        for j in 0..=slices {
            let theta = 2.0 * PI * j as f32 / slices as f32;
            let normal = Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            let v = i * (slices + 1) + j;
            mesh.positions[v] = Point3::from(normal * radius);
            mesh.normals[v] = normal;
            mesh.texcoords0[v] = Point2::new(j as f32 / slices as f32, i as f32 / stacks as f32);
        }
    }

    let mut t = 0;
    for i in 0..stacks {
        for j in 0..slices {
            let first = (i * (slices + 1) + j) as u32;
            let second = first + slices as u32 + 1;
            mesh.triangles[t] = Triangle::new([first, first + 1, second]);
            mesh.triangles[t + 1] = Triangle::new([second, first + 1, second + 1]);
            t += 2;
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_generation() {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), false).to_mesh();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_cube_winding_matches_normals() {
        let mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        for triangle in &mesh.triangles {
            let [a, b, c] = mesh.triangle_positions(triangle);
            let face = (b - a).cross(&(c - a)).normalize();
            let stored = mesh.normals[triangle.indices[0] as usize];
            assert_relative_eq!(face.dot(&stored), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_grid_counts() {
        let mesh = Primitive::grid(4, 1.0).to_mesh();
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.triangle_count(), 32);
    }

    #[test]
    fn test_sphere_winds_outward() {
        let mesh = Primitive::sphere(1.0, 12).to_mesh();
        assert!(mesh.calculate_volume() > 3.0);
    }
}
