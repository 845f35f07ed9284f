// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::Mesh;
use ahash::AHashMap;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Geometry statistics and analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Signed volume; negative for inward winding
    pub volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub segment_count: usize,
    /// Every positional edge is shared by exactly two triangles
    pub is_watertight: bool,
    /// No positional edge is shared by more than two triangles
    pub is_manifold: bool,
}

impl GeometryStats {
    /// Create empty stats
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            vertex_count: 0,
            triangle_count: 0,
            segment_count: 0,
            is_watertight: false,
            is_manifold: true,
        }
    }

    /// Pretty print statistics
    pub fn print(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              MESH ANALYTICS                              ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Volume:          {:>12.4}                            ║", self.volume);
        println!("║ Surface Area:    {:>12.4}                            ║", self.surface_area);
        println!("║                                                          ║");
        println!("║ Bounding Box:                                            ║");
        println!(
            "║   Min: ({:>9.3}, {:>9.3}, {:>9.3})                  ║",
            self.bbox[0], self.bbox[1], self.bbox[2]
        );
        println!(
            "║   Max: ({:>9.3}, {:>9.3}, {:>9.3})                  ║",
            self.bbox[3], self.bbox[4], self.bbox[5]
        );
        println!("║                                                          ║");
        println!("║ Vertices:        {:>12}                            ║", self.vertex_count);
        println!("║ Triangles:       {:>12}                            ║", self.triangle_count);
        println!("║ Segments:        {:>12}                            ║", self.segment_count);
        println!(
            "║ Watertight:      {:>12}                            ║",
            if self.is_watertight { "Yes" } else { "No" }
        );
        println!(
            "║ Manifold:        {:>12}                            ║",
            if self.is_manifold { "Yes" } else { "No" }
        );
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    if mesh.vertex_count() == 0 || mesh.triangle_count() == 0 {
        return GeometryStats::empty();
    }

    let bounds = mesh.bounding_box();
    let counts = positional_edge_counts(mesh);

    GeometryStats {
        volume: mesh.calculate_volume(),
        surface_area: calculate_surface_area(mesh),
        bbox: [
            bounds.min.x as f64,
            bounds.min.y as f64,
            bounds.min.z as f64,
            bounds.max.x as f64,
            bounds.max.y as f64,
            bounds.max.z as f64,
        ],
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        segment_count: mesh.segments.len(),
        is_watertight: counts.values().all(|&count| count == 2),
        is_manifold: counts.values().all(|&count| count <= 2),
    }
}

impl Mesh {
    /// Signed volume via the divergence theorem.
    ///
    /// Sum of `p1 · (p2 × p3) / 6` over all triangles, accumulated in f64.
    /// Positive for outward winding.
    pub fn calculate_volume(&self) -> f64 {
        let mut volume = 0.0;
        for triangle in &self.triangles {
            let [a, b, c] = self.triangle_positions(triangle).map(|p| p.cast::<f64>());
            volume += a.coords.dot(&b.coords.cross(&c.coords));
        }
        volume / 6.0
    }
}

/// Calculate total surface area
pub fn calculate_surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|triangle| {
            let [a, b, c] = mesh.triangle_positions(triangle).map(|p| p.cast::<f64>());
            (b - a).cross(&(c - a)).norm() / 2.0
        })
        .sum()
}

type PositionKey = [u32; 3];

fn position_key(p: &Point3<f32>) -> PositionKey {
    // +0.0 and -0.0 must land on the same key
    [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits)
}

/// Count undirected edges by endpoint position, so face-split meshes
/// (cubes with per-face vertices) still connect across their seams
fn positional_edge_counts(mesh: &Mesh) -> AHashMap<(PositionKey, PositionKey), u32> {
    let mut edge_counts = AHashMap::new();
    for triangle in &mesh.triangles {
        let keys = mesh.triangle_positions(triangle).map(|p| position_key(&p));
        for i in 0..3 {
            let (a, b) = (keys[i], keys[(i + 1) % 3]);
            let edge = if a < b { (a, b) } else { (b, a) };
            *edge_counts.entry(edge).or_insert(0) += 1;
        }
    }
    edge_counts
}

/// Check if every edge is shared by exactly two triangles
pub fn is_closed(mesh: &Mesh) -> bool {
    positional_edge_counts(mesh).values().all(|&count| count == 2)
}

/// Check that no edge is shared by more than two triangles
pub fn is_manifold(mesh: &Mesh) -> bool {
    positional_edge_counts(mesh).values().all(|&count| count <= 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_analyze_cube() {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true).to_mesh();
        let stats = analyze(&mesh);

        assert_relative_eq!(stats.volume, 1000.0, epsilon = 1e-3);
        assert_relative_eq!(stats.surface_area, 600.0, epsilon = 1e-3);
        assert_eq!(stats.vertex_count, 24);
        assert_eq!(stats.triangle_count, 12);
        assert!(stats.is_watertight);
        assert!(stats.is_manifold);
    }

    #[test]
    fn test_volume_sign_follows_winding() {
        let mut mesh = Primitive::cube(Vector3::new(2.0, 3.0, 4.0), false).to_mesh();
        let outward = mesh.calculate_volume();
        mesh.invert_mesh();
        let inward = mesh.calculate_volume();

        assert_relative_eq!(outward, 24.0, epsilon = 1e-4);
        assert_relative_eq!(inward, -outward, epsilon = 1e-9);
    }

    #[test]
    fn test_analyze_sphere() {
        let mesh = Primitive::sphere(5.0, 32).to_mesh();
        let stats = analyze(&mesh);

        let expected_volume = 4.0 / 3.0 * std::f64::consts::PI * 5.0_f64.powi(3);
        assert!(
            (stats.volume - expected_volume).abs() < expected_volume * 0.05,
            "Volume {} not close to expected {}",
            stats.volume,
            expected_volume
        );
    }

    #[test]
    fn test_open_quad_is_not_watertight() {
        let mesh = Primitive::quad(1.0).to_mesh();
        assert!(!is_closed(&mesh));
        assert!(is_manifold(&mesh));
    }
}
