// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! meshcore CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use meshcore::geometry::analyze;
use meshcore::{
    boolean, consolidate, simplify, BooleanOp, BooleanOperand, CollisionShape, KernelConfig, Mesh,
    Primitive, SegmentQuery,
};
use nalgebra::{Point3, Vector3};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "meshcore")]
#[command(about = "meshcore - mesh consolidation, booleans, simplification and collision queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./meshcore.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print statistics of a JSON mesh
    Stats {
        input: PathBuf,

        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Weld, mend and unify a mesh
    Consolidate {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Collapse edges of a mesh
    Simplify {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Override the configured collapse threshold
        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Combine two closed meshes
    Boolean {
        first: PathBuf,
        second: PathBuf,

        #[arg(long, value_enum, default_value = "union")]
        op: OpArg,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cast a grid of vertical rays down through a mesh
    Raycast {
        input: PathBuf,

        /// Rays per bounding box side
        #[arg(short, long, default_value = "16")]
        samples: u32,

        /// Sphere radius swept along each ray
        #[arg(short, long, default_value = "0")]
        radius: f32,
    },

    /// Write a primitive mesh as JSON
    Primitive {
        #[arg(value_enum)]
        kind: PrimitiveArg,

        /// Edge length or radius
        #[arg(long, default_value = "1")]
        size: f32,

        /// Grid cells or sphere segments
        #[arg(long, default_value = "16")]
        detail: u32,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the effective configuration as TOML
    Config {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OpArg {
    Union,
    Intersection,
    Subtract,
}

impl From<OpArg> for BooleanOp {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Union => BooleanOp::Union,
            OpArg::Intersection => BooleanOp::Intersection,
            OpArg::Subtract => BooleanOp::Subtract,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PrimitiveArg {
    Cube,
    Quad,
    Grid,
    Sphere,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match &cli.config {
        Some(path) => KernelConfig::from_file(path)?,
        None => KernelConfig::load()?,
    };

    match cli.command {
        Commands::Stats { input, json } => stats_command(&input, json),
        Commands::Consolidate { input, output } => consolidate_command(&input, &output, &config),
        Commands::Simplify {
            input,
            output,
            threshold,
        } => simplify_command(&input, &output, threshold, config),
        Commands::Boolean {
            first,
            second,
            op,
            output,
        } => boolean_command(&first, &second, op.into(), &output, &config),
        Commands::Raycast {
            input,
            samples,
            radius,
        } => raycast_command(&input, samples, radius, &config),
        Commands::Primitive {
            kind,
            size,
            detail,
            output,
        } => primitive_command(kind, size, detail, &output),
        Commands::Config { output } => {
            config.save(&output)?;
            println!("{} {}", "Wrote".green(), output.display());
            Ok(())
        }
    }
}

fn read_mesh(path: &Path) -> Result<Mesh> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read mesh: {:?}", path))?;
    let mesh: Mesh =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse mesh: {:?}", path))?;
    mesh.validate()
        .with_context(|| format!("Invalid mesh: {:?}", path))?;
    Ok(mesh)
}

fn write_mesh(path: &Path, mesh: &Mesh) -> Result<()> {
    let content = serde_json::to_string(mesh).context("Failed to serialize mesh")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write mesh: {:?}", path))?;
    println!(
        "{} {} ({} vertices, {} triangles)",
        "Wrote".green(),
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(())
}

fn stats_command(input: &Path, json: bool) -> Result<()> {
    let mesh = read_mesh(input)?;
    let stats = analyze(&mesh);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print();
    }
    Ok(())
}

fn consolidate_command(input: &Path, output: &Path, config: &KernelConfig) -> Result<()> {
    let mesh = read_mesh(input)?;
    let start = Instant::now();
    let merged = consolidate(&mesh, config);
    println!(
        "Consolidated {} -> {} vertices in {:.2?}",
        mesh.vertex_count(),
        merged.vertex_count(),
        start.elapsed()
    );
    write_mesh(output, &merged)
}

fn simplify_command(input: &Path, output: &Path, threshold: Option<f32>, mut config: KernelConfig) -> Result<()> {
    if let Some(threshold) = threshold {
        config.simplify.collapse_threshold = threshold;
    }
    let mesh = read_mesh(input)?;
    let start = Instant::now();
    let smaller = simplify(&mesh, &config);
    println!(
        "Simplified {} -> {} triangles in {:.2?}",
        mesh.triangle_count(),
        smaller.triangle_count(),
        start.elapsed()
    );
    write_mesh(output, &smaller)
}

fn boolean_command(first: &Path, second: &Path, op: BooleanOp, output: &Path, config: &KernelConfig) -> Result<()> {
    let a = read_mesh(first)?;
    let b = read_mesh(second)?;
    let start = Instant::now();
    let result = boolean(&BooleanOperand::new(&a), &BooleanOperand::new(&b), op, &config.csg);
    println!(
        "{:?}: {} triangles, volume {:.4} in {:.2?}",
        op,
        result.mesh.triangle_count(),
        result.mesh.calculate_volume(),
        start.elapsed()
    );
    write_mesh(output, &result.mesh)
}

fn raycast_command(input: &Path, samples: u32, radius: f32, config: &KernelConfig) -> Result<()> {
    if samples == 0 {
        bail!("samples must be positive");
    }
    if radius < 0.0 {
        bail!("radius must not be negative");
    }
    let mesh = read_mesh(input)?;
    let shape = CollisionShape::build(&mesh, &[], config.octree.max_depth)?;

    let bounds = mesh.bounding_box();
    let size = bounds.size();
    let above = bounds.max.z + size.z.max(1.0);
    let below = bounds.min.z - size.z.max(1.0);
    let queries: Vec<SegmentQuery> = (0..samples * samples)
        .map(|i| {
            let u = ((i % samples) as f32 + 0.5) / samples as f32;
            let v = ((i / samples) as f32 + 0.5) / samples as f32;
            let x = bounds.min.x + u * size.x;
            let y = bounds.min.y + v * size.y;
            SegmentQuery::sphere(Point3::new(x, y, above), Point3::new(x, y, below), radius)
        })
        .collect();

    let start = Instant::now();
    let hits = shape.query_batch(&queries);
    let elapsed = start.elapsed();

    let found: Vec<_> = hits.iter().flatten().collect();
    let facing_up = found.iter().filter(|hit| hit.normal.dot(&Vector3::z()) > 0.0).count();
    println!(
        "{} rays, {} hits ({} facing up) in {:.2?} using {} index nodes",
        queries.len(),
        found.len(),
        facing_up,
        elapsed,
        shape.index().node_count()
    );
    if let Some(highest) = found.iter().max_by(|a, b| a.position.z.total_cmp(&b.position.z)) {
        println!(
            "Highest contact: ({:.4}, {:.4}, {:.4}) on triangle {}",
            highest.position.x, highest.position.y, highest.position.z, highest.triangle
        );
    }
    Ok(())
}

fn primitive_command(kind: PrimitiveArg, size: f32, detail: u32, output: &Path) -> Result<()> {
    let primitive = match kind {
        PrimitiveArg::Cube => Primitive::cube(Vector3::repeat(size), true),
        PrimitiveArg::Quad => Primitive::quad(size),
        PrimitiveArg::Grid => Primitive::grid(detail, size),
        PrimitiveArg::Sphere => Primitive::sphere(size, detail),
    };
    write_mesh(output, &primitive.to_mesh())
}
