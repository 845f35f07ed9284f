// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel tolerance configuration

use crate::boolean::BooleanOptions;
use crate::spatial::DEFAULT_MAX_DEPTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read by [`KernelConfig::load`] from the working directory
pub const CONFIG_FILE: &str = "meshcore.toml";

/// Tolerances for every kernel stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub weld: WeldConfig,
    pub mend: MendConfig,
    pub octree: OctreeConfig,
    pub csg: BooleanOptions,
    pub simplify: SimplifyConfig,
}

/// Cross-surface position snapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeldConfig {
    pub epsilon: f32,
}

impl Default for WeldConfig {
    fn default() -> Self {
        Self { epsilon: 1e-4 }
    }
}

/// Same-surface attribute snapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MendConfig {
    pub vertex_epsilon: f32,
    pub normal_epsilon: f32,
    pub texcoord_epsilon: f32,
}

impl Default for MendConfig {
    fn default() -> Self {
        Self {
            vertex_epsilon: 1e-4,
            normal_epsilon: 1e-3,
            texcoord_epsilon: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    pub max_depth: u8,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    /// Edges costing more than this are never collapsed
    pub collapse_threshold: f32,
    /// Straighten collinear boundary runs before collapsing
    pub boundary_edges: bool,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            collapse_threshold: 0.01,
            boundary_edges: true,
        }
    }
}

impl KernelConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: KernelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `meshcore.toml` if present, then apply `MESHCORE_*` overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        override_from_env("MESHCORE_WELD_EPSILON", &mut self.weld.epsilon)?;
        override_from_env("MESHCORE_MEND_EPSILON", &mut self.mend.vertex_epsilon)?;
        override_from_env("MESHCORE_OCTREE_MAX_DEPTH", &mut self.octree.max_depth)?;
        override_from_env("MESHCORE_CSG_WELD_EPSILON", &mut self.csg.weld_epsilon)?;
        override_from_env("MESHCORE_CSG_SIMPLIFY", &mut self.csg.simplify_boundaries)?;
        override_from_env("MESHCORE_COLLAPSE_THRESHOLD", &mut self.simplify.collapse_threshold)?;
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

fn override_from_env<T>(name: &str, slot: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Ok(value) = std::env::var(name) {
        *slot = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value {:?} for {}", value, name))?;
        log::debug!("config: {} overridden from the environment", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_operations() {
        let config = KernelConfig::default();
        assert_eq!(config.octree.max_depth, 12);
        assert_eq!(config.csg, BooleanOptions::default());
        assert!(config.csg.collinear_cos > 0.999);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: KernelConfig = toml::from_str("[weld]\nepsilon = 0.5\n").expect("valid toml");
        assert_eq!(config.weld.epsilon, 0.5);
        assert_eq!(config.mend, MendConfig::default());
    }

    #[test]
    fn test_env_override() {
        let mut config = KernelConfig::default();
        std::env::set_var("MESHCORE_OCTREE_MAX_DEPTH", "7");
        config.apply_env_overrides().expect("valid override");
        std::env::remove_var("MESHCORE_OCTREE_MAX_DEPTH");
        assert_eq!(config.octree.max_depth, 7);
    }
}
