// src/instancing/core.rs
//! Core types/traits for batched instance rendering.
//! Keep this file engine-light: math comes from `bevy::math`, nothing here
//! touches the ECS, so hosts and tests can drive it with plain structs.

use bevy::math::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------- Limits ----------

/// Most instances a single hardware-instanced draw may carry.
pub const HARDWARE_BATCH_LIMIT: usize = 1023;

/// Batch ceiling given to new groups.
pub const DEFAULT_MAX_INSTANCES_PER_BATCH: usize = HARDWARE_BATCH_LIMIT;

/// Clamp a configured batch ceiling into `[1, HARDWARE_BATCH_LIMIT]`.
#[inline]
pub fn effective_batch_size(configured: usize) -> usize {
    configured.clamp(1, HARDWARE_BATCH_LIMIT)
}

// ---------- Live-node capture ----------

/// Which children of the instance parent get bound as live nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapturePolicy {
    /// The most recently appended children.
    #[default]
    Newest,
    /// The earliest appended children.
    Oldest,
    /// Never bind live nodes; every instance uses its baked matrix.
    Disabled,
}

// ---------- Shader property overrides ----------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    Float(f32),
    Int(i32),
    Vector(Vec4),
}

/// Per-group shader property overrides passed along with every batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBlock {
    values: HashMap<String, PropertyValue>,
}

impl PropertyBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.values.get(name).copied()
    }

    pub fn vector(&self, name: &str) -> Option<Vec4> {
        match self.get(name)? {
            PropertyValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ---------- Host seams ----------

/// Source of live transform nodes.
pub trait NodeHierarchy {
    type Node: Copy;

    /// Children of the designated instance parent, in append order (oldest first).
    fn instance_nodes(&self) -> &[Self::Node];

    /// Current world matrix of `node`; `None` once the node is gone.
    fn world_matrix(&self, node: Self::Node) -> Option<Mat4>;
}

/// One hardware-instanced draw call.
pub struct InstancedDraw<'a, M, Mt> {
    pub mesh: &'a M,
    pub submesh: u32,
    pub material: &'a Mt,
    /// `matrices.len()` is the instance count; never above `HARDWARE_BATCH_LIMIT`.
    pub matrices: &'a [Mat4],
    pub properties: Option<&'a PropertyBlock>,
}

impl<M, Mt> InstancedDraw<'_, M, Mt> {
    #[inline]
    pub fn count(&self) -> usize {
        self.matrices.len()
    }
}

/// The rasterizer side: capability query, per-material switch and the draw itself.
pub trait InstancedDrawSink {
    type Mesh;
    type Material;

    fn supports_instancing(&self) -> bool;

    /// Must be idempotent; called at registration and again every frame.
    fn enable_instancing(&mut self, material: &Self::Material);

    fn draw_mesh_instanced(&mut self, draw: InstancedDraw<'_, Self::Mesh, Self::Material>);
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Plain-struct hosts shared by the core tests.

    use super::*;

    /// Nodes are indices into `matrices`; `None` marks a destroyed node.
    #[derive(Default)]
    pub struct FakeHierarchy {
        pub children: Vec<usize>,
        pub matrices: Vec<Option<Mat4>>,
    }

    impl FakeHierarchy {
        pub fn with_nodes(count: usize) -> Self {
            Self {
                children: (0..count).collect(),
                matrices: (0..count)
                    .map(|i| Some(Mat4::from_translation(bevy::math::Vec3::new(i as f32, 100.0, 0.0))))
                    .collect(),
            }
        }
    }

    impl NodeHierarchy for FakeHierarchy {
        type Node = usize;

        fn instance_nodes(&self) -> &[usize] {
            &self.children
        }

        fn world_matrix(&self, node: usize) -> Option<Mat4> {
            self.matrices.get(node).copied().flatten()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedDraw {
        pub mesh: u32,
        pub submesh: u32,
        pub material: u32,
        pub matrices: Vec<Mat4>,
        pub properties: Option<PropertyBlock>,
    }

    pub struct FakeSink {
        pub supported: bool,
        pub capability_queries: std::cell::Cell<usize>,
        pub enabled: Vec<u32>,
        pub draws: Vec<RecordedDraw>,
    }

    impl Default for FakeSink {
        fn default() -> Self {
            Self { supported: true, capability_queries: Default::default(), enabled: Vec::new(), draws: Vec::new() }
        }
    }

    impl FakeSink {
        pub fn batch_sizes(&self) -> Vec<usize> {
            self.draws.iter().map(|d| d.matrices.len()).collect()
        }
    }

    impl InstancedDrawSink for FakeSink {
        type Mesh = u32;
        type Material = u32;

        fn supports_instancing(&self) -> bool {
            self.capability_queries.set(self.capability_queries.get() + 1);
            self.supported
        }

        fn enable_instancing(&mut self, material: &u32) {
            if !self.enabled.contains(material) {
                self.enabled.push(*material);
            }
        }

        fn draw_mesh_instanced(&mut self, draw: InstancedDraw<'_, u32, u32>) {
            assert!(draw.count() <= HARDWARE_BATCH_LIMIT);
            self.draws.push(RecordedDraw {
                mesh: *draw.mesh,
                submesh: draw.submesh,
                material: *draw.material,
                matrices: draw.matrices.to_vec(),
                properties: draw.properties.cloned(),
            });
        }
    }
}
