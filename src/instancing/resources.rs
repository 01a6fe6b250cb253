// src/instancing/resources.rs

use std::collections::HashSet;
use std::ops::Range;

use bevy::prelude::*;
use wgpu::Backend;

use super::core::{InstancedDraw, InstancedDrawSink, PropertyBlock};
use super::registry::InstanceGroups;
use super::renderer::BatchRenderer;
use super::settings::InstancingSettings;

/// Registry specialised for Bevy: live nodes are entities.
pub type SceneInstanceGroups = InstanceGroups<Entity, Handle<Mesh>, Handle<StandardMaterial>>;

#[derive(Resource, Default)]
pub struct InstanceRegistry(pub SceneInstanceGroups);

#[derive(Resource, Default)]
pub struct InstanceRenderer(pub BatchRenderer);

/// Parent entity whose children are the live instance nodes (appended in creation order).
#[derive(Resource, Clone, Copy, Debug)]
pub struct InstanceRoot(pub Entity);

/// Where the settings file lives.
#[derive(Resource, Clone)]
pub struct InstancingConfig {
    pub settings_path: String,
}
impl Default for InstancingConfig {
    fn default() -> Self {
        Self {
            settings_path: "instancing/default.instancing.ron".to_string(),
        }
    }
}

/// Handle to the loaded InstancingSettings asset.
#[derive(Resource, Default)]
pub struct InstancingSettingsHandle(pub Handle<InstancingSettings>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub hardware_instancing: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self { hardware_instancing: true }
    }
}

impl PlatformCapabilities {
    /// Every real wgpu backend can draw instanced; the dummy one can't.
    pub fn from_backend(backend: Backend) -> Self {
        let hardware_instancing = matches!(
            backend,
            Backend::Vulkan | Backend::Metal | Backend::Dx12 | Backend::Gl | Backend::BrowserWebGpu
        );
        Self { hardware_instancing }
    }
}

/// One queued instanced draw; its matrices live in the owning `DrawQueue`.
#[derive(Clone, Debug)]
pub struct QueuedDraw {
    pub mesh: Handle<Mesh>,
    pub submesh: u32,
    pub material: Handle<StandardMaterial>,
    pub properties: Option<PropertyBlock>,
    matrices: Range<usize>,
}

impl QueuedDraw {
    pub fn instance_count(&self) -> usize {
        self.matrices.len()
    }
}

/// This frame's instanced draws, consumed by the host rasterizer.
/// Storage is kept between frames; `begin_frame` only clears.
#[derive(Resource, Default)]
pub struct DrawQueue {
    pub capabilities: PlatformCapabilities,
    instancing_materials: HashSet<AssetId<StandardMaterial>>,
    draws: Vec<QueuedDraw>,
    matrices: Vec<Mat4>,
}

impl DrawQueue {
    pub fn begin_frame(&mut self) {
        self.draws.clear();
        self.matrices.clear();
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn draws(&self) -> impl Iterator<Item = (&QueuedDraw, &[Mat4])> {
        self.draws
            .iter()
            .map(|draw| (draw, &self.matrices[draw.matrices.clone()]))
    }

    pub fn instancing_enabled(&self, material: &Handle<StandardMaterial>) -> bool {
        self.instancing_materials.contains(&material.id())
    }
}

impl InstancedDrawSink for DrawQueue {
    type Mesh = Handle<Mesh>;
    type Material = Handle<StandardMaterial>;

    fn supports_instancing(&self) -> bool {
        self.capabilities.hardware_instancing
    }

    fn enable_instancing(&mut self, material: &Handle<StandardMaterial>) {
        self.instancing_materials.insert(material.id());
    }

    fn draw_mesh_instanced(&mut self, draw: InstancedDraw<'_, Handle<Mesh>, Handle<StandardMaterial>>) {
        let start = self.matrices.len();
        self.matrices.extend_from_slice(draw.matrices);
        self.draws.push(QueuedDraw {
            mesh: draw.mesh.clone(),
            submesh: draw.submesh,
            material: draw.material.clone(),
            properties: draw.properties.cloned(),
            matrices: start..self.matrices.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_map_to_capabilities() {
        for backend in [Backend::Vulkan, Backend::Metal, Backend::Dx12, Backend::Gl, Backend::BrowserWebGpu] {
            assert!(PlatformCapabilities::from_backend(backend).hardware_instancing, "{backend:?}");
        }
        assert!(!PlatformCapabilities::from_backend(Backend::Empty).hardware_instancing);
    }

    #[test]
    fn queue_keeps_each_draws_matrices_apart() {
        let mut queue = DrawQueue::default();
        let mesh = Handle::<Mesh>::default();
        let material = Handle::<StandardMaterial>::default();
        let a = [Mat4::IDENTITY; 3];
        let b = [Mat4::from_translation(Vec3::X); 2];

        for matrices in [&a[..], &b[..]] {
            queue.draw_mesh_instanced(InstancedDraw {
                mesh: &mesh,
                submesh: 0,
                material: &material,
                matrices,
                properties: None,
            });
        }

        let collected: Vec<_> = queue.draws().map(|(d, m)| (d.instance_count(), m.to_vec())).collect();
        assert_eq!(collected, vec![(3, a.to_vec()), (2, b.to_vec())]);

        queue.begin_frame();
        assert!(queue.is_empty());
        assert_eq!(queue.draws().count(), 0);
    }

    #[test]
    fn enabled_materials_survive_frames() {
        let mut queue = DrawQueue::default();
        let material = Handle::<StandardMaterial>::default();
        assert!(!queue.instancing_enabled(&material));
        queue.enable_instancing(&material);
        queue.begin_frame();
        assert!(queue.instancing_enabled(&material));
    }
}
