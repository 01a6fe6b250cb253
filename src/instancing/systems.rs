// src/instancing/systems.rs

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::render::renderer::RenderAdapterInfo;

use super::core::NodeHierarchy;
use super::plugin::InstanceGroupRequest;
use super::resources::{
    DrawQueue, InstanceRegistry, InstanceRenderer, InstanceRoot, InstancingConfig,
    InstancingSettingsHandle, PlatformCapabilities,
};
use super::settings::InstancingSettings;

/// Scene graph view for the renderer: children of `InstanceRoot` + their `GlobalTransform`.
#[derive(SystemParam)]
pub struct SceneHierarchy<'w, 's> {
    root: Option<Res<'w, InstanceRoot>>,
    children: Query<'w, 's, &'static Children>,
    transforms: Query<'w, 's, &'static GlobalTransform>,
}

impl NodeHierarchy for SceneHierarchy<'_, '_> {
    type Node = Entity;

    fn instance_nodes(&self) -> &[Entity] {
        let Some(root) = self.root.as_deref() else {
            return &[];
        };
        match self.children.get(root.0) {
            Ok(children) => &**children,
            Err(_) => &[],
        }
    }

    fn world_matrix(&self, node: Entity) -> Option<Mat4> {
        self.transforms.get(node).ok().map(GlobalTransform::compute_matrix)
    }
}

/// Startup: request loading the settings file, store handle.
pub fn load_instancing_settings(
    mut handle_res: ResMut<InstancingSettingsHandle>,
    config: Res<InstancingConfig>,
    assets: Res<AssetServer>,
) {
    if handle_res.0.is_strong() { return; }
    handle_res.0 = assets.load(config.settings_path.as_str());
    info!("Instancing: loading settings from '{}'", config.settings_path);
}

/// Push loaded (or hot-reloaded) settings into the registry.
pub fn apply_loaded_settings(
    mut events: EventReader<AssetEvent<InstancingSettings>>,
    handle: Res<InstancingSettingsHandle>,
    settings: Res<Assets<InstancingSettings>>,
    mut registry: ResMut<InstanceRegistry>,
) {
    for ev in events.read() {
        if !ev.is_loaded_with_dependencies(&handle.0) && !ev.is_modified(&handle.0) {
            continue;
        }
        let Some(s) = settings.get(&handle.0) else { continue };
        registry.0.set_max_instances_per_batch_all(s.max_instances_per_batch);
        registry.0.set_capture_policy(s.capture);
        info!(
            "Instancing: settings applied (max_instances_per_batch={}, capture={:?})",
            s.max_instances_per_batch, s.capture
        );
    }
}

/// Track the adapter Bevy picked; re-arm the capability gate when it changes.
pub fn detect_platform_capabilities(
    adapter: Option<Res<RenderAdapterInfo>>,
    mut queue: ResMut<DrawQueue>,
    mut registry: ResMut<InstanceRegistry>,
) {
    let Some(adapter) = adapter else { return };
    if !adapter.is_changed() { return; }
    let caps = PlatformCapabilities::from_backend(adapter.backend);
    if queue.capabilities == caps { return; }

    queue.capabilities = caps;
    registry.0.reset_capability_gate();
    info!(
        "Instancing: adapter '{}' ({}), hardware instancing {}",
        adapter.name,
        adapter.backend.to_str(),
        if caps.hardware_instancing { "on" } else { "off" }
    );
}

/// Apply add/remove requests in the order they were sent.
pub fn apply_group_requests(
    mut requests: EventReader<InstanceGroupRequest>,
    hierarchy: SceneHierarchy,
    mut registry: ResMut<InstanceRegistry>,
    mut queue: ResMut<DrawQueue>,
) {
    for request in requests.read() {
        match request {
            InstanceGroupRequest::Add { id, mesh, material, matrices } => {
                registry.0.add_instance_group(
                    id,
                    mesh.clone(),
                    material.clone(),
                    matrices,
                    &hierarchy,
                    &mut *queue,
                );
            }
            InstanceGroupRequest::Remove { id } => registry.0.remove_instance_group(id),
        }
    }
}

/// The per-frame tick: refill the draw queue from every registered group.
pub fn render_instance_groups(
    hierarchy: SceneHierarchy,
    mut registry: ResMut<InstanceRegistry>,
    mut renderer: ResMut<InstanceRenderer>,
    mut queue: ResMut<DrawQueue>,
) {
    queue.begin_frame();
    renderer.0.tick(&mut registry.0, &hierarchy, &mut *queue);
}
