//! Instancing plugin wiring (glue).
//! - Settings asset/loader
//! - Add/remove requests (whoever decides which groups exist sends these)
//! - Capability detection + the per-frame render tick, after transform propagation

use bevy::math::DMat4;
use bevy::prelude::*;
use bevy::transform::TransformSystem;

use super::resources::{
    DrawQueue, InstanceRegistry, InstanceRenderer, InstancingConfig, InstancingSettingsHandle,
};
use super::settings::InstancingSettingsAssetPlugin;
use super::systems::{
    apply_group_requests, apply_loaded_settings, detect_platform_capabilities,
    load_instancing_settings, render_instance_groups,
};

/// Registry mutation, in send order.
#[derive(Event, Clone, Debug)]
pub enum InstanceGroupRequest {
    /// Register or fully replace a group.
    Add {
        id: String,
        mesh: Option<Handle<Mesh>>,
        material: Option<Handle<StandardMaterial>>,
        matrices: Vec<DMat4>,
    },
    Remove { id: String },
}

/// Runs in `PostUpdate`, after global transforms are final for the frame.
/// Read `DrawQueue` after this set.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum InstancingSet {
    Prepare, // capabilities, settings, registry requests
    Render,  // fill the draw queue
}

pub struct InstancingPlugin;

impl Plugin for InstancingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InstancingSettingsAssetPlugin)
            .init_resource::<InstancingConfig>()
            .init_resource::<InstancingSettingsHandle>()
            .init_resource::<InstanceRegistry>()
            .init_resource::<InstanceRenderer>()
            .init_resource::<DrawQueue>()
            .add_event::<InstanceGroupRequest>()

            .configure_sets(
                PostUpdate,
                (
                    InstancingSet::Prepare.after(TransformSystem::TransformPropagate),
                    InstancingSet::Render.after(InstancingSet::Prepare),
                ),
            )
            .add_systems(Startup, load_instancing_settings)
            .add_systems(
                PostUpdate,
                (detect_platform_capabilities, apply_loaded_settings, apply_group_requests)
                    .chain()
                    .in_set(InstancingSet::Prepare),
            )
            .add_systems(PostUpdate, render_instance_groups.in_set(InstancingSet::Render));
    }
}
