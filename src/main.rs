use bevy::prelude::*;

mod setup;
mod input;
mod actions;
mod showcase;

use actions::ActionState;
use input::{camera_controller, input_mapping_system};
use prop_instancer::InstancingPlugin;
use showcase::ShowcasePlugin;

fn main() {
    App::new()
        // core engine plugins
        .add_plugins(DefaultPlugins)
        // batched instancing: registry + per-frame draw queue
        .add_plugins(InstancingPlugin)
        // rocks + lamps groups and the gizmo stand-in rasterizer
        .add_plugins(ShowcasePlugin)
        .init_resource::<ActionState>()
        // camera, light, instance root
        .add_systems(Startup, setup::setup)
        // input + camera each frame
        .add_systems(Update, (input_mapping_system, camera_controller).chain())
        .run();
}
