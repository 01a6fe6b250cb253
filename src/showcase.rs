//! Showcase scene for the instancing plugin.
//! - "rocks": a deterministic scatter of baked matrices (2000 -> two batches)
//! - "lamps": instances bound to the bobbing children of the instance root
//! - gizmo cuboids stand in for the host rasterizer and draw `DrawQueue`

use bevy::math::{DMat4, DQuat, DVec3};
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use prop_instancer::instancing::{PropertyBlock, PropertyValue};
use prop_instancer::{DrawQueue, InstanceGroupRequest, InstanceRegistry, InstanceRenderer, InstancingSet};

use crate::actions::{ActionState, ShowcaseAction};

pub const LAMP_COUNT: usize = 24;
pub const LAMP_RING_RADIUS: f32 = 30.0;
pub const ROCK_COUNT: usize = 2000;
pub const ROCK_FIELD_HALF: f64 = 80.0;
pub const ROCK_SEED: u64 = 0x5EED_0F_B0_u64;

const ROCKS: &str = "rocks";
const LAMPS: &str = "lamps";
const BATCH_SIZES: [usize; 3] = [1023, 256, 5000];
const LAMP_COUNTS: [usize; 3] = [LAMP_COUNT, 0, 5];
const TINT: &str = "_Color";

/// Vertical bob around `base`.
#[derive(Component)]
pub struct Bobbing {
    pub base: Vec3,
    pub phase: f32,
}

#[derive(Resource)]
struct ShowcaseAssets {
    mesh: Handle<Mesh>,
    rock_material: Handle<StandardMaterial>,
    lamp_material: Handle<StandardMaterial>,
}

#[derive(Resource, Default)]
struct ShowcaseState {
    rocks_visible: bool,
    batch_size_ix: usize,
    lamp_count_ix: usize,
}

pub struct ShowcasePlugin;
impl Plugin for ShowcasePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ShowcaseState>()
            .add_systems(Startup, spawn_showcase_groups)
            .add_systems(Update, (animate_lamps, handle_showcase_actions))
            .add_systems(
                PostUpdate,
                tint_groups
                    .after(InstancingSet::Prepare)
                    .before(InstancingSet::Render),
            )
            .add_systems(
                PostUpdate,
                (present_draw_queue, report_frame_stats).after(InstancingSet::Render),
            );
    }
}

/// Deterministic rock scatter (same seed, same field).
pub fn rock_matrices(count: usize, seed: u64) -> Vec<DMat4> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let x = rng.random_range(-ROCK_FIELD_HALF..ROCK_FIELD_HALF);
            let z = rng.random_range(-ROCK_FIELD_HALF..ROCK_FIELD_HALF);
            let yaw = rng.random_range(0.0..std::f64::consts::TAU);
            let scale = rng.random_range(0.4..1.6);
            DMat4::from_scale_rotation_translation(
                DVec3::new(scale, scale * 0.6, scale),
                DQuat::from_rotation_y(yaw),
                DVec3::new(x, scale * 0.3, z),
            )
        })
        .collect()
}

/// Baked fallbacks for the lamps: their rest positions on the ring.
pub fn lamp_matrices(count: usize) -> Vec<DMat4> {
    (0..count)
        .map(|i| {
            let angle = i as f64 / LAMP_COUNT as f64 * std::f64::consts::TAU;
            let base = DVec3::new(angle.cos(), 0.0, angle.sin()) * LAMP_RING_RADIUS as f64;
            DMat4::from_translation(base + DVec3::Y * 4.0)
        })
        .collect()
}

fn add_request(id: &str, assets: &ShowcaseAssets, matrices: Vec<DMat4>) -> InstanceGroupRequest {
    let material = if id == ROCKS { &assets.rock_material } else { &assets.lamp_material };
    InstanceGroupRequest::Add {
        id: id.to_string(),
        mesh: Some(assets.mesh.clone()),
        material: Some(material.clone()),
        matrices,
    }
}

fn spawn_showcase_groups(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut requests: EventWriter<InstanceGroupRequest>,
    mut state: ResMut<ShowcaseState>,
) {
    let assets = ShowcaseAssets {
        mesh: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
        rock_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.45, 0.42, 0.38),
            ..default()
        }),
        lamp_material: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.85, 0.4),
            unlit: true,
            ..default()
        }),
    };

    requests.write(add_request(ROCKS, &assets, rock_matrices(ROCK_COUNT, ROCK_SEED)));
    requests.write(add_request(LAMPS, &assets, lamp_matrices(LAMP_COUNT)));
    state.rocks_visible = true;

    info!("Showcase: requested '{}' ({} baked) and '{}' ({} live)", ROCKS, ROCK_COUNT, LAMPS, LAMP_COUNT);
    commands.insert_resource(assets);
}

fn animate_lamps(time: Res<Time>, mut q: Query<(&mut Transform, &Bobbing)>) {
    let t = time.elapsed_secs();
    for (mut tf, bob) in q.iter_mut() {
        tf.translation = bob.base + Vec3::Y * (4.0 + 2.5 * (t * 1.7 + bob.phase).sin());
    }
}

fn handle_showcase_actions(
    actions: Res<ActionState>,
    assets: Option<Res<ShowcaseAssets>>,
    mut state: ResMut<ShowcaseState>,
    mut registry: ResMut<InstanceRegistry>,
    mut requests: EventWriter<InstanceGroupRequest>,
) {
    let Some(assets) = assets else { return };

    if actions.just_pressed(ShowcaseAction::ToggleRocks) {
        state.rocks_visible = !state.rocks_visible;
        if state.rocks_visible {
            requests.write(add_request(ROCKS, &assets, rock_matrices(ROCK_COUNT, ROCK_SEED)));
        } else {
            requests.write(InstanceGroupRequest::Remove { id: ROCKS.to_string() });
        }
        info!("Showcase: rocks {}", if state.rocks_visible { "on" } else { "off" });
    }

    if actions.just_pressed(ShowcaseAction::CycleBatchSize) {
        state.batch_size_ix = (state.batch_size_ix + 1) % BATCH_SIZES.len();
        let size = BATCH_SIZES[state.batch_size_ix];
        if let Some(group) = registry.0.get_mut(ROCKS) {
            group.set_max_instances_per_batch(size);
        }
        info!("Showcase: rocks max_instances_per_batch = {}", size);
    }

    if actions.just_pressed(ShowcaseAction::RespawnLamps) {
        state.lamp_count_ix = (state.lamp_count_ix + 1) % LAMP_COUNTS.len();
        let count = LAMP_COUNTS[state.lamp_count_ix];
        requests.write(add_request(LAMPS, &assets, lamp_matrices(count)));
        info!("Showcase: re-adding '{}' with {} instances", LAMPS, count);
    }
}

/// Give each group a tint once it is registered.
fn tint_groups(mut registry: ResMut<InstanceRegistry>) {
    for (id, tint) in [(ROCKS, Vec4::new(0.55, 0.5, 0.45, 1.0)), (LAMPS, Vec4::new(1.0, 0.8, 0.2, 1.0))] {
        let Some(group) = registry.0.get_mut(id) else { continue };
        if group.properties().is_none() {
            group.set_properties(Some(PropertyBlock::new().with(TINT, PropertyValue::Vector(tint))));
        }
    }
}

/// Stand-in rasterizer: one gizmo cuboid per queued instance.
fn present_draw_queue(queue: Res<DrawQueue>, mut gizmos: Gizmos) {
    for (draw, matrices) in queue.draws() {
        let tint = draw
            .properties
            .as_ref()
            .and_then(|p| p.vector(TINT))
            .unwrap_or(Vec4::ONE);
        let color = Color::linear_rgba(tint.x, tint.y, tint.z, tint.w);
        for m in matrices {
            gizmos.cuboid(Transform::from_matrix(*m), color);
        }
    }
}

fn report_frame_stats(time: Res<Time>, renderer: Res<InstanceRenderer>, mut since: Local<f32>) {
    *since += time.delta_secs();
    if *since < 2.0 { return; }
    *since = 0.0;

    let s = renderer.0.last_stats();
    info!(
        "Instancing: frame {} - {} groups drawn, {} skipped, {} draw calls, {} instances",
        renderer.0.frame(),
        s.groups_drawn,
        s.groups_skipped,
        s.draw_calls,
        s.instances
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rock_scatter_is_deterministic() {
        let a = rock_matrices(16, ROCK_SEED);
        let b = rock_matrices(16, ROCK_SEED);
        assert_eq!(a, b);
        assert_ne!(a, rock_matrices(16, ROCK_SEED + 1));
        assert!(a.iter().all(|m| m.w_axis.x.abs() <= ROCK_FIELD_HALF && m.w_axis.z.abs() <= ROCK_FIELD_HALF));
    }

    #[test]
    fn lamp_fallbacks_sit_on_the_ring() {
        let lamps = lamp_matrices(LAMP_COUNT);
        assert_eq!(lamps.len(), LAMP_COUNT);
        for m in &lamps {
            let p = m.w_axis.truncate();
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!((r - LAMP_RING_RADIUS as f64).abs() < 1e-9);
        }
    }
}
