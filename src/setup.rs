use bevy::prelude::*;
use prop_instancer::InstanceRoot;

use crate::input::CameraOrbit;
use crate::showcase::{Bobbing, LAMP_COUNT, LAMP_RING_RADIUS};

#[derive(Component)]
pub struct MainCamera;

pub fn setup(
    mut commands: Commands,
) {
    // 1) Light
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(40.0, 80.0, 40.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // 2) Camera, placed by its orbit rig
    let orbit = CameraOrbit {
        focus: Vec3::ZERO,
        radius: 110.0,
        yaw: 0.6,
        pitch: 0.45,
    };
    commands.spawn((Camera3d::default(), orbit.transform(), MainCamera, orbit));

    // 3) Instance root; its children are the live lamp nodes (appended in order)
    let root = commands
        .spawn((Name::new("Instance Root"), Transform::default(), Visibility::default()))
        .with_children(|parent| {
            for i in 0..LAMP_COUNT {
                let angle = i as f32 / LAMP_COUNT as f32 * std::f32::consts::TAU;
                let base = Vec3::new(angle.cos(), 0.0, angle.sin()) * LAMP_RING_RADIUS;
                parent.spawn((
                    Name::new(format!("Lamp {i}")),
                    Transform::from_translation(base + Vec3::Y * 4.0),
                    Bobbing { base, phase: angle },
                ));
            }
        })
        .id();
    commands.insert_resource(InstanceRoot(root));
}
