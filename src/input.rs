use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;

use crate::actions::{ActionState, ShowcaseAction};
use crate::setup::MainCamera;

const PAN_SPEED: f32 = 60.0;
const ORBIT_SPEED: f32 = 0.005;
const ZOOM_RANGE: (f32, f32) = (5.0, 600.0);
const PITCH_RANGE: (f32, f32) = (0.05, std::f32::consts::FRAC_PI_2 - 0.01);
// Long frames (window drag, asset hitch) would otherwise fling the focus.
const MAX_PAN_DT: f32 = 0.05;

/// Spherical camera rig around `focus`.
#[derive(Component, Clone, Copy, Debug)]
pub struct CameraOrbit {
    pub focus: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraOrbit {
    /// Ground-plane direction the camera looks along.
    fn heading(&self) -> Vec2 {
        -Vec2::from_angle(self.yaw)
    }

    fn eye(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let flat = Vec2::from_angle(self.yaw) * self.radius * cos_pitch;
        self.focus + Vec3::new(flat.x, self.radius * sin_pitch, flat.y)
    }

    /// Move the focus along the ground; `intent` is (right, forward).
    fn pan(&mut self, intent: Vec2, distance: f32) {
        let forward = self.heading();
        let right = forward.perp();
        let step = (right * intent.x + forward * intent.y).normalize_or_zero() * distance;
        self.focus += Vec3::new(step.x, 0.0, step.y);
    }

    fn zoom(&mut self, amount: f32) {
        self.radius = (self.radius - amount).clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
    }

    fn rotate(&mut self, delta: Vec2) {
        self.yaw += delta.x * ORBIT_SPEED;
        self.pitch = (self.pitch + delta.y * ORBIT_SPEED).clamp(PITCH_RANGE.0, PITCH_RANGE.1);
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.focus, Vec3::Y)
    }
}

const KEY_BINDINGS: [(KeyCode, ShowcaseAction); 7] = [
    (KeyCode::KeyW, ShowcaseAction::MoveForward),
    (KeyCode::KeyS, ShowcaseAction::MoveBackward),
    (KeyCode::KeyA, ShowcaseAction::MoveLeft),
    (KeyCode::KeyD, ShowcaseAction::MoveRight),
    (KeyCode::KeyR, ShowcaseAction::ToggleRocks),
    (KeyCode::KeyB, ShowcaseAction::CycleBatchSize),
    (KeyCode::KeyL, ShowcaseAction::RespawnLamps),
];

pub fn input_mapping_system(keys: Res<ButtonInput<KeyCode>>, mut action_state: ResMut<ActionState>) {
    for (key, action) in KEY_BINDINGS {
        action_state.set(action, keys.pressed(key));
    }
}

fn pan_intent(actions: &ActionState) -> Vec2 {
    let axis = |pos, neg| actions.pressed(pos) as i8 as f32 - actions.pressed(neg) as i8 as f32;
    Vec2::new(
        axis(ShowcaseAction::MoveRight, ShowcaseAction::MoveLeft),
        axis(ShowcaseAction::MoveForward, ShowcaseAction::MoveBackward),
    )
}

/// WASD pans, wheel zooms, middle-drag orbits.
pub fn camera_controller(
    time: Res<Time>,
    actions: Res<ActionState>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    scroll: Res<AccumulatedMouseScroll>,
    mut cameras: Query<(&mut Transform, &mut CameraOrbit), With<MainCamera>>,
) {
    let Ok((mut tf, mut orbit)) = cameras.single_mut() else { return };

    orbit.pan(pan_intent(&actions), PAN_SPEED * time.delta_secs().min(MAX_PAN_DT));
    orbit.zoom(match scroll.unit {
        MouseScrollUnit::Line => scroll.delta.y * 4.0,
        MouseScrollUnit::Pixel => scroll.delta.y * 0.08,
    });
    if mouse_buttons.pressed(MouseButton::Middle) {
        orbit.rotate(motion.delta);
    }

    *tf = orbit.transform();
}
