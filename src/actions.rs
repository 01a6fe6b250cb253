use bevy::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShowcaseAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    ToggleRocks,
    CycleBatchSize,
    RespawnLamps,
}

#[derive(Default, Resource)]
pub struct ActionState {
    pressed: HashMap<ShowcaseAction, bool>,
    previous: HashMap<ShowcaseAction, bool>,
}

impl ActionState {
    pub fn set(&mut self, action: ShowcaseAction, is_pressed: bool) {
        let was = self.pressed.insert(action, is_pressed).unwrap_or(false);
        self.previous.insert(action, was);
    }

    pub fn pressed(&self, action: ShowcaseAction) -> bool {
        *self.pressed.get(&action).unwrap_or(&false)
    }

    /// Pressed now, released on the previous `set`.
    pub fn just_pressed(&self, action: ShowcaseAction) -> bool {
        self.pressed(action) && !*self.previous.get(&action).unwrap_or(&false)
    }
}
