use bevy::prelude::*;

use crate::heightmapgenerator::GenerateHeightmapEvent;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, regenerate_on_space);
    }
}

// Space generates a new world
fn regenerate_on_space(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut requests: EventWriter<GenerateHeightmapEvent>,
) {
    if keyboard.just_pressed(KeyCode::Space) {
        requests.write(GenerateHeightmapEvent);
    }
}
