use bevy::prelude::*;
use bevy_inspector_egui::bevy_egui::EguiPlugin;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use diamond_terrain::heightmapgenerator::{HeightmapGeneratorPlugin, HeightmapRendererPlugin};
use diamond_terrain::rendering::{CameraPlugin, InputPlugin};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(WorldInspectorPlugin::new())
        .add_plugins(CameraPlugin)
        .add_plugins(InputPlugin)
        .add_plugins(HeightmapGeneratorPlugin)
        .add_plugins(HeightmapRendererPlugin)
        .run();
}
