use bevy::prelude::*;
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_camera, spawn_light));
    }
}

fn spawn_camera(mut commands: Commands) {
    // Terrain is centred on the origin, 64 cells wide by default
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 55.0, 70.0)
            .looking_at(Vec3::new(0.0, 5.0, 0.0), Vec3::Y),
    ));
}

fn spawn_light(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            color: Color::WHITE,
            illuminance: 15000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 50.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));
}
