use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::mesh::{Indices, PrimitiveTopology},
};
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};

use super::diamond_square::HeightGrid;
use super::height_map_generator::{CurrentHeightmap, HeightmapGeneratedEvent, HeightmapGenerationSet};

#[derive(Component)]
pub struct HeightmapTerrain;

#[derive(Resource, Clone, Debug)]
pub struct HeightmapRenderConfig {
    pub cell_size: f32,
    pub low_band: f32,   // at or below: low_color
    pub high_band: f32,  // above: high_color, in between: mid_color
    pub low_color: Color,
    pub mid_color: Color,
    pub high_color: Color,
}

impl Default for HeightmapRenderConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            low_band: 0.5,
            high_band: 4.0,
            low_color: Color::srgb_u8(34, 139, 34),  // forest green
            mid_color: Color::srgb_u8(139, 69, 19),  // saddle brown
            high_color: Color::WHITE,
        }
    }
}

/// Asks the renderer to rebuild the terrain mesh from the current grid.
#[derive(Event, Default)]
pub struct RebuildTerrainMeshEvent;

pub struct HeightmapRendererPlugin;

impl Plugin for HeightmapRendererPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<HeightmapRenderConfig>()
            .add_event::<RebuildTerrainMeshEvent>()
            .add_systems(Update, (
                request_rebuild_on_generation,
                rebuild_terrain_mesh,
            ).chain().after(HeightmapGenerationSet))
            .add_systems(EguiPrimaryContextPass, heightmap_render_ui);
    }
}

fn request_rebuild_on_generation(
    mut generated: EventReader<HeightmapGeneratedEvent>,
    mut rebuild: EventWriter<RebuildTerrainMeshEvent>,
) {
    for event in generated.read() {
        info!(
            "Heightmap #{0} {1}x{1} ready ({2:.2} to {3:.2}), rebuilding mesh",
            event.generation, event.resolution + 1, event.min_height, event.max_height
        );
        rebuild.write(RebuildTerrainMeshEvent);
    }
}

pub fn heightmap_render_ui(
    mut contexts: EguiContexts,
    mut render_config: ResMut<HeightmapRenderConfig>,
    mut rebuild: EventWriter<RebuildTerrainMeshEvent>,
) -> Result {
    egui::Window::new("Terrain Renderer")
        .default_width(280.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.heading("Elevation Bands");

            ui.add(egui::Slider::new(&mut render_config.low_band, -10.0..=20.0)
                .text("Low Band"));
            ui.add(egui::Slider::new(&mut render_config.high_band, -10.0..=40.0)
                .text("High Band"));
            ui.add(egui::Slider::new(&mut render_config.cell_size, 0.25..=4.0)
                .text("Cell Size"));

            if render_config.high_band < render_config.low_band {
                render_config.high_band = render_config.low_band;
            }

            if ui.button("Apply").clicked() {
                rebuild.write(RebuildTerrainMeshEvent);
            }
        });
    Ok(())
}

pub fn rebuild_terrain_mesh(
    mut commands: Commands,
    mut events: EventReader<RebuildTerrainMeshEvent>,
    current: Option<Res<CurrentHeightmap>>,
    render_config: Res<HeightmapRenderConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    terrain_query: Query<Entity, With<HeightmapTerrain>>,
) {
    if events.read().count() == 0 {
        return;
    }
    let Some(current) = current else {
        return;
    };

    for entity in terrain_query.iter() {
        commands.entity(entity).despawn();
    }

    let grid = &current.grid;
    let mesh = create_terrain_mesh(grid, &render_config);
    let half_extent = grid.max_index() as f32 * render_config.cell_size * 0.5;

    commands.spawn((
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            ..default()
        })),
        Transform::from_xyz(-half_extent, 0.0, -half_extent),
        HeightmapTerrain,
        Name::new(format!("HeightmapTerrain_{}_{}", current.seed, current.generation)),
    ));

    info!("Terrain mesh spawned with {} vertices", grid.heights().len());
}

/// Vertex for cell `(x, z)` sits at `(x, height, z)`, scaled by the cell size.
/// Rows run along `z`, `x` varies fastest.
pub fn terrain_positions(grid: &HeightGrid, cell_size: f32) -> Vec<[f32; 3]> {
    grid.iter()
        .map(|(x, z, h)| [x as f32 * cell_size, h, z as f32 * cell_size])
        .collect()
}

pub fn elevation_color(height: f32, config: &HeightmapRenderConfig) -> Color {
    if height <= config.low_band {
        config.low_color
    } else if height <= config.high_band {
        config.mid_color
    } else {
        config.high_color
    }
}

pub fn terrain_colors(grid: &HeightGrid, config: &HeightmapRenderConfig) -> Vec<[f32; 4]> {
    grid.heights()
        .iter()
        .map(|&h| {
            let c = elevation_color(h, config).to_linear();
            [c.red, c.green, c.blue, c.alpha]
        })
        .collect()
}

/// Two triangles per quad, counter-clockwise when seen from above.
pub fn terrain_indices(grid: &HeightGrid) -> Vec<u32> {
    let cells = grid.max_index() as u32;
    let vertices_per_row = cells + 1;
    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);

    for z in 0..cells {
        for x in 0..cells {
            let top_left = z * vertices_per_row + x;
            let top_right = top_left + 1;
            let bottom_left = top_left + vertices_per_row;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[
                top_left, bottom_left, top_right,
                top_right, bottom_left, bottom_right,
            ]);
        }
    }

    indices
}

pub fn create_terrain_mesh(grid: &HeightGrid, config: &HeightmapRenderConfig) -> Mesh {
    let cells = grid.max_index() as f32;
    let uvs: Vec<[f32; 2]> = grid.iter()
        .map(|(x, z, _)| [x as f32 / cells, z as f32 / cells])
        .collect();

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::RENDER_WORLD);
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, terrain_positions(grid, config.cell_size));
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, terrain_colors(grid, config));
    mesh.insert_indices(Indices::U32(terrain_indices(grid)));
    mesh.compute_smooth_normals();
    mesh
}
