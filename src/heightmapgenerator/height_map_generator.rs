use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};
use image::{ImageBuffer, Luma};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::diamond_square::{DEFAULT_SEED_ELEVATION, DiamondSquare, HeightGrid, MIN_RESOLUTION};

/// Largest resolution offered in the panel.
pub const UI_MAX_RESOLUTION: u32 = 512;

#[derive(Resource, Clone, Debug)]
pub struct HeightmapConfig {
    pub resolution: u32,      // cells per side, power of two
    pub roughness: f32,       // displacement amplitude of the first pass
    pub seed_elevation: f32,  // corner and flattened edge height
    pub seed: u64,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            roughness: 30.0,
            seed_elevation: DEFAULT_SEED_ELEVATION,
            seed: 42,
        }
    }
}

/// Random source shared by every generation. Reseeding it with the same
/// seed replays the same sequence of terrains.
#[derive(Resource)]
pub struct HeightmapRng(pub ChaCha8Rng);

impl HeightmapRng {
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

/// The most recently generated grid.
#[derive(Resource)]
pub struct CurrentHeightmap {
    pub grid: HeightGrid,
    pub seed: u64,
    pub generation: u32, // counts every terrain built this session, from 1
}

#[derive(Event, Default)]
pub struct GenerateHeightmapEvent;

/// Replaces the seed, restarts the random source from it and requests a terrain.
#[derive(Event)]
pub struct ReseedHeightmapEvent(pub u64);

#[derive(Event)]
pub struct HeightmapGeneratedEvent {
    pub resolution: u32,
    pub generation: u32,
    pub min_height: f32,
    pub max_height: f32,
}

/// Systems that change `CurrentHeightmap`. Consumers of the grid run after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeightmapGenerationSet;

#[derive(Debug, Error)]
pub enum HeightmapExportError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub struct HeightmapGeneratorPlugin;

impl Plugin for HeightmapGeneratorPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<HeightmapConfig>()
            .add_event::<GenerateHeightmapEvent>()
            .add_event::<ReseedHeightmapEvent>()
            .add_event::<HeightmapGeneratedEvent>()
            .add_systems(Startup, setup_heightmap_generator)
            .add_systems(Update, (
                handle_reseed,
                handle_heightmap_generation,
            ).chain().in_set(HeightmapGenerationSet))
            .add_systems(EguiPrimaryContextPass, heightmap_ui);
    }
}

pub fn setup_heightmap_generator(
    mut commands: Commands,
    config: Res<HeightmapConfig>,
    mut requests: EventWriter<GenerateHeightmapEvent>,
) {
    commands.insert_resource(HeightmapRng::from_seed_u64(config.seed));
    requests.write(GenerateHeightmapEvent);
}

pub fn handle_reseed(
    mut events: EventReader<ReseedHeightmapEvent>,
    mut config: ResMut<HeightmapConfig>,
    rng: Option<ResMut<HeightmapRng>>,
    mut requests: EventWriter<GenerateHeightmapEvent>,
) {
    let Some(&ReseedHeightmapEvent(seed)) = events.read().last() else {
        return;
    };
    let Some(mut rng) = rng else {
        warn!("Reseed requested before the random source was set up");
        return;
    };

    info!("Reseeding heightmap generator with {}", seed);
    config.seed = seed;
    *rng = HeightmapRng::from_seed_u64(seed);
    requests.write(GenerateHeightmapEvent);
}

pub fn handle_heightmap_generation(
    mut commands: Commands,
    mut requests: EventReader<GenerateHeightmapEvent>,
    config: Res<HeightmapConfig>,
    rng: Option<ResMut<HeightmapRng>>,
    current: Option<ResMut<CurrentHeightmap>>,
    mut generated: EventWriter<HeightmapGeneratedEvent>,
) {
    // several requests in one frame collapse into one terrain
    if requests.read().count() == 0 {
        return;
    }
    let Some(mut rng) = rng else {
        warn!("Heightmap requested before the random source was set up");
        return;
    };

    info!(
        "Generating heightmap: resolution {}, roughness {:.2}, seed {}",
        config.resolution, config.roughness, config.seed
    );

    let generator = DiamondSquare::with_seed_elevation(config.seed_elevation);
    let grid = match generator.generate(config.resolution, config.roughness, &mut rng.0) {
        Ok(grid) => grid,
        Err(e) => {
            error!("Failed to generate heightmap: {}", e);
            return;
        }
    };

    let (min_height, max_height) = grid.height_range();
    let generation = current.as_ref().map_or(1, |c| c.generation + 1);
    info!("Height range: {:.2} to {:.2}", min_height, max_height);

    match current {
        Some(mut current) => {
            current.grid = grid;
            current.seed = config.seed;
            current.generation = generation;
        }
        None => commands.insert_resource(CurrentHeightmap {
            grid,
            seed: config.seed,
            generation,
        }),
    }

    generated.write(HeightmapGeneratedEvent {
        resolution: config.resolution,
        generation,
        min_height,
        max_height,
    });
}

pub fn heightmap_ui(
    mut contexts: EguiContexts,
    mut config: ResMut<HeightmapConfig>,
    current: Option<Res<CurrentHeightmap>>,
    mut requests: EventWriter<GenerateHeightmapEvent>,
    mut reseed: EventWriter<ReseedHeightmapEvent>,
) -> Result {
    egui::Window::new("Diamond-Square Terrain")
        .default_width(320.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.heading("Terrain Settings");

            let mut exponent = config.resolution.max(MIN_RESOLUTION).trailing_zeros();
            ui.add(
                egui::Slider::new(
                    &mut exponent,
                    MIN_RESOLUTION.trailing_zeros()..=UI_MAX_RESOLUTION.trailing_zeros(),
                )
                .text("Resolution (2^n)"),
            );
            config.resolution = 1 << exponent;
            ui.label(format!("Grid: {0} x {0}", config.resolution + 1));

            ui.add(egui::Slider::new(&mut config.roughness, 0.0..=60.0).text("Roughness"));
            ui.add(
                egui::Slider::new(&mut config.seed_elevation, -10.0..=20.0)
                    .text("Seed Elevation"),
            );

            ui.separator();
            ui.heading("Generation");

            if ui.button("Regenerate").clicked() {
                requests.write(GenerateHeightmapEvent);
            }

            let mut seed = config.seed;
            ui.horizontal(|ui| {
                ui.label("Seed");
                if ui.add(egui::DragValue::new(&mut seed)).changed() {
                    reseed.write(ReseedHeightmapEvent(seed));
                }
            });
            if ui.button("Random Seed").clicked() {
                reseed.write(ReseedHeightmapEvent(rand::random()));
            }

            if let Some(current) = current.as_deref() {
                let (min, max) = current.grid.height_range();
                ui.label(format!("Terrain #{}", current.generation));
                ui.label(format!("Height range: {:.2} to {:.2}", min, max));

                if ui.button("Save Heightmap PNG").clicked() {
                    let filename = heightmap_filename(current);
                    match generate_and_save_heightmap(&current.grid, &filename) {
                        Ok(()) => info!("Heightmap saved as {}", filename.display()),
                        Err(e) => error!("Failed to save heightmap: {}", e),
                    }
                }
            }
        });
    Ok(())
}

pub fn heightmap_filename(current: &CurrentHeightmap) -> PathBuf {
    PathBuf::from(format!(
        "heightmap_{}_{}_{}.png",
        current.grid.max_index(),
        current.seed,
        current.generation
    ))
}

/// Grayscale image of the grid, lowest cell black and highest white.
/// A flat grid maps to mid gray.
pub fn heightmap_image(grid: &HeightGrid) -> ImageBuffer<Luma<u8>, Vec<u8>> {
    // validated resolutions stay far below u32::MAX
    let side = grid.size() as u32;
    let (min_height, max_height) = grid.height_range();
    let height_range = max_height - min_height;

    let mut img_buffer = ImageBuffer::new(side, side);
    for (x, z, pixel) in img_buffer.enumerate_pixels_mut() {
        let height = grid.get(x as usize, z as usize);
        let normalized = if height_range > 0.0 {
            ((height - min_height) / height_range * 255.0).round() as u8
        } else {
            128
        };
        *pixel = Luma([normalized]);
    }
    img_buffer
}

pub fn generate_and_save_heightmap(grid: &HeightGrid, path: &Path) -> Result<(), HeightmapExportError> {
    heightmap_image(grid).save(path)?;
    Ok(())
}
