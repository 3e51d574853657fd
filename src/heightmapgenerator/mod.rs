pub mod diamond_square;
pub mod height_map_generator;
pub mod height_map_renderer;

pub use diamond_square::{DiamondSquare, HeightGrid, HeightmapError, generate};

pub use height_map_generator::HeightmapConfig;
pub use height_map_generator::HeightmapRng;
pub use height_map_generator::CurrentHeightmap;
pub use height_map_generator::GenerateHeightmapEvent;
pub use height_map_generator::ReseedHeightmapEvent;
pub use height_map_generator::HeightmapGenerationSet;
pub use height_map_generator::HeightmapGeneratorPlugin;

pub use height_map_renderer::HeightmapRenderConfig;
pub use height_map_renderer::HeightmapRendererPlugin;
