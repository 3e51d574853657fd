//! Diamond-square terrain: the fractal heightmap generator and the Bevy
//! plugins that turn its grid into a vertex-colored mesh.

pub mod heightmapgenerator;
pub mod rendering;
