pub mod camera;
pub mod input;

pub use camera::CameraPlugin;
pub use input::InputPlugin;
