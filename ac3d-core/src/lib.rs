/// AC3D Core Library - Scene parsing, triangulation and render batching
///
/// Turns an AC3D model held in memory into sorted, interleaved render
/// batches, and decodes SGI images for its textures. Nothing here reads
/// files or talks to a graphics device.

pub mod ac;
pub mod config;
pub mod error;
pub mod geometry;
pub mod normals;
pub mod scene;
pub mod sgi;
pub mod stream;
pub mod transform;
pub mod triangulate;

// Re-export commonly used types
pub use ac::{parse, parse_with_options};
pub use config::{NumericMode, ParseOptions};
pub use error::{FormatError, ImageError, SurfaceError};
pub use geometry::{Material, Object, SceneFile, Surface, SurfaceType};
pub use scene::{BoundingBox, GroupKey, RenderGroup, Scene, VERTEX_STRIDE};
pub use sgi::DecodedImage;

/// Parse a model and build its render batches in one step
pub fn load_scene(data: &[u8], options: &ParseOptions) -> Result<Scene, FormatError> {
    let file = parse_with_options(data, options)?;
    Ok(Scene::build(&file))
}
