/// SGI textures referenced by a scene, loaded from disk
use std::fs;
use std::path::Path;

use ac3d_core::sgi::{self, DecodedImage};
use ac3d_core::Scene;
use log::{debug, warn};
use nalgebra::Vector2;

/// One slot per entry in [`Scene::textures`]. A slot is `None` when the file
/// could not be read or decoded; those groups fall back to material colour.
#[derive(Debug, Default)]
pub struct TextureSet {
    images: Vec<Option<DecodedImage>>,
}

impl TextureSet {
    /// Load every texture named by the scene. Relative names resolve
    /// against `base_dir`, normally the model's directory.
    pub fn load(scene: &Scene, base_dir: &Path) -> Self {
        let images = scene
            .textures
            .iter()
            .map(|name| load_texture(&base_dir.join(name)))
            .collect();
        Self { images }
    }

    pub fn from_images(images: Vec<Option<DecodedImage>>) -> Self {
        Self { images }
    }

    pub fn get(&self, id: usize) -> Option<&DecodedImage> {
        self.images.get(id).and_then(Option::as_ref)
    }

    pub fn loaded(&self) -> usize {
        self.images.iter().filter(|image| image.is_some()).count()
    }

    /// Nearest texel at `uv`, with v = 0 at the bottom of the image.
    /// Power-of-two images repeat; others clamp to the edge.
    pub fn sample(&self, id: usize, uv: &Vector2<f32>) -> Option<[u8; 4]> {
        let image = self.get(id)?;
        if image.width == 0 || image.height == 0 {
            return None;
        }

        let (u, v) = if image.is_power_of_two() {
            (uv.x.rem_euclid(1.0), uv.y.rem_euclid(1.0))
        } else {
            (uv.x.clamp(0.0, 1.0), uv.y.clamp(0.0, 1.0))
        };
        let x = ((u * image.width as f32) as usize).min(image.width - 1);
        let y = (((1.0 - v) * image.height as f32) as usize).min(image.height - 1);
        Some(image.pixel(x, y))
    }
}

fn load_texture(path: &Path) -> Option<DecodedImage> {
    let name = path.to_string_lossy();
    if !path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(sgi::is_sgi_extension)
    {
        warn!("texture {name} is not an SGI image, ignoring");
        return None;
    }

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            warn!("cannot read texture {name}: {err}");
            return None;
        }
    };

    match sgi::decode(&data) {
        Ok(image) => {
            debug!("loaded texture {name} ({}x{})", image.width, image.height);
            Some(image)
        }
        Err(err) => {
            warn!("cannot decode texture {name}: {err}");
            None
        }
    }
}
