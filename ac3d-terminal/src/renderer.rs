/// ASCII rasterizer for terminal rendering
use ac3d_core::{RenderGroup, Scene, SurfaceType};
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Vector2, Vector3};
use std::io::Write;

use crate::camera::Camera;
use crate::textures::TextureSet;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Character used for line surfaces
const LINE_CHAR: char = '#';

/// Brightness floor so faces turned from the light stay visible
const AMBIENT: f32 = 0.15;

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    uv: Vector2<f32>,
}

/// Per-group state shared by every primitive in it
struct Shading<'a> {
    diffuse: Vector3<f32>,
    texture: Option<usize>,
    textures: &'a TextureSet,
    /// Transparent groups are depth tested but leave the depth buffer alone
    write_depth: bool,
}

impl Shading<'_> {
    fn color(&self, uv: &Vector2<f32>, brightness: f32) -> Color {
        let base = self
            .texture
            .and_then(|id| self.textures.sample(id, uv))
            .map(|[r, g, b, _]| {
                Vector3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
                    .component_mul(&self.diffuse)
            })
            .unwrap_or(self.diffuse);
        let lit = base * brightness.clamp(AMBIENT, 1.0);
        Color::Rgb {
            r: (lit.x.clamp(0.0, 1.0) * 255.0) as u8,
            g: (lit.y.clamp(0.0, 1.0) * 255.0) as u8,
            b: (lit.z.clamp(0.0, 1.0) * 255.0) as u8,
        }
    }
}

/// ASCII renderer that converts render groups to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
    }

    /// Character at a cell, for inspection
    pub fn cell(&self, x: usize, y: usize) -> char {
        self.char_buffer[y * self.width + x]
    }

    /// Draw opaque groups, then transparent ones over them
    pub fn render_scene(&mut self, scene: &Scene, camera: &Camera, textures: &TextureSet) {
        let view_projection = camera.projection_matrix() * camera.view_matrix();
        let light = (camera.eye - camera.target).normalize();

        for group in scene.opaque_groups() {
            self.render_group(scene, group, camera, &view_projection, &light, textures, true);
        }
        for group in scene.transparent_groups() {
            self.render_group(scene, group, camera, &view_projection, &light, textures, false);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_group(
        &mut self,
        scene: &Scene,
        group: &RenderGroup,
        camera: &Camera,
        view_projection: &Matrix4<f32>,
        light: &Vector3<f32>,
        textures: &TextureSet,
        write_depth: bool,
    ) {
        let diffuse = scene
            .material(group.key.material)
            .map(|material| material.diffuse)
            .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0));
        let shading = Shading {
            diffuse,
            texture: group.key.texture,
            textures,
            write_depth,
        };

        let projected: Vec<Option<ScreenVertex>> = group
            .vertices()
            .map(|vertex| {
                let position = nalgebra::Point3::new(vertex[0], vertex[1], vertex[2]);
                camera
                    .project_to_screen(
                        &position,
                        view_projection,
                        self.width as u32,
                        self.height as u32,
                    )
                    .map(|(x, y, depth)| ScreenVertex {
                        x,
                        y,
                        depth,
                        uv: Vector2::new(vertex[3], vertex[4]),
                    })
            })
            .collect();

        match group.key.kind {
            SurfaceType::Polygon => {
                for (t, corners) in projected.chunks_exact(3).enumerate() {
                    let [Some(a), Some(b), Some(c)] = [corners[0], corners[1], corners[2]] else {
                        continue; // Triangle is clipped
                    };
                    let normal = (0..3)
                        .map(|i| group.normal(3 * t + i))
                        .fold(Vector3::zeros(), |sum, n| sum + n);
                    let brightness = lambert(&normal, light, group.key.two_sided);
                    self.rasterize_triangle([a, b, c], brightness, &shading);
                }
            }
            SurfaceType::LineStrip | SurfaceType::LineLoop => {
                let count = projected.len();
                let segments = match group.key.kind {
                    SurfaceType::LineLoop if count > 2 => count,
                    _ => count.saturating_sub(1),
                };
                for i in 0..segments {
                    if let (Some(a), Some(b)) = (projected[i], projected[(i + 1) % count]) {
                        self.rasterize_line(a, b, &shading);
                    }
                }
            }
        }
    }

    fn rasterize_triangle(&mut self, v: [ScreenVertex; 3], brightness: f32, shading: &Shading) {
        let [v0, v1, v2] = v;

        // Bounding box, clipped to screen bounds
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i32;
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i32).min(self.width as i32 - 1);
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i32;
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i32).min(self.height as i32 - 1);

        let char_index = ((brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize)
            .clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), p)
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                let uv = v0.uv * w0 + v1.uv * w1 + v2.uv * w2;
                self.plot(x as usize, y as usize, depth, character, shading.color(&uv, brightness), shading.write_depth);
            }
        }
    }

    /// DDA line between two projected vertices
    fn rasterize_line(&mut self, a: ScreenVertex, b: ScreenVertex, shading: &Shading) {
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
                continue;
            }
            let depth = a.depth + (b.depth - a.depth) * t;
            let uv = a.uv + (b.uv - a.uv) * t;
            self.plot(x as usize, y as usize, depth, LINE_CHAR, shading.color(&uv, 1.0), shading.write_depth);
        }
    }

    fn plot(&mut self, x: usize, y: usize, depth: f32, character: char, color: Color, write_depth: bool) {
        let idx = y * self.width + x;
        if depth < self.depth_buffer[idx] {
            if write_depth {
                self.depth_buffer[idx] = depth;
            }
            self.char_buffer[idx] = character;
            self.color_buffer[idx] = color;
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                writer.queue(SetForegroundColor(self.color_buffer[idx]))?;
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Diffuse term for a (possibly unnormalized) normal. Two-sided faces are
/// lit from either side.
fn lambert(normal: &Vector3<f32>, light: &Vector3<f32>, two_sided: bool) -> f32 {
    let Some(n) = normal.try_normalize(f32::EPSILON) else {
        return AMBIENT;
    };
    let d = n.dot(light);
    if two_sided {
        d.abs()
    } else {
        d.max(0.0)
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac3d_core::{load_scene, ParseOptions};

    const QUAD: &str = "AC3Db\n\
        MATERIAL \"red\" rgb 1 0 0  amb 0.2 0.2 0.2  emis 0 0 0  spec 0 0 0  shi 0  trans 0\n\
        OBJECT poly\nnumvert 4\n-1 -1 0\n1 -1 0\n1 1 0\n-1 1 0\nnumsurf 1\n\
        SURF 0x10\nmat 0\nrefs 4\n0 0 0\n1 0 0\n2 0 0\n3 0 0\nkids 0\n";

    fn front_camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(width, height);
        camera.eye = nalgebra::Point3::new(0.0, 0.0, 4.0);
        camera
    }

    #[test]
    fn test_quad_fills_center() {
        let scene = load_scene(QUAD.as_bytes(), &ParseOptions::default()).unwrap();
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_scene(&scene, &front_camera(40, 20), &TextureSet::default());

        // Facing the light head on: brightest character.
        assert_eq!(renderer.cell(20, 10), '@');
        assert_eq!(renderer.cell(0, 0), ' ');
        assert_eq!(renderer.color_buffer[10 * 40 + 20], Color::Rgb { r: 255, g: 0, b: 0 });
    }

    #[test]
    fn test_line_loop_draws_outline() {
        let text = QUAD.replace("SURF 0x10", "SURF 0x1");
        let scene = load_scene(text.as_bytes(), &ParseOptions::default()).unwrap();
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_scene(&scene, &front_camera(40, 20), &TextureSet::default());

        assert_eq!(renderer.cell(20, 10), ' ');
        let drawn = renderer.char_buffer.iter().filter(|&&c| c == LINE_CHAR).count();
        assert!(drawn > 0);
    }

    #[test]
    fn test_transparent_keeps_depth() {
        let text = QUAD.replace("trans 0", "trans 0.5");
        let scene = load_scene(text.as_bytes(), &ParseOptions::default()).unwrap();
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render_scene(&scene, &front_camera(40, 20), &TextureSet::default());

        assert_ne!(renderer.cell(20, 10), ' ');
        assert!(renderer.depth_buffer.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_clear() {
        let scene = load_scene(QUAD.as_bytes(), &ParseOptions::default()).unwrap();
        let mut renderer = AsciiRenderer::new(10, 10);
        renderer.render_scene(&scene, &front_camera(10, 10), &TextureSet::default());
        renderer.clear();
        assert!(renderer.char_buffer.iter().all(|&c| c == ' '));
    }

    #[test]
    fn test_lambert_two_sided() {
        let light = Vector3::z();
        let back = Vector3::new(0.0, 0.0, -2.0);
        assert_eq!(lambert(&back, &light, false), 0.0);
        assert_eq!(lambert(&back, &light, true), 1.0);
        assert_eq!(lambert(&Vector3::zeros(), &light, true), AMBIENT);
    }
}
