/// Render batches built from a parsed scene file
///
/// The object tree is flattened into [`RenderGroup`]s, one per distinct
/// material / texture / sidedness / primitive combination, each holding an
/// interleaved vertex buffer ready for upload. Groups are sorted so a
/// renderer can draw them with few state changes.
use std::collections::HashMap;

use log::info;
use nalgebra::{Point3, Vector2, Vector3};

use crate::geometry::{Material, Object, SceneFile, Surface, SurfaceType};

/// Floats per vertex: position (3), uv (2), normal (3)
pub const VERTEX_STRIDE: usize = 8;
pub const POSITION_OFFSET: usize = 0;
pub const UV_OFFSET: usize = 3;
pub const NORMAL_OFFSET: usize = 5;

/// What a group of surfaces has in common.
///
/// Ordering is the draw order: primitive type, then texture (untextured
/// first), then material, then one-sided before two-sided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub kind: SurfaceType,
    pub texture: Option<usize>,
    pub material: usize,
    pub two_sided: bool,
}

impl GroupKey {
    pub fn for_surface(surface: &Surface, texture: Option<usize>) -> Self {
        Self {
            kind: surface.kind,
            texture,
            material: surface.material,
            two_sided: surface.two_sided,
        }
    }
}

/// Geometry drawn in one call
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGroup {
    pub key: GroupKey,
    /// Interleaved vertices, [`VERTEX_STRIDE`] floats each
    pub buffer: Vec<f32>,
}

impl RenderGroup {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            buffer: Vec::new(),
        }
    }

    pub fn push_vertex(&mut self, position: &Point3<f32>, uv: &Vector2<f32>, normal: &Vector3<f32>) {
        self.buffer.extend_from_slice(&[
            position.x, position.y, position.z, uv.x, uv.y, normal.x, normal.y, normal.z,
        ]);
    }

    pub fn vertex_count(&self) -> usize {
        self.buffer.len() / VERTEX_STRIDE
    }

    /// Iterate the buffer one vertex at a time
    pub fn vertices(&self) -> impl Iterator<Item = &[f32]> {
        self.buffer.chunks_exact(VERTEX_STRIDE)
    }

    pub fn position(&self, vertex: usize) -> Point3<f32> {
        let base = vertex * VERTEX_STRIDE + POSITION_OFFSET;
        Point3::new(self.buffer[base], self.buffer[base + 1], self.buffer[base + 2])
    }

    pub fn normal(&self, vertex: usize) -> Vector3<f32> {
        let base = vertex * VERTEX_STRIDE + NORMAL_OFFSET;
        Vector3::new(self.buffer[base], self.buffer[base + 1], self.buffer[base + 2])
    }
}

/// Axis-aligned bounds of everything placed in a group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// An empty box that any point widens
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn extend(&mut self, point: &Point3<f32>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Everything a renderer needs to draw a model
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub materials: Vec<Material>,
    /// Texture file names in first-use order; a group's texture id indexes
    /// this list
    pub textures: Vec<String>,
    pub groups: Vec<RenderGroup>,
    pub bounding_box: BoundingBox,
}

impl Scene {
    pub fn build(file: &SceneFile) -> Self {
        let mut builder = SceneBuilder::default();
        for object in &file.objects {
            builder.add_object(object);
        }

        let mut groups = builder.groups;
        // Stable, so line groups sharing a key keep their tree order.
        groups.sort_by_key(|group| group.key);

        let scene = Self {
            materials: file.materials.clone(),
            textures: builder.textures,
            groups,
            bounding_box: builder.bounding_box,
        };
        info!(
            "built {} render groups with {} vertices and {} textures",
            scene.groups.len(),
            scene.vertex_count(),
            scene.textures.len()
        );
        scene
    }

    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Whether a group belongs in the blended pass. Groups naming an
    /// undefined material are drawn opaque.
    pub fn is_transparent(&self, group: &RenderGroup) -> bool {
        self.material(group.key.material)
            .is_some_and(Material::is_transparent)
    }

    pub fn opaque_groups(&self) -> impl Iterator<Item = &RenderGroup> {
        self.groups.iter().filter(|group| !self.is_transparent(group))
    }

    pub fn transparent_groups(&self) -> impl Iterator<Item = &RenderGroup> {
        self.groups.iter().filter(|group| self.is_transparent(group))
    }

    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(RenderGroup::vertex_count).sum()
    }
}

#[derive(Default)]
struct SceneBuilder {
    textures: Vec<String>,
    groups: Vec<RenderGroup>,
    polygon_groups: HashMap<GroupKey, usize>,
    bounding_box: BoundingBox,
}

impl SceneBuilder {
    fn add_object(&mut self, object: &Object) {
        if !object.is_light() && !object.surfaces.is_empty() {
            let texture = object.texture.as_deref().map(|name| self.texture_id(name));
            for surface in &object.surfaces {
                self.add_surface(object, surface, texture);
            }
        }
        for child in &object.children {
            self.add_object(child);
        }
    }

    fn add_surface(&mut self, object: &Object, surface: &Surface, texture: Option<usize>) {
        let key = GroupKey::for_surface(surface, texture);
        let group = self.group(key);

        for (i, (&index, uv)) in surface.indices.iter().zip(&surface.uvs).enumerate() {
            let position = &object.vertices[index];
            self.groups[group].push_vertex(position, uv, &surface.vertex_normal(i));
            self.bounding_box.extend(position);
        }
    }

    /// Index of the group for `key`. Polygon groups are shared; every line
    /// surface gets a group of its own.
    fn group(&mut self, key: GroupKey) -> usize {
        if key.kind == SurfaceType::Polygon {
            if let Some(&index) = self.polygon_groups.get(&key) {
                return index;
            }
        }
        let index = self.groups.len();
        self.groups.push(RenderGroup::new(key));
        if key.kind == SurfaceType::Polygon {
            self.polygon_groups.insert(key, index);
        }
        index
    }

    fn texture_id(&mut self, name: &str) -> usize {
        match self.textures.iter().position(|texture| texture == name) {
            Some(id) => id,
            None => {
                self.textures.push(name.to_string());
                self.textures.len() - 1
            }
        }
    }
}
