/// Scene graph data model produced by the parser
use nalgebra::{Point3, Vector2, Vector3};

use crate::config::DEFAULT_CREASE;
use crate::transform::NodeTransform;

/// Surface flag bits
pub const SURFACE_TYPE_MASK: i64 = 0x0f;
pub const SURFACE_SHADED: i64 = 0x10;
pub const SURFACE_TWO_SIDED: i64 = 0x20;

/// Object type tag of light nodes, which carry no renderable geometry
pub const LIGHT_TYPE: &str = "light";

/// A parsed `MATERIAL` record
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub emissive: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
    /// 0 is fully opaque
    pub transparency: f32,
}

impl Material {
    /// Whether groups using this material belong in the blended pass
    pub fn is_transparent(&self) -> bool {
        self.transparency != 0.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            ambient: Vector3::new(0.2, 0.2, 0.2),
            emissive: Vector3::zeros(),
            specular: Vector3::new(0.5, 0.5, 0.5),
            shininess: 10.0,
            transparency: 0.0,
        }
    }
}

/// Primitive type of a surface, taken from the low nibble of its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SurfaceType {
    Polygon = 0,
    LineLoop = 1,
    LineStrip = 2,
}

impl SurfaceType {
    pub fn from_flags(flags: i64) -> Option<Self> {
        match flags & SURFACE_TYPE_MASK {
            0 => Some(Self::Polygon),
            1 => Some(Self::LineLoop),
            2 => Some(Self::LineStrip),
            _ => None,
        }
    }

    pub fn is_polygon(self) -> bool {
        self == Self::Polygon
    }
}

/// Unnormalized face normal together with its length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceNormal {
    pub vector: Vector3<f32>,
    pub magnitude: f32,
}

impl FaceNormal {
    /// The placeholder carried by line surfaces
    pub fn flat() -> Self {
        Self {
            vector: Vector3::zeros(),
            magnitude: 1.0,
        }
    }
}

impl Default for FaceNormal {
    fn default() -> Self {
        Self::flat()
    }
}

/// One `SURF` record: a polygon or a polyline over the owning object's
/// vertices
///
/// `indices`, `uvs` and `normals` run in parallel. Polygons with more than
/// three references are stored as a triangle list once triangulated.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub kind: SurfaceType,
    pub shaded: bool,
    pub two_sided: bool,
    pub material: usize,
    pub indices: Vec<usize>,
    pub uvs: Vec<Vector2<f32>>,
    pub normal: FaceNormal,
    /// One normal per vertex reference. Shaded surfaces hold crease-smoothed
    /// sums, unshaded ones repeat the face normal.
    pub normals: Vec<Vector3<f32>>,
}

impl Surface {
    pub fn new(kind: SurfaceType) -> Self {
        Self {
            kind,
            shaded: false,
            two_sided: false,
            material: 0,
            indices: Vec::new(),
            uvs: Vec::new(),
            normal: FaceNormal::flat(),
            normals: Vec::new(),
        }
    }

    /// Apply the `SURF` flag word
    pub fn set_flags(&mut self, flags: i64) -> Option<()> {
        self.kind = SurfaceType::from_flags(flags)?;
        self.shaded = flags & SURFACE_SHADED != 0;
        self.two_sided = flags & SURFACE_TWO_SIDED != 0;
        Some(())
    }

    /// Normal emitted for the `i`th vertex reference
    pub fn vertex_normal(&self, i: usize) -> Vector3<f32> {
        if self.shaded {
            self.normals.get(i).copied().unwrap_or(self.normal.vector)
        } else {
            self.normal.vector
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(SurfaceType::Polygon)
    }
}

/// One `OBJECT` node of the scene tree
///
/// Vertices are stored already transformed to root space; `transform` keeps
/// the node's own placement for reference only.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub kind: String,
    pub name: Option<String>,
    pub data: Option<Vec<u8>>,
    pub texture: Option<String>,
    pub texture_offset: Vector2<f32>,
    pub texture_repeat: Vector2<f32>,
    pub transform: NodeTransform,
    /// Degrees
    pub crease: f32,
    pub url: Option<String>,
    pub vertices: Vec<Point3<f32>>,
    pub surfaces: Vec<Surface>,
    pub children: Vec<Object>,
}

impl Object {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            data: None,
            texture: None,
            texture_offset: Vector2::zeros(),
            texture_repeat: Vector2::new(1.0, 1.0),
            transform: NodeTransform::identity(),
            crease: DEFAULT_CREASE,
            url: None,
            vertices: Vec::new(),
            surfaces: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_light(&self) -> bool {
        self.kind == LIGHT_TYPE
    }

    /// Map a raw `refs` texture coordinate through this node's repeat and
    /// offset
    pub fn map_uv(&self, u: f32, v: f32) -> Vector2<f32> {
        Vector2::new(
            self.texture_offset.x + u * self.texture_repeat.x,
            self.texture_offset.y + v * self.texture_repeat.y,
        )
    }

    /// Number of nodes in this subtree, this node included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Object::node_count).sum::<usize>()
    }

    /// Visit this node and its descendants depth first, parents before
    /// children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Object)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new("world")
    }
}

/// A fully parsed scene file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFile {
    pub materials: Vec<Material>,
    pub objects: Vec<Object>,
}

impl SceneFile {
    pub fn node_count(&self) -> usize {
        self.objects.iter().map(Object::node_count).sum()
    }

    pub fn surface_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |object| count += object.surfaces.len());
        count
    }

    /// Visit every node of every root, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Object)) {
        for object in &self.objects {
            object.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_flags() {
        let mut surface = Surface::default();
        assert!(surface.set_flags(0x31).is_some());
        assert_eq!(surface.kind, SurfaceType::LineLoop);
        assert!(surface.shaded);
        assert!(surface.two_sided);

        assert!(surface.set_flags(0x02).is_some());
        assert_eq!(surface.kind, SurfaceType::LineStrip);
        assert!(!surface.shaded);
        assert!(!surface.two_sided);

        assert!(surface.set_flags(0x07).is_none());
    }

    #[test]
    fn test_object_defaults() {
        let object = Object::new("poly");
        assert_eq!(object.crease, 61.0);
        assert_eq!(object.texture_repeat, Vector2::new(1.0, 1.0));
        assert_eq!(object.texture_offset, Vector2::zeros());
        assert_eq!(object.transform, NodeTransform::identity());
        assert!(!object.is_light());
    }

    #[test]
    fn test_map_uv() {
        let mut object = Object::new("poly");
        object.texture_offset = Vector2::new(0.5, 0.25);
        object.texture_repeat = Vector2::new(2.0, 4.0);
        assert_eq!(object.map_uv(1.0, 1.0), Vector2::new(2.5, 4.25));
    }

    #[test]
    fn test_walk_order() {
        let mut root = Object::new("world");
        let mut a = Object::new("group");
        a.name = Some("a".to_string());
        let mut a1 = Object::new("poly");
        a1.name = Some("a1".to_string());
        a.children.push(a1);
        let mut b = Object::new("poly");
        b.name = Some("b".to_string());
        root.children.push(a);
        root.children.push(b);

        let mut names = Vec::new();
        root.walk(&mut |o| names.push(o.name.clone().unwrap_or_default()));
        assert_eq!(names, vec!["", "a", "a1", "b"]);
        assert_eq!(root.node_count(), 4);
    }

    #[test]
    fn test_material_transparency() {
        let mut material = Material::default();
        assert!(!material.is_transparent());
        material.transparency = 0.5;
        assert!(material.is_transparent());
    }
}
