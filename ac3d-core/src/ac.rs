/// Parser for AC3D scene files
///
/// The format is a whitespace-separated token stream: a header token, then
/// any number of `MATERIAL` records and `OBJECT` trees. Each object is a run
/// of labelled fields closed by a mandatory `kids` field, which gives the
/// number of child objects that follow.
///
/// Vertices are transformed into root space as they are read, polygons are
/// triangulated, and per-vertex normals are smoothed once an object's
/// surfaces are complete. Surfaces that cannot be turned into geometry are
/// dropped without failing the parse.
use log::{debug, warn};
use nalgebra::{Matrix4, Vector2, Vector3};

use crate::config::ParseOptions;
use crate::error::{FormatError, FormatResult, SurfaceError};
use crate::geometry::{Material, Object, SceneFile, Surface};
use crate::normals::{face_normal, project, smooth_normals, SharedVertices};
use crate::stream::Stream;
use crate::transform::{transform_vertex, NodeTransform};
use crate::triangulate::triangulate;

pub const MATERIAL_TOKEN: &str = "MATERIAL";
pub const OBJECT_TOKEN: &str = "OBJECT";
pub const MAGIC_PREFIX: &str = "AC3D";

/// Parse a scene with default options
pub fn parse(data: &[u8]) -> FormatResult<SceneFile> {
    parse_with_options(data, &ParseOptions::default())
}

pub fn parse_with_options(data: &[u8], options: &ParseOptions) -> FormatResult<SceneFile> {
    let mut parser = Parser {
        stream: Stream::with_numeric_mode(data, options.numeric_mode),
        options: *options,
        material_count: 0,
    };
    parser.parse_file()
}

struct Parser<'a> {
    stream: Stream<'a>,
    options: ParseOptions,
    material_count: usize,
}

impl Parser<'_> {
    fn parse_file(&mut self) -> FormatResult<SceneFile> {
        let magic = self.stream.read_token()?;
        if self.options.require_magic && !magic.starts_with(MAGIC_PREFIX) {
            return Err(FormatError::UnexpectedToken {
                expected: "AC3D header",
                found: magic.to_string(),
            });
        }

        let mut file = SceneFile::default();
        let root = Matrix4::identity();

        while self.stream.pending() {
            match self.stream.read_token()? {
                MATERIAL_TOKEN => {
                    file.materials.push(self.parse_material()?);
                    self.material_count = file.materials.len();
                }
                OBJECT_TOKEN => file.objects.push(self.parse_object(&root, 1)?),
                other => warn!("skipping unexpected top-level token {other:?}"),
            }
        }

        debug!(
            "parsed {} materials, {} objects, {} surfaces",
            file.materials.len(),
            file.node_count(),
            file.surface_count()
        );
        Ok(file)
    }

    fn parse_material(&mut self) -> FormatResult<Material> {
        let name = self.stream.read_string()?.to_string();
        let diffuse = self.labelled_color("rgb")?;
        let ambient = self.labelled_color("amb")?;
        let emissive = self.labelled_color("emis")?;
        let specular = self.labelled_color("spec")?;
        self.stream.expect_token("shi")?;
        let shininess = self.stream.read_float()?;
        self.stream.expect_token("trans")?;
        let transparency = self.stream.read_float()?;

        Ok(Material {
            name,
            diffuse,
            ambient,
            emissive,
            specular,
            shininess,
            transparency,
        })
    }

    fn labelled_color(&mut self, label: &'static str) -> FormatResult<Vector3<f32>> {
        self.stream.expect_token(label)?;
        Ok(Vector3::from(self.stream.read_vector::<3>()?))
    }

    fn parse_object(&mut self, parent: &Matrix4<f32>, depth: usize) -> FormatResult<Object> {
        if depth > self.options.max_depth {
            return Err(FormatError::NestingTooDeep {
                limit: self.options.max_depth,
            });
        }
        let mut object = Object::new(self.stream.read_string()?);
        object.crease = self.options.default_crease;

        loop {
            let label = match self.stream.read_token() {
                Err(FormatError::UnexpectedEof) => return Err(FormatError::MissingKids),
                other => other?,
            };
            match label {
                "name" => object.name = Some(self.stream.read_string()?.to_string()),
                "data" => {
                    let len = self.stream.read_count()?;
                    object.data = Some(self.stream.read_blob(len)?.to_vec());
                }
                "texture" => object.texture = Some(self.stream.read_string()?.to_string()),
                "texrep" => object.texture_repeat = Vector2::from(self.stream.read_vector::<2>()?),
                "texoff" => object.texture_offset = Vector2::from(self.stream.read_vector::<2>()?),
                "rot" => {
                    object.transform.rotation =
                        NodeTransform::rotation_from_columns(&self.stream.read_vector::<9>()?);
                }
                "loc" => object.transform.translation = Vector3::from(self.stream.read_vector::<3>()?),
                "crease" => object.crease = self.stream.read_float()?,
                "url" => object.url = Some(self.stream.read_string()?.to_string()),
                "numvert" => self.parse_vertices(&mut object, parent)?,
                "numsurf" => self.parse_surfaces(&mut object)?,
                "kids" => {
                    let kids = self.stream.read_count()?;
                    let accumulated = object.transform.accumulate(parent);
                    for _ in 0..kids {
                        self.stream.expect_token(OBJECT_TOKEN)?;
                        object.children.push(self.parse_object(&accumulated, depth + 1)?);
                    }
                    break;
                }
                MATERIAL_TOKEN | OBJECT_TOKEN => return Err(FormatError::MissingKids),
                other => warn!("skipping unknown object field {other:?}"),
            }
        }

        if !object.surfaces.is_empty() {
            let shared = SharedVertices::build(&object.surfaces);
            smooth_normals(&mut object.surfaces, &shared, object.crease);
        }
        Ok(object)
    }

    fn parse_vertices(&mut self, object: &mut Object, parent: &Matrix4<f32>) -> FormatResult<()> {
        let count = self.stream.read_count()?;
        let transform = object.transform.accumulate(parent);

        let mut vertices = Vec::with_capacity(count.min(self.stream.remaining()));
        for _ in 0..count {
            vertices.push(transform_vertex(&transform, self.stream.read_vector::<3>()?));
        }
        object.vertices = vertices;
        Ok(())
    }

    fn parse_surfaces(&mut self, object: &mut Object) -> FormatResult<()> {
        let count = self.stream.read_count()?;

        let mut surfaces = Vec::with_capacity(count.min(self.stream.remaining()));
        for _ in 0..count {
            let (mut surface, flags) = self.parse_surface(object)?;
            let built = match flags {
                Some(flags) => Err(SurfaceError::UnknownType(flags)),
                None => tessellate(&mut surface, object),
            };
            match built {
                Ok(()) => surfaces.push(surface),
                Err(e) => debug!(
                    "dropping surface of {:?}: {e}",
                    object.name.as_deref().unwrap_or(&object.kind)
                ),
            }
        }
        object.surfaces = surfaces;
        Ok(())
    }

    /// Read one surface record. The second value holds the flags of a `SURF`
    /// with an unknown type; such a surface is read in full, then dropped.
    fn parse_surface(&mut self, object: &Object) -> FormatResult<(Surface, Option<i64>)> {
        let mut surface = Surface::default();
        let mut unknown_flags = None;

        loop {
            match self.stream.read_token()? {
                "SURF" => {
                    let flags = self.stream.read_integer()?;
                    if surface.set_flags(flags).is_none() {
                        unknown_flags = Some(flags);
                    }
                }
                "mat" => {
                    surface.material = self.stream.read_count()?;
                    if surface.material >= self.material_count {
                        warn!(
                            "surface uses material {} but only {} are defined",
                            surface.material, self.material_count
                        );
                    }
                }
                "refs" => {
                    self.parse_refs(&mut surface, object)?;
                    return Ok((surface, unknown_flags));
                }
                other => warn!("skipping unknown surface field {other:?}"),
            }
        }
    }

    fn parse_refs(&mut self, surface: &mut Surface, object: &Object) -> FormatResult<()> {
        let count = self.stream.read_count()?;
        let capacity = count.min(self.stream.remaining());
        surface.indices = Vec::with_capacity(capacity);
        surface.uvs = Vec::with_capacity(capacity);

        for _ in 0..count {
            let index = self.stream.read_count()?;
            if index >= object.vertices.len() {
                return Err(FormatError::VertexIndexOutOfRange {
                    index,
                    count: object.vertices.len(),
                });
            }
            let [u, v] = self.stream.read_vector::<2>()?;
            surface.indices.push(index);
            surface.uvs.push(object.map_uv(u, v));
        }
        Ok(())
    }
}

/// Compute a polygon's face normal and rewrite polygons with more than
/// three references as a triangle list. Line surfaces pass through.
fn tessellate(surface: &mut Surface, object: &Object) -> Result<(), SurfaceError> {
    if !surface.kind.is_polygon() {
        return Ok(());
    }
    if surface.indices.len() < 3 {
        return Err(SurfaceError::TooFewVertices);
    }

    surface.normal =
        face_normal(&object.vertices, &surface.indices).ok_or(SurfaceError::Degenerate)?;

    if surface.indices.len() > 3 {
        let points = project(&object.vertices, &surface.indices, &surface.normal.vector);
        let triangles = triangulate(&points).ok_or(SurfaceError::Triangulation)?;

        let order = triangles.iter().flatten();
        surface.indices = order.clone().map(|&i| surface.indices[i]).collect();
        surface.uvs = order.map(|&i| surface.uvs[i]).collect();
    }
    Ok(())
}
