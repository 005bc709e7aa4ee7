use ac3d_core::{load_scene, parse, ParseOptions, Scene, SurfaceType, VERTEX_STRIDE};
use nalgebra::{Point3, Vector3};

const MATERIALS: &str = "\
MATERIAL \"white\" rgb 1 1 1  amb 0.2 0.2 0.2  emis 0 0 0  spec 0.5 0.5 0.5  shi 10  trans 0
MATERIAL \"glass\" rgb 0.8 0.9 1  amb 0.2 0.2 0.2  emis 0 0 0  spec 1 1 1  shi 64  trans 0.5
";

fn triangle_object(name: &str, material: usize, z: f32) -> String {
    format!(
        "OBJECT poly\nname \"{name}\"\nnumvert 3\n0 0 {z}\n1 0 {z}\n0 1 {z}\nnumsurf 1\n\
         SURF 0x10\nmat {material}\nrefs 3\n0 0 0\n1 1 0\n2 0 1\nkids 0\n"
    )
}

#[test]
fn test_bounding_box_of_line() {
    let text = "AC3Db\nOBJECT poly\nnumvert 2\n0 0 0\n2 3 4\nnumsurf 1\nSURF 0x2\nmat 0\nrefs 2\n0 0 0\n1 0 0\nkids 0\n";
    let scene = load_scene(text.as_bytes(), &ParseOptions::default()).unwrap();
    let bounds = scene.bounding_box;
    assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(bounds.max, Point3::new(2.0, 3.0, 4.0));
}

#[test]
fn test_polygons_batch_across_objects() {
    let text = format!(
        "AC3Db\n{MATERIALS}OBJECT world\nkids 3\n{}{}{}",
        triangle_object("a", 0, 0.0),
        triangle_object("b", 0, 1.0),
        triangle_object("c", 1, 2.0),
    );
    let scene = load_scene(text.as_bytes(), &ParseOptions::default()).unwrap();

    assert_eq!(scene.groups.len(), 2);
    assert_eq!(scene.groups[0].key.material, 0);
    assert_eq!(scene.groups[0].vertex_count(), 6);
    assert_eq!(scene.groups[1].key.material, 1);
    assert_eq!(scene.groups[1].buffer.len(), 3 * VERTEX_STRIDE);

    assert_eq!(scene.opaque_groups().count(), 1);
    assert_eq!(scene.transparent_groups().count(), 1);
    assert!(scene.bounding_box.max.z == 2.0 && scene.bounding_box.min.z == 0.0);
}

#[test]
fn test_dropped_surfaces_leave_no_geometry() {
    let text = "AC3Db\nOBJECT poly\nnumvert 4\n0 0 0\n1 0 0\n2 0 0\n0 1 0\nnumsurf 2\n\
                SURF 0\nmat 0\nrefs 3\n0 0 0\n1 0 0\n2 0 0\n\
                SURF 0\nmat 0\nrefs 3\n0 0 0\n1 0 0\n3 0 0\nkids 0\n";
    let file = parse(text.as_bytes()).unwrap();
    let scene = Scene::build(&file);
    assert_eq!(scene.vertex_count(), 3);
    // The collinear vertex 2 was only used by the dropped surface.
    assert_eq!(scene.bounding_box.max.x, 1.0);
}

#[test]
fn test_smoothing_respects_crease() {
    // Two coplanar triangles and one folded up at 90 degrees along x = 1.
    let text = "AC3Db\nOBJECT poly\ncrease 60\nnumvert 5\n\
                0 0 0\n1 0 0\n1 1 0\n0 1 0\n1 0 1\nnumsurf 3\n\
                SURF 0x10\nmat 0\nrefs 3\n0 0 0\n1 0 0\n2 0 0\n\
                SURF 0x10\nmat 0\nrefs 3\n0 0 0\n2 0 0\n3 0 0\n\
                SURF 0x10\nmat 0\nrefs 3\n1 0 0\n4 0 0\n2 0 0\nkids 0\n";
    let file = parse(text.as_bytes()).unwrap();
    let surfaces = &file.objects[0].surfaces;
    assert_eq!(surfaces.len(), 3);

    // Shared vertex 0 between the coplanar pair blends.
    assert_eq!(surfaces[0].normals[0], surfaces[1].normals[0]);
    assert_eq!(surfaces[0].normals[0], Vector3::new(0.0, 0.0, 2.0));
    // Vertex 1 is shared with the wall, which is past the crease.
    assert_eq!(surfaces[0].normals[1], Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(surfaces[2].normals[0], surfaces[2].normal.vector);
}

#[test]
fn test_concave_polygon_through_pipeline() {
    // An L-shaped hexagon in the xz plane.
    let text = "AC3Db\nOBJECT poly\nnumvert 6\n\
                0 0 0\n0 0 -2\n1 0 -2\n1 0 -1\n2 0 -1\n2 0 0\nnumsurf 1\n\
                SURF 0x20\nmat 0\nrefs 6\n0 0 0\n1 0 0\n2 0 0\n3 0 0\n4 0 0\n5 0 0\nkids 0\n";
    let scene = load_scene(text.as_bytes(), &ParseOptions::default()).unwrap();
    assert_eq!(scene.groups.len(), 1);
    let group = &scene.groups[0];
    assert!(group.key.two_sided);
    assert_eq!(group.key.kind, SurfaceType::Polygon);
    assert_eq!(group.vertex_count(), 12);

    // Every emitted triangle faces the same way as the polygon.
    let expected = group.normal(0);
    for t in 0..4 {
        let a = group.position(3 * t);
        let b = group.position(3 * t + 1);
        let c = group.position(3 * t + 2);
        let n = (b - a).cross(&(c - a));
        assert!(n.dot(&expected) > 0.0);
    }
}
