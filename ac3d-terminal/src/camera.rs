/// Orbiting camera framed on a scene's bounding box
use ac3d_core::BoundingBox;
use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};

/// Field of view used when framing a model, in degrees
pub const DEFAULT_FOV: f32 = 45.0;

pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view, radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: DEFAULT_FOV.to_radians(),
            aspect: aspect(width, height),
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Place the camera so the whole box is in view: looking at its centre
    /// from the direction of its (xmin, ymax, zmax) corner, far enough back
    /// for the field of view to cover it
    pub fn fit_to_bounding_box(bounds: &BoundingBox, width: u32, height: u32) -> Self {
        let mut camera = Self::new(width, height);
        if bounds.is_empty() {
            return camera;
        }

        let center = bounds.center();
        let corner = Point3::new(bounds.min.x, bounds.max.y, bounds.max.z);
        let offset = corner - center;
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            camera.target = center;
            camera.eye = center + Vector3::z();
            return camera;
        }

        let distance = radius / (camera.fov * 0.5).tan();
        camera.target = center;
        camera.eye = center + offset.normalize() * distance;
        camera.far = (distance + radius) * 4.0;
        camera.near = camera.far / 10_000.0;
        camera
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect(width, height);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Swing the eye around the target: `yaw` about the up vector, `pitch`
    /// about the camera's right axis
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.eye - self.target;
        let right = self.up.cross(&offset);
        let mut rotation = Rotation3::from_axis_angle(&Unit::new_normalize(self.up), yaw);
        if right.norm() > f32::EPSILON {
            rotation = Rotation3::from_axis_angle(&Unit::new_normalize(right), -pitch) * rotation;
        }
        self.eye = self.target + rotation * offset;
        self.up = rotation * self.up;
    }

    /// Scale the eye's distance from the target
    pub fn zoom(&mut self, factor: f32) {
        self.eye = self.target + (self.eye - self.target) * factor;
    }

    /// Project a point to screen space. Returns (x, y, depth) or `None` when
    /// the point is outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        view_projection: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let clip = view_projection * point.to_homogeneous();
        if clip.w <= self.near * 0.5 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;
        Some((screen_x, screen_y, ndc.z))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    // Terminal cells are roughly twice as tall as they are wide.
    width as f32 / (height.max(1) as f32 * 2.0)
}
