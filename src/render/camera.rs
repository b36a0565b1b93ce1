use glam::{Mat4, Vec3};

use crate::scene::CameraDescriptor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in degrees.
    Perspective { fov_deg: f32 },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Camera {
    pub fn default_perspective() -> Self {
        Self {
            id: "default".to_string(),
            name: "default_cam".to_string(),
            projection: Projection::Perspective { fov_deg: 60.0 },
            near: 0.1,
            far: 2000.0,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let target = if (self.target - self.position).length_squared() > 1e-12 {
            self.target
        } else {
            self.position + Vec3::NEG_Z
        };
        Mat4::look_at_rh(self.position, target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_deg } => {
                Mat4::perspective_rh(fov_deg.to_radians(), aspect.max(1e-6), self.near, self.far)
            }
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
            } => Mat4::orthographic_rh(left, right, bottom, top, self.near, self.far),
        }
    }
}

/// Builds cameras from their records. Unknown types are skipped; an empty
/// result falls back to a single default perspective camera.
pub fn load_cameras(descriptors: &[CameraDescriptor]) -> Vec<Camera> {
    let mut cameras = Vec::new();
    for d in descriptors {
        let projection = match d.kind.as_str() {
            "perspective" => Projection::Perspective {
                fov_deg: d.angle.unwrap_or(60.0),
            },
            "orthogonal" => Projection::Orthographic {
                left: d.left.unwrap_or(-1.0),
                right: d.right.unwrap_or(1.0),
                top: d.top.unwrap_or(1.0),
                bottom: d.bottom.unwrap_or(-1.0),
            },
            other => {
                log::warn!("Unknown camera type '{other}' for camera '{}', skipping", d.id);
                continue;
            }
        };
        cameras.push(Camera {
            id: d.id.clone(),
            name: format!("{}_cam", d.id),
            projection,
            near: d.near,
            far: d.far,
            position: Vec3::from_array(d.location),
            target: Vec3::from_array(d.target),
        });
    }
    if cameras.is_empty() {
        log::info!("No valid cameras provided, creating a default camera");
        cameras.push(Camera::default_perspective());
    }
    cameras
}

/// The scene's cameras and which one is active. Never empty.
#[derive(Debug, Clone)]
pub struct CameraRig {
    cameras: Vec<Camera>,
    active: usize,
}

impl CameraRig {
    pub fn new(mut cameras: Vec<Camera>, initial: Option<&str>) -> Self {
        if cameras.is_empty() {
            cameras.push(Camera::default_perspective());
        }
        let mut rig = Self { cameras, active: 0 };
        if let Some(id) = initial {
            if !rig.set_active(id) {
                log::warn!("Initial camera '{id}' not found, using '{}'", rig.active().id);
            }
        }
        rig
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn active(&self) -> &Camera {
        &self.cameras[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active]
    }

    /// Accepts either the camera id or its `_cam` name.
    pub fn set_active(&mut self, id_or_name: &str) -> bool {
        match self
            .cameras
            .iter()
            .position(|c| c.id == id_or_name || c.name == id_or_name)
        {
            Some(index) => {
                self.active = index;
                true
            }
            None => false,
        }
    }

    pub fn cycle(&mut self) -> &Camera {
        self.active = (self.active + 1) % self.cameras.len();
        self.active()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CameraMovement {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub aim_left: bool,
    pub aim_right: bool,
    pub aim_up: bool,
    pub aim_down: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Distance to keep between the eye and the written-back target.
    pub focus_distance: f32,
}

impl CameraController {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            focus_distance: 1.0,
        }
    }

    pub fn from_camera(camera: &Camera) -> Self {
        let forward = camera.target - camera.position;
        let (yaw, pitch) = forward_to_yaw_pitch(forward);
        Self {
            position: camera.position,
            yaw,
            pitch,
            focus_distance: forward.length().max(1e-3),
        }
    }

    pub fn apply(&self, camera: &mut Camera) {
        let (forward, _, _) = self.basis();
        camera.position = self.position;
        camera.target = self.position + forward * self.focus_distance;
    }

    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let cos_pitch = self.pitch.cos();
        let forward = Vec3::new(self.yaw.cos() * cos_pitch, self.pitch.sin(), self.yaw.sin() * cos_pitch);
        let right = Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos());
        let up = right.cross(forward).normalize_or_zero();
        (forward, right, up)
    }

    pub fn move_horizontal(&mut self, right: f32, up: f32, forward: f32) {
        let forward_dir = Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin());
        let right_dir = Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos());
        self.position += right_dir * right + Vec3::Y * up + forward_dir * forward;
    }

    pub fn update_movement(&mut self, input: &CameraMovement, frame_dt: f32) -> bool {
        let move_speed = 1.5 * frame_dt;
        let aim_speed = 1.8 * frame_dt;
        let mut changed = false;

        if input.aim_left {
            self.yaw -= aim_speed;
            changed = true;
        }
        if input.aim_right {
            self.yaw += aim_speed;
            changed = true;
        }
        if input.aim_up {
            self.pitch += aim_speed;
            changed = true;
        }
        if input.aim_down {
            self.pitch -= aim_speed;
            changed = true;
        }
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        self.pitch = self.pitch.clamp(-limit, limit);

        let mut forward = 0.0;
        let mut right = 0.0;
        let mut up = 0.0;
        if input.move_forward {
            forward += move_speed;
        }
        if input.move_backward {
            forward -= move_speed;
        }
        if input.move_left {
            right -= move_speed;
        }
        if input.move_right {
            right += move_speed;
        }
        if input.move_up {
            up += move_speed;
        }
        if input.move_down {
            up -= move_speed;
        }

        if forward != 0.0 || right != 0.0 || up != 0.0 {
            self.move_horizontal(right, up, forward);
            changed = true;
        }

        changed
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let n = forward / forward.length().max(1e-6);
    let yaw = n.z.atan2(n.x);
    let pitch = n.y.clamp(-1.0, 1.0).asin();
    (yaw, pitch)
}
