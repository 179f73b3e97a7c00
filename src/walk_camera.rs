//! A first-person walking camera with gravity and box collisions.
//!
//! [`WalkCamera`] is the visitor's body inside the exhibition. Looking around
//! is done by dragging with the left mouse button; movement keys come from
//! [`KeyBindings`]. When gravity is enabled the camera falls by a fixed
//! displacement per 60 Hz frame and walks on the horizontal plane; when
//! collisions are enabled every move is swept against the per-triangle world
//! boxes of the collidable environment nodes.
//!
//! # Example
//!
//! ```ignore
//! let mut walker = WalkCamera::from_config(&config.camera, &config.physics);
//! walker.apply_gravity = true;
//! walker.check_collisions = true;
//!
//! // In the frame loop:
//! walker.update(&input, dt, scene.colliders());
//! scene.camera = walker.camera();
//! ```

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::collision::{self, Aabb};
use crate::config::{CameraConfig, KeyBindings, PhysicsConfig};
use crate::input::Input;

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Frame rate the gravity displacement is expressed in.
pub const GRAVITY_FRAME_RATE: f32 = 60.0;

#[derive(Clone, Debug)]
pub struct WalkCamera {
    pub position: Vec3,
    /// Horizontal angle in radians. 0 = looking toward -Z.
    pub yaw: f32,
    /// Vertical angle in radians. 0 = horizontal, positive = up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Radians per pixel of drag.
    pub sensitivity: f32,
    /// Units per second.
    pub speed: f32,
    pub keys: KeyBindings,
    /// Collision body radii.
    pub ellipsoid: Vec3,
    /// Displacement per 60 Hz frame.
    pub gravity: Vec3,
    pub apply_gravity: bool,
    pub check_collisions: bool,
    pub near: f32,
    pub far: f32,
}

impl Default for WalkCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), &PhysicsConfig::default())
    }
}

impl WalkCamera {
    /// Build a camera at the configured spawn point, facing the configured
    /// target. Gravity and collisions start disabled.
    pub fn from_config(camera: &CameraConfig, physics: &PhysicsConfig) -> Self {
        let position = Vec3::from(camera.position);
        let mut walker = Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: camera.fov_degrees.to_radians(),
            sensitivity: camera.sensitivity,
            speed: camera.speed,
            keys: camera.keys.clone(),
            ellipsoid: Vec3::from(camera.ellipsoid),
            gravity: Vec3::from(physics.gravity),
            apply_gravity: false,
            check_collisions: false,
            near: 0.1,
            far: 1000.0,
        };
        walker.look_toward(Vec3::from(camera.target) - position);
        walker
    }

    /// Point the camera along a direction.
    pub fn look_toward(&mut self, direction: Vec3) {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        // Straight up or down keeps the current heading
        if dir.x.abs() > 1e-6 || dir.z.abs() > 1e-6 {
            self.yaw = dir.x.atan2(-dir.z);
        }
        self.pitch = dir.y.asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
        .normalize_or_zero()
    }

    fn right_direction(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin()).normalize_or_zero()
    }

    /// Direction of the forward key. Walking stays on the horizontal plane
    /// while gravity holds the camera to the floor.
    fn walk_direction(&self) -> Vec3 {
        if self.apply_gravity {
            Vec3::new(self.yaw.sin(), 0.0, -self.yaw.cos())
        } else {
            self.forward_direction()
        }
    }

    /// The collision body at the current position.
    pub fn body(&self) -> Aabb {
        Aabb::from_center(self.position, self.ellipsoid)
    }

    /// Advance one frame.
    pub fn update(&mut self, input: &Input, dt: f32, colliders: &[Aabb]) {
        if input.mouse_down(MouseButton::Left) {
            let delta = input.mouse_delta();
            self.yaw += delta.x * self.sensitivity;
            self.pitch = (self.pitch - delta.y * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        let forward = self.walk_direction();
        let right = self.right_direction();
        let mut velocity = Vec3::ZERO;

        if input.any_down(&self.keys.forward) {
            velocity += forward;
        }
        if input.any_down(&self.keys.backward) {
            velocity -= forward;
        }
        if input.any_down(&self.keys.left) {
            velocity -= right;
        }
        if input.any_down(&self.keys.right) {
            velocity += right;
        }
        if input.any_down(&self.keys.up) {
            velocity += Vec3::Y;
        }
        if input.any_down(&self.keys.down) {
            velocity -= Vec3::Y;
        }

        let mut displacement = Vec3::ZERO;
        if velocity.length_squared() > 0.0 {
            displacement += velocity.normalize() * self.speed * dt;
        }
        if self.apply_gravity {
            displacement += self.gravity * dt * GRAVITY_FRAME_RATE;
        }
        if displacement == Vec3::ZERO {
            return;
        }

        if self.check_collisions {
            self.position += collision::sweep(self.body(), displacement, colliders);
        } else {
            self.position += displacement;
        }
    }

    pub fn camera(&self) -> Camera {
        Camera {
            position: self.position,
            forward: self.forward_direction(),
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use winit::keyboard::KeyCode;

    const FRAME: f32 = 1.0 / 60.0;

    fn level_walker() -> WalkCamera {
        let mut walker = WalkCamera::default();
        walker.look_toward(Vec3::NEG_Z);
        walker
    }

    fn floor() -> Aabb {
        Aabb::new(Vec3::new(-50.0, -1.0, -50.0), Vec3::new(50.0, 0.0, 50.0))
    }

    #[test]
    fn spawns_at_configured_pose() {
        let walker = WalkCamera::default();
        assert_eq!(walker.position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(walker.ellipsoid, Vec3::new(1.0, 1.5, 1.0));
        assert!(walker.pitch < -1.5, "initial target is below the camera");
        assert!(!walker.apply_gravity);
    }

    #[test]
    fn look_requires_drag() {
        let mut walker = level_walker();
        let mut input = Input::new();
        input.move_mouse(Vec2::ZERO);
        input.move_mouse(Vec2::new(100.0, 0.0));

        walker.update(&input, FRAME, &[]);
        assert_eq!(walker.yaw, 0.0);

        input.press_mouse(MouseButton::Left);
        walker.update(&input, FRAME, &[]);
        assert!((walker.yaw - 100.0 * walker.sensitivity).abs() < 1e-6);
    }

    #[test]
    fn bound_keys_move_the_camera() {
        let mut walker = level_walker();
        let mut input = Input::new();
        input.press_key(KeyCode::ArrowUp);
        walker.update(&input, 1.0, &[]);
        assert!((walker.position.z + walker.speed).abs() < 1e-4);

        let mut input = Input::new();
        input.press_key(KeyCode::KeyE);
        let before = walker.position.y;
        walker.update(&input, 1.0, &[]);
        assert!(walker.position.y > before);
    }

    #[test]
    fn gravity_settles_on_the_floor() {
        let mut walker = level_walker();
        walker.apply_gravity = true;
        walker.check_collisions = true;
        let input = Input::new();

        for _ in 0..120 {
            walker.update(&input, FRAME, &[floor()]);
        }
        assert!((walker.position.y - 1.5).abs() < 1e-4);
    }

    #[test]
    fn without_collisions_gravity_falls_through() {
        let mut walker = level_walker();
        walker.apply_gravity = true;
        let input = Input::new();
        walker.update(&input, FRAME, &[floor()]);
        assert!((walker.position.y - 1.1).abs() < 1e-4);
    }

    #[test]
    fn gravity_walks_on_the_horizontal_plane() {
        let mut walker = WalkCamera::default();
        walker.apply_gravity = true;
        walker.check_collisions = true;
        walker.position = Vec3::new(0.0, 1.5, 0.0);
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);

        walker.update(&input, 0.5, &[floor()]);
        assert!((walker.position.y - 1.5).abs() < 1e-4);
        assert!(walker.position.z < -2.9);
    }

    #[test]
    fn single_mesh_room_keeps_the_visitor_inside() {
        let room = crate::collision::tests::room_shell(
            Vec3::new(-20.0, -1.0, -20.0),
            Vec3::new(20.0, 5.0, 20.0),
        );
        let colliders: Vec<Aabb> = collision::triangle_boxes(&room, glam::Mat4::IDENTITY).collect();
        let mut walker = WalkCamera::default();
        walker.apply_gravity = true;
        walker.check_collisions = true;
        let input = Input::new();

        for _ in 0..120 {
            walker.update(&input, FRAME, &colliders);
        }
        assert!((walker.position.y - 0.5).abs() < 1e-3, "y = {}", walker.position.y);

        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);
        for _ in 0..20 {
            walker.update(&input, 1.0, &colliders);
        }
        assert!((walker.position.z + 19.0).abs() < 1e-3, "z = {}", walker.position.z);
        assert!((walker.position.y - 0.5).abs() < 1e-3);
    }
}
