use glam::{Mat4, Vec3};

/// A perspective camera for 3D scenes.
///
/// Provides position, orientation, field of view and clip planes. Walk
/// controllers produce one of these per frame; the renderer and picking rays
/// consume it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov: f32, // radians, vertical
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: 0.8,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    pub fn looking_at(mut self, target: impl Into<Vec3>) -> Self {
        let forward = (target.into() - self.position).normalize_or_zero();
        if forward != Vec3::ZERO {
            self.forward = forward;
        }
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        let right = self.forward.cross(self.up).normalize_or_zero();
        if right == Vec3::ZERO {
            // Looking straight up or down
            Vec3::X
        } else {
            right
        }
    }

    /// Recompute up to be orthogonal to forward and right.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.orthogonal_up())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect.max(f32::EPSILON), self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_at_normalizes_direction() {
        let camera = Camera::new()
            .at([0.0, 2.0, 0.0])
            .looking_at([0.0, 2.0, -10.0]);
        assert_eq!(camera.forward, Vec3::NEG_Z);
        assert_eq!(camera.right(), Vec3::X);
    }

    #[test]
    fn straight_down_still_has_a_basis() {
        // The exhibition's initial camera target is directly below it
        let camera = Camera::new()
            .at([0.0, 2.0, 0.0])
            .looking_at([0.0, -8.0, 0.0]);
        assert_eq!(camera.forward, Vec3::NEG_Y);
        let up = camera.orthogonal_up();
        assert!((up.length() - 1.0).abs() < 1e-5);
        assert!(up.dot(camera.forward).abs() < 1e-5);
        assert!(camera.view_matrix().is_finite());
    }
}
