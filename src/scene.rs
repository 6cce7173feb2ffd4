// src/scene.rs
use image::RgbaImage;
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pixel rectangle of a camera viewport, origin at the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Maps normalized coordinates (0..1, y up) into this rectangle.
    pub fn denormalize(&self, u: f32, v: f32) -> Vector2<f32> {
        Vector2::new(self.x + u * self.width, self.y + v * self.height)
    }
}

impl Default for ViewportRect {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1280.0, 720.0)
    }
}

/// A shared color texture. Two handles are the same texture only if they
/// point at the same allocation.
#[derive(Debug, Clone)]
pub struct TextureHandle(Arc<RgbaImage>);

impl TextureHandle {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn same_as(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }
}

/// A node in the host scene graph whose world transform the overlay drives.
pub trait SceneNode {
    fn position(&self) -> Vector3<f32>;
    fn set_position(&mut self, position: Vector3<f32>);
    fn rotation(&self) -> UnitQuaternion<f32>;
    fn set_rotation(&mut self, rotation: UnitQuaternion<f32>);

    /// World-space forward (+Z) axis.
    fn forward(&self) -> Vector3<f32> {
        self.rotation() * Vector3::z()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vector3::zeros())
    }
}

impl SceneNode for Transform {
    fn position(&self) -> Vector3<f32> {
        self.position
    }

    fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.rotation = rotation;
    }
}

pub trait Camera {
    /// Current pixel rectangle the camera renders into.
    fn pixel_rect(&self) -> ViewportRect;

    /// World position of a screen point (pixels) at `depth` in front of the camera.
    fn screen_to_world(&self, screen: Vector2<f32>, depth: f32) -> Vector3<f32>;
}

/// Perspective camera looking down world +Z with Y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForegroundCamera {
    pub position: Vector3<f32>,
    pub vertical_fov_degrees: f32,
    pub pixel_rect: ViewportRect,
}

impl Default for ForegroundCamera {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 1.0, -10.0),
            vertical_fov_degrees: 60.0,
            pixel_rect: ViewportRect::default(),
        }
    }
}

impl Camera for ForegroundCamera {
    fn pixel_rect(&self) -> ViewportRect {
        self.pixel_rect
    }

    fn screen_to_world(&self, screen: Vector2<f32>, depth: f32) -> Vector3<f32> {
        let rect = self.pixel_rect;
        let (w, h) = (rect.width.max(1.0), rect.height.max(1.0));

        // Normalized device coordinates in -1..1
        let ndc_x = (screen.x - rect.x) / w * 2.0 - 1.0;
        let ndc_y = (screen.y - rect.y) / h * 2.0 - 1.0;

        let half_h = (self.vertical_fov_degrees.to_radians() * 0.5).tan() * depth;
        let half_w = half_h * rect.aspect();

        self.position + Vector3::new(ndc_x * half_w, ndc_y * half_h, depth)
    }
}

/// A surface with a single, nullable texture slot.
pub trait DisplaySurface {
    fn texture(&self) -> Option<&TextureHandle>;
    fn set_texture(&mut self, texture: TextureHandle);
}

#[derive(Debug, Clone, Default)]
pub struct BackgroundImage {
    texture: Option<TextureHandle>,
}

impl BackgroundImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.texture = None;
    }
}

impl DisplaySurface for BackgroundImage {
    fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    fn set_texture(&mut self, texture: TextureHandle) {
        self.texture = Some(texture);
    }
}

/// The externally owned collaborators an overlay drives each frame.
/// Every slot is independently optional.
#[derive(Default)]
pub struct OverlayScene {
    pub camera: Option<Box<dyn Camera>>,
    pub background: Option<Box<dyn DisplaySurface>>,
    pub overlay: Option<Box<dyn SceneNode>>,
    pub lower_arm: Option<Box<dyn SceneNode>>,
    pub upper_arm: Option<Box<dyn SceneNode>>,
}

impl OverlayScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(mut self, camera: impl Camera + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn with_background(mut self, background: impl DisplaySurface + 'static) -> Self {
        self.background = Some(Box::new(background));
        self
    }

    pub fn with_overlay(mut self, node: impl SceneNode + 'static) -> Self {
        self.overlay = Some(Box::new(node));
        self
    }

    pub fn with_lower_arm(mut self, node: impl SceneNode + 'static) -> Self {
        self.lower_arm = Some(Box::new(node));
        self
    }

    pub fn with_upper_arm(mut self, node: impl SceneNode + 'static) -> Self {
        self.upper_arm = Some(Box::new(node));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_follows_rotation() {
        let mut node = Transform::default();
        assert!((node.forward() - Vector3::z()).norm() < 1e-6);

        node.set_rotation(UnitQuaternion::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        assert!((node.forward() - Vector3::x()).norm() < 1e-5);
    }

    #[test]
    fn test_screen_center_maps_to_optical_axis() {
        let camera = ForegroundCamera::default();
        let rect = camera.pixel_rect();
        let center = rect.denormalize(0.5, 0.5);

        let world = camera.screen_to_world(center, 4.0);
        assert!((world - (camera.position + Vector3::new(0.0, 0.0, 4.0))).norm() < 1e-5);
    }

    #[test]
    fn test_screen_corner_spans_fov() {
        let camera = ForegroundCamera {
            position: Vector3::zeros(),
            vertical_fov_degrees: 90.0,
            pixel_rect: ViewportRect::new(0.0, 0.0, 200.0, 100.0),
        };
        // tan(45°) = 1, so the top edge sits at y = depth
        let world = camera.screen_to_world(Vector2::new(200.0, 100.0), 2.0);
        assert!((world - Vector3::new(4.0, 2.0, 2.0)).norm() < 1e-4);
    }

    #[test]
    fn test_texture_identity() {
        let a = TextureHandle::new(RgbaImage::new(4, 2));
        let b = a.clone();
        let c = TextureHandle::new(RgbaImage::new(4, 2));

        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
        assert_eq!(c.dimensions(), (4, 2));
    }

    #[test]
    fn test_background_slot() {
        let mut background = BackgroundImage::new();
        assert!(background.texture().is_none());

        background.set_texture(TextureHandle::new(RgbaImage::new(1, 1)));
        assert!(background.texture().is_some());

        background.clear();
        assert!(background.texture().is_none());
    }
}
