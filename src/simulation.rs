// src/simulation.rs - Scripted stand-in for a Kinect sensor manager
use image::{Rgba, RgbaImage};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};
use crate::kinect::{JointType, PersonId, TrackingService};
use crate::scene::{Camera, TextureHandle, ViewportRect};

// Kinect v2 color camera focal length at 1920x1080
const COLOR_FOCAL_1080P: f32 = 1060.0;
const FIRST_TRACKING_ID: u64 = 72_057_594_037_927_936;

type Skeleton = [Option<Vector3<f32>>; JointType::COUNT];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub person_count: usize,
    /// Frames before the sensor reports itself initialized.
    pub warmup_frames: u32,
    /// Every Nth frame the right wrist drops out. 0 disables dropout.
    pub dropout_period: u32,
    pub frame_rate: f32,
    pub color_width: u32,
    pub color_height: u32,
    /// Optional image used as the color feed instead of a generated gradient.
    pub still_image: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            person_count: 1,
            warmup_frames: 5,
            dropout_period: 0,
            frame_rate: 30.0,
            color_width: 1920,
            color_height: 1080,
            still_image: None,
        }
    }
}

pub struct SimulatedKinect {
    config: SimulationConfig,
    sim_time: f64,
    frame_counter: u32,
    color_texture: TextureHandle,
    skeletons: Vec<Skeleton>,
}

impl SimulatedKinect {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let color = match &config.still_image {
            Some(path) => image::open(path)
                .map_err(|source| Error::Image {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8(),
            None => gradient(config.color_width, config.color_height),
        };

        let mut sensor = Self {
            config,
            sim_time: 0.0,
            frame_counter: 0,
            color_texture: TextureHandle::new(color),
            skeletons: Vec::new(),
        };
        sensor.pose_skeletons();
        Ok(sensor)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn frame(&self) -> u32 {
        self.frame_counter
    }

    pub fn time(&self) -> f64 {
        self.sim_time
    }

    /// Steps the simulation by one sensor frame of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.frame_counter += 1;
        self.sim_time += dt;
        if self.frame_counter == self.config.warmup_frames {
            debug!(frame = self.frame_counter, "Simulated sensor initialized");
        }
        self.pose_skeletons();
    }

    fn pose_skeletons(&mut self) {
        let count = self.config.person_count;
        self.skeletons = (0..count)
            .map(|i| {
                let lateral = (i as f32 - (count as f32 - 1.0) / 2.0) * 0.8;
                let phase = self.sim_time as f32 + i as f32 * 0.7;
                skeleton_at(lateral, 2.0 + 0.2 * i as f32, phase)
            })
            .collect();
    }

    fn person_slot(&self, person: PersonId) -> Option<usize> {
        let slot = person.0.checked_sub(FIRST_TRACKING_ID)? as usize;
        (slot < self.skeletons.len()).then_some(slot)
    }

    fn wrist_dropped(&self) -> bool {
        self.config.dropout_period > 0 && self.frame_counter % self.config.dropout_period == 0
    }

    fn camera_space_joint(&self, person: PersonId, joint: JointType) -> Option<Vector3<f32>> {
        self.skeletons[self.person_slot(person)?][joint.index()]
    }

    /// Maps a camera-space point (meters) through the color image onto `rect`,
    /// then into world space at the point's depth.
    fn project_point(&self, point: Vector3<f32>, camera: &dyn Camera, rect: &ViewportRect) -> Option<Vector3<f32>> {
        if point.z <= 0.0 {
            return None;
        }

        let width = self.config.color_width as f32;
        let height = self.config.color_height as f32;
        let focal = COLOR_FOCAL_1080P * width / 1920.0;

        let px = width * 0.5 + focal * point.x / point.z;
        let py = height * 0.5 - focal * point.y / point.z;
        if !(0.0..width).contains(&px) || !(0.0..height).contains(&py) {
            return None;
        }

        // Image rows run downward, screen coordinates upward
        let screen = rect.denormalize(px / width, 1.0 - py / height);
        Some(camera.screen_to_world(screen, point.z))
    }
}

impl TrackingService for SimulatedKinect {
    fn is_initialized(&self) -> bool {
        self.frame_counter >= self.config.warmup_frames
    }

    fn is_any_person_detected(&self) -> bool {
        self.is_initialized() && !self.skeletons.is_empty()
    }

    fn person_id_at_index(&self, index: usize) -> Option<PersonId> {
        if self.is_initialized() && index < self.skeletons.len() {
            Some(PersonId(FIRST_TRACKING_ID + index as u64))
        } else {
            None
        }
    }

    fn is_joint_tracked(&self, person: PersonId, joint: JointType) -> bool {
        if joint == JointType::WristRight && self.wrist_dropped() {
            return false;
        }
        self.camera_space_joint(person, joint).is_some()
    }

    fn projected_joint_position(
        &self,
        person: PersonId,
        joint: JointType,
        camera: &dyn Camera,
        rect: &ViewportRect,
    ) -> Option<Vector3<f32>> {
        let point = self.camera_space_joint(person, joint)?;
        self.project_point(point, camera, rect)
    }

    fn live_color_texture(&self) -> Option<TextureHandle> {
        self.is_initialized().then(|| self.color_texture.clone())
    }
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    let (w, h) = (width.max(1), height.max(1));
    RgbaImage::from_fn(w, h, |x, y| {
        Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 96, 255])
    })
}

/// Upper body of a person standing at `depth` with the right arm swinging.
fn skeleton_at(lateral: f32, depth: f32, t: f32) -> Skeleton {
    let mut joints: Skeleton = [None; JointType::COUNT];
    let mut set = |joint: JointType, x: f32, y: f32, z: f32| {
        joints[joint.index()] = Some(Vector3::new(lateral + x, y, depth + z));
    };

    set(JointType::SpineBase, 0.0, -0.3, 0.0);
    set(JointType::SpineMid, 0.0, 0.0, 0.0);
    set(JointType::SpineShoulder, 0.0, 0.3, 0.0);
    set(JointType::Neck, 0.0, 0.38, 0.0);
    set(JointType::Head, 0.0, 0.5, 0.0);

    set(JointType::ShoulderLeft, -0.18, 0.3, 0.0);
    set(JointType::ElbowLeft, -0.25, 0.05, 0.0);
    set(JointType::WristLeft, -0.28, -0.18, 0.0);
    set(JointType::HandLeft, -0.29, -0.26, 0.0);

    let shoulder = Vector3::new(0.18, 0.3, 0.0);
    let elbow = Vector3::new(0.28 + 0.04 * t.sin(), 0.08 + 0.05 * (t + 1.5).sin(), -0.05);
    let swing = 0.5 * t;
    let forearm = Vector3::new(0.5 * swing.cos(), 0.6 + 0.3 * swing.sin(), -0.4 * (0.7 * swing).sin()).normalize();
    let wrist = elbow + forearm * 0.26;
    let hand = wrist + forearm * 0.08;

    for (joint, p) in [
        (JointType::ShoulderRight, shoulder),
        (JointType::ElbowRight, elbow),
        (JointType::WristRight, wrist),
        (JointType::HandRight, hand),
    ] {
        set(joint, p.x, p.y, p.z);
    }

    joints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ForegroundCamera;

    fn ready_sensor(config: SimulationConfig) -> SimulatedKinect {
        let warmup = config.warmup_frames;
        let mut sensor = SimulatedKinect::new(config).unwrap();
        for _ in 0..warmup {
            sensor.advance(1.0 / 30.0);
        }
        sensor
    }

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            color_width: 192,
            color_height: 108,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_warmup() {
        let mut sensor = SimulatedKinect::new(small_config()).unwrap();
        for _ in 0..4 {
            assert!(!sensor.is_initialized());
            assert!(!sensor.is_any_person_detected());
            assert!(sensor.live_color_texture().is_none());
            sensor.advance(1.0 / 30.0);
        }
        sensor.advance(1.0 / 30.0);

        assert!(sensor.is_initialized());
        assert!(sensor.is_any_person_detected());
        assert_eq!(sensor.live_color_texture().unwrap().dimensions(), (192, 108));
    }

    #[test]
    fn test_person_ids() {
        let sensor = ready_sensor(SimulationConfig {
            person_count: 2,
            ..small_config()
        });

        let first = sensor.person_id_at_index(0).unwrap();
        let second = sensor.person_id_at_index(1).unwrap();
        assert_ne!(first, second);
        assert!(sensor.person_id_at_index(2).is_none());

        assert!(sensor.is_joint_tracked(second, JointType::ElbowRight));
        assert!(!sensor.is_joint_tracked(PersonId(3), JointType::ElbowRight));
    }

    #[test]
    fn test_nobody_in_view() {
        let sensor = ready_sensor(SimulationConfig {
            person_count: 0,
            ..small_config()
        });
        assert!(sensor.is_initialized());
        assert!(!sensor.is_any_person_detected());
        assert!(sensor.person_id_at_index(0).is_none());
    }

    #[test]
    fn test_unsimulated_joints_untracked() {
        let sensor = ready_sensor(small_config());
        let person = sensor.person_id_at_index(0).unwrap();
        assert!(sensor.is_joint_tracked(person, JointType::HandRight));
        assert!(!sensor.is_joint_tracked(person, JointType::KneeLeft));
        assert!(!sensor.is_joint_tracked(person, JointType::ThumbRight));
    }

    #[test]
    fn test_wrist_dropout() {
        let mut sensor = ready_sensor(SimulationConfig {
            dropout_period: 3,
            warmup_frames: 1,
            ..small_config()
        });
        let person = sensor.person_id_at_index(0).unwrap();

        let mut dropped = 0;
        for _ in 0..9 {
            sensor.advance(1.0 / 30.0);
            if !sensor.is_joint_tracked(person, JointType::WristRight) {
                dropped += 1;
            }
            assert!(sensor.is_joint_tracked(person, JointType::ElbowRight));
        }
        assert_eq!(dropped, 3);
    }

    #[test]
    fn test_optical_axis_projects_to_viewport_center() {
        let sensor = ready_sensor(small_config());
        let camera = ForegroundCamera {
            position: Vector3::zeros(),
            ..ForegroundCamera::default()
        };
        let rect = camera.pixel_rect;

        let world = sensor.project_point(Vector3::new(0.0, 0.0, 2.5), &camera, &rect).unwrap();
        assert!((world - Vector3::new(0.0, 0.0, 2.5)).norm() < 1e-4);
    }

    #[test]
    fn test_projection_keeps_side() {
        let sensor = ready_sensor(small_config());
        let camera = ForegroundCamera::default();
        let rect = camera.pixel_rect;

        let up_right = sensor.project_point(Vector3::new(0.3, 0.2, 2.0), &camera, &rect).unwrap();
        assert!(up_right.x > camera.position.x);
        assert!(up_right.y > camera.position.y);
    }

    #[test]
    fn test_projection_rejects_out_of_frame() {
        let sensor = ready_sensor(small_config());
        let camera = ForegroundCamera::default();
        let rect = camera.pixel_rect;

        assert!(sensor.project_point(Vector3::new(0.0, 0.0, -1.0), &camera, &rect).is_none());
        assert!(sensor.project_point(Vector3::new(5.0, 0.0, 1.0), &camera, &rect).is_none());
    }

    #[test]
    fn test_right_arm_moves() {
        let mut sensor = ready_sensor(small_config());
        let person = sensor.person_id_at_index(0).unwrap();
        let before = sensor.camera_space_joint(person, JointType::WristRight).unwrap();

        for _ in 0..15 {
            sensor.advance(1.0 / 30.0);
        }

        let after = sensor.camera_space_joint(person, JointType::WristRight).unwrap();
        assert!((after - before).norm() > 1e-3);

        // Forearm length is fixed
        let elbow = sensor.camera_space_joint(person, JointType::ElbowRight).unwrap();
        assert!(((after - elbow).norm() - 0.26).abs() < 1e-4);
    }

    #[test]
    fn test_missing_still_image() {
        let config = SimulationConfig {
            still_image: Some(PathBuf::from("/nonexistent/mirror-background.png")),
            ..small_config()
        };
        assert!(matches!(SimulatedKinect::new(config), Err(Error::Image { .. })));
    }
}
