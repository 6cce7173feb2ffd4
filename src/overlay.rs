// src/overlay.rs - Drives the arm overlay nodes from tracked joints
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::kinect::{JointType, PersonId, TrackingService};
use crate::orient::{horizontal, look_rotation, normalize_or_zero, rotate_towards};
use crate::scene::{OverlayScene, SceneNode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// 0 is the first detected person, 1 the second, and so on.
    pub player_index: usize,
    pub hand_joint: JointType,
    pub wrist_joint: JointType,
    pub elbow_joint: JointType,
    pub shoulder_joint: JointType,
    /// Largest turn applied to a node per frame. 180 or more snaps straight to the target.
    pub max_turn_degrees: f32,
    /// Treat a hand sample at exactly the origin as a failed projection.
    pub skip_zero_samples: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            player_index: 0,
            hand_joint: JointType::HandRight,
            wrist_joint: JointType::WristRight,
            elbow_joint: JointType::ElbowRight,
            shoulder_joint: JointType::ShoulderRight,
            max_turn_degrees: 360.0,
            skip_zero_samples: true,
        }
    }
}

/// What a single update managed to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub ready: bool,
    pub background_bound: bool,
    pub person: Option<PersonId>,
    pub overlay_moved: bool,
    pub overlay_rotated: bool,
    pub lower_arm_updated: bool,
    pub upper_arm_updated: bool,
}

impl FrameReport {
    pub fn arm_updated(&self) -> bool {
        self.lower_arm_updated || self.upper_arm_updated
    }
}

pub struct PoseOverlay<S> {
    config: OverlayConfig,
    tracking: Option<S>,
    // Kept as component state; the update does not read it.
    initial_rotation: UnitQuaternion<f32>,
}

impl<S: TrackingService> PoseOverlay<S> {
    pub fn new(config: OverlayConfig, tracking: Option<S>) -> Self {
        Self {
            config,
            tracking,
            initial_rotation: UnitQuaternion::from_euler_angles(0.0, 90f32.to_radians(), 0.0),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn initial_rotation(&self) -> UnitQuaternion<f32> {
        self.initial_rotation
    }

    pub fn tracking(&self) -> Option<&S> {
        self.tracking.as_ref()
    }

    pub fn tracking_mut(&mut self) -> Option<&mut S> {
        self.tracking.as_mut()
    }

    /// Called once when the overlay becomes active.
    pub fn start(&self, scene: &OverlayScene) {
        match scene.upper_arm.as_deref() {
            Some(upper_arm) => {
                let forward = upper_arm.forward();
                info!(x = forward.x, y = forward.y, z = forward.z, "Overlay started, upper arm forward");
            }
            None => info!("Overlay started without an upper arm node"),
        }
    }

    /// Runs one frame. Any missing collaborator skips only the work that depends on it.
    pub fn update(&self, scene: &mut OverlayScene) -> FrameReport {
        let mut report = FrameReport::default();

        let Some(tracking) = self.tracking.as_ref() else {
            return report;
        };
        let OverlayScene {
            camera,
            background,
            overlay,
            lower_arm,
            upper_arm,
        } = scene;
        let Some(camera) = camera.as_deref() else {
            return report;
        };
        if !tracking.is_initialized() {
            return report;
        }
        report.ready = true;

        // Color feed on the background, bound once
        if let Some(background) = background.as_deref_mut() {
            if background.texture().is_none() {
                if let Some(texture) = tracking.live_color_texture() {
                    background.set_texture(texture);
                    report.background_bound = true;
                }
            }
        }

        let rect = camera.pixel_rect();

        if !tracking.is_any_person_detected() {
            return report;
        }
        let Some(person) = tracking.person_id_at_index(self.config.player_index) else {
            return report;
        };
        report.person = Some(person);

        let project = |joint: JointType| {
            if tracking.is_joint_tracked(person, joint) {
                tracking.projected_joint_position(person, joint, camera, &rect)
            } else {
                None
            }
        };

        // Overlay follows the hand
        if let Some(hand) = project(self.config.hand_joint) {
            if !(self.config.skip_zero_samples && hand == Vector3::zeros()) {
                if let Some(node) = overlay.as_deref_mut() {
                    node.set_position(hand);
                    report.overlay_moved = true;
                }
            }
        }

        let arm_tracked = [self.config.wrist_joint, self.config.elbow_joint, self.config.shoulder_joint]
            .iter()
            .all(|&joint| tracking.is_joint_tracked(person, joint));
        if !arm_tracked {
            return report;
        }

        let (Some(wrist), Some(elbow), Some(shoulder)) = (
            project(self.config.wrist_joint),
            project(self.config.elbow_joint),
            project(self.config.shoulder_joint),
        ) else {
            return report;
        };

        let max_turn = self.config.max_turn_degrees.to_radians();

        // Overlay heading: ground-plane direction of the forearm
        if let Some(node) = overlay.as_deref_mut() {
            let target = normalize_or_zero(horizontal(wrist - elbow));
            let current = normalize_or_zero(horizontal(node.forward()));
            turn_towards(node, current, target, max_turn);
            report.overlay_rotated = true;
        }

        if let Some(node) = lower_arm.as_deref_mut() {
            place_segment(node, elbow, wrist, max_turn);
            report.lower_arm_updated = true;
        }

        if let Some(node) = upper_arm.as_deref_mut() {
            place_segment(node, elbow, shoulder, max_turn);
            report.upper_arm_updated = true;
        }

        report
    }
}

/// Always writes a rotation. A degenerate direction resets the node to
/// identity so it has a usable heading on the next frame.
fn turn_towards(node: &mut dyn SceneNode, current: Vector3<f32>, target: Vector3<f32>, max_turn: f32) {
    let direction = rotate_towards(current, target, max_turn, 0.0);
    node.set_rotation(look_rotation(direction).unwrap_or_else(UnitQuaternion::identity));
}

/// Pins a limb segment at `pivot` and points it at `end`.
fn place_segment(node: &mut dyn SceneNode, pivot: Vector3<f32>, end: Vector3<f32>, max_turn: f32) {
    node.set_position(pivot);
    let target = normalize_or_zero(end - pivot);
    let current = node.forward();
    turn_towards(node, current, target, max_turn);
}
