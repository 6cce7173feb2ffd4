// src/kinect.rs - Body-tracking service contract
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scene::{Camera, TextureHandle, ViewportRect};

/// Skeletal joints reported by a Kinect v2 style body tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointType {
    pub const COUNT: usize = 25;

    /// Index of the joint in the sensor's joint array.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Tracking id of a detected person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The body-tracking collaborator consumed by the overlay.
///
/// Implementations are expected to present a frame-consistent snapshot for
/// the duration of one overlay update.
pub trait TrackingService {
    fn is_initialized(&self) -> bool;

    fn is_any_person_detected(&self) -> bool;

    /// Tracking id of the `index`-th detected person, if that many are detected.
    fn person_id_at_index(&self, index: usize) -> Option<PersonId>;

    fn is_joint_tracked(&self, person: PersonId, joint: JointType) -> bool;

    /// Joint position mapped onto the color overlay of `camera` within `rect`.
    /// `None` when the joint cannot be projected this frame.
    fn projected_joint_position(
        &self,
        person: PersonId,
        joint: JointType,
        camera: &dyn Camera,
        rect: &ViewportRect,
    ) -> Option<Vector3<f32>>;

    /// The live color-camera texture, once the sensor has produced one.
    fn live_color_texture(&self) -> Option<TextureHandle>;
}
