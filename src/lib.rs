// src/lib.rs
pub mod config;
pub mod data;
pub mod error;
pub mod kinect;
pub mod orient;
pub mod overlay;
pub mod scene;
pub mod simulation;

pub use error::{Error, Result};
pub use kinect::{JointType, PersonId, TrackingService};
pub use overlay::{FrameReport, OverlayConfig, PoseOverlay};
