// src/data.rs
use chrono::Local;
use csv::Writer;
use nalgebra::Vector3;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::overlay::FrameReport;
use crate::scene::{OverlayScene, SceneNode};

#[derive(Debug, Clone, Copy, Default)]
struct NodePose {
    position: Vector3<f32>,
    forward: Vector3<f32>,
}

impl NodePose {
    fn capture(node: Option<&dyn SceneNode>) -> Option<Self> {
        node.map(|node| Self {
            position: node.position(),
            forward: node.forward(),
        })
    }
}

#[derive(Debug, Clone)]
struct FrameSample {
    frame: u32,
    timestamp: f64,
    report: FrameReport,
    overlay: Option<NodePose>,
    lower_arm: Option<NodePose>,
    upper_arm: Option<NodePose>,
}

#[derive(Debug, Serialize)]
struct OverlayRecord {
    frame: u32,
    timestamp: f64,
    ready: bool,
    person_id: Option<u64>,
    background_bound: bool,
    overlay_moved: bool,
    overlay_rotated: bool,
    lower_arm_updated: bool,
    upper_arm_updated: bool,

    overlay_x: Option<f32>,
    overlay_y: Option<f32>,
    overlay_z: Option<f32>,
    overlay_forward_x: Option<f32>,
    overlay_forward_y: Option<f32>,
    overlay_forward_z: Option<f32>,

    lower_arm_x: Option<f32>,
    lower_arm_y: Option<f32>,
    lower_arm_z: Option<f32>,
    lower_arm_forward_x: Option<f32>,
    lower_arm_forward_y: Option<f32>,
    lower_arm_forward_z: Option<f32>,

    upper_arm_x: Option<f32>,
    upper_arm_y: Option<f32>,
    upper_arm_z: Option<f32>,
    upper_arm_forward_x: Option<f32>,
    upper_arm_forward_y: Option<f32>,
    upper_arm_forward_z: Option<f32>,
}

/// Frame counts over a recorded session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: usize,
    pub ready_frames: usize,
    pub person_frames: usize,
    pub overlay_moves: usize,
    pub arm_updates: usize,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub struct OverlayRecorder {
    output_dir: PathBuf,
    session_name: String,
    samples: Vec<FrameSample>,
}

impl OverlayRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            samples: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Captures the scene's node transforms as they stand after `report`'s update.
    pub fn add_frame(&mut self, frame: u32, timestamp: f64, report: FrameReport, scene: &OverlayScene) {
        self.samples.push(FrameSample {
            frame,
            timestamp,
            report,
            overlay: NodePose::capture(scene.overlay.as_deref()),
            lower_arm: NodePose::capture(scene.lower_arm.as_deref()),
            upper_arm: NodePose::capture(scene.upper_arm.as_deref()),
        });
    }

    pub fn stats(&self) -> SessionStats {
        let count = |f: fn(&FrameReport) -> bool| self.samples.iter().filter(|s| f(&s.report)).count();

        SessionStats {
            frames: self.samples.len(),
            ready_frames: count(|r| r.ready),
            person_frames: count(|r| r.person.is_some()),
            overlay_moves: count(|r| r.overlay_moved),
            arm_updates: count(|r| r.arm_updated()),
        }
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.output_dir
            .join(&self.session_name)
            .join("overlay_data.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);

        for sample in &self.samples {
            writer.serialize(Self::create_record(sample))?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    fn create_record(sample: &FrameSample) -> OverlayRecord {
        let report = &sample.report;
        let axis = |pose: Option<NodePose>, pick: fn(&NodePose) -> Vector3<f32>| {
            let v = pose.map(|p| pick(&p));
            (v.map(|v| v.x), v.map(|v| v.y), v.map(|v| v.z))
        };

        let (overlay_x, overlay_y, overlay_z) = axis(sample.overlay, |p| p.position);
        let (overlay_forward_x, overlay_forward_y, overlay_forward_z) = axis(sample.overlay, |p| p.forward);
        let (lower_arm_x, lower_arm_y, lower_arm_z) = axis(sample.lower_arm, |p| p.position);
        let (lower_arm_forward_x, lower_arm_forward_y, lower_arm_forward_z) = axis(sample.lower_arm, |p| p.forward);
        let (upper_arm_x, upper_arm_y, upper_arm_z) = axis(sample.upper_arm, |p| p.position);
        let (upper_arm_forward_x, upper_arm_forward_y, upper_arm_forward_z) = axis(sample.upper_arm, |p| p.forward);

        OverlayRecord {
            frame: sample.frame,
            timestamp: sample.timestamp,
            ready: report.ready,
            person_id: report.person.map(|p| p.0),
            background_bound: report.background_bound,
            overlay_moved: report.overlay_moved,
            overlay_rotated: report.overlay_rotated,
            lower_arm_updated: report.lower_arm_updated,
            upper_arm_updated: report.upper_arm_updated,
            overlay_x,
            overlay_y,
            overlay_z,
            overlay_forward_x,
            overlay_forward_y,
            overlay_forward_z,
            lower_arm_x,
            lower_arm_y,
            lower_arm_z,
            lower_arm_forward_x,
            lower_arm_forward_y,
            lower_arm_forward_z,
            upper_arm_x,
            upper_arm_y,
            upper_arm_z,
            upper_arm_forward_x,
            upper_arm_forward_y,
            upper_arm_forward_z,
        }
    }

    pub fn generate_report(&self) -> Result<PathBuf> {
        let report_path = self.output_dir
            .join(&self.session_name)
            .join("report.html");

        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&report_path, self.create_html_report())?;
        Ok(report_path)
    }

    fn create_html_report(&self) -> String {
        let stats = self.stats();

        format!(r#"
<!DOCTYPE html>
<html>
<head>
    <title>Magic Mirror Report - {}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f5f5; }}
        h1 {{ color: #333; }}
        .stats {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .stat-item {{ margin: 10px 0; }}
        .stat-label {{ font-weight: bold; color: #666; }}
        .stat-value {{ color: #4682EA; font-size: 1.2em; }}
    </style>
</head>
<body>
    <h1>Magic Mirror Overlay Session</h1>
    <div class="stats">
        <h2>Session: {}</h2>
        <div class="stat-item">
            <span class="stat-label">Total Frames:</span>
            <span class="stat-value">{}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Sensor Ready:</span>
            <span class="stat-value">{:.1}%</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Player Tracked:</span>
            <span class="stat-value">{:.1}%</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Overlay Moved:</span>
            <span class="stat-value">{} frames</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Arm Updated:</span>
            <span class="stat-value">{} frames</span>
        </div>
    </div>
</body>
</html>
        "#,
            self.session_name,
            self.session_name,
            stats.frames,
            percent(stats.ready_frames, stats.frames),
            percent(stats.person_frames, stats.frames),
            stats.overlay_moves,
            stats.arm_updates,
        )
    }
}
