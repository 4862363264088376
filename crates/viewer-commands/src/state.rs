//! Viewer state owned by the owner thread.

use crate::{DatasetLoader, VolumeInfo, VolumeLoader};
use bus_runtime::params::Choice;
use bus_runtime::CommandError;
use serde::Serialize;
use serde_json::json;

/// How a layer is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Mip,
    Volume,
    Cinematic,
    Mida,
    Shaded,
    Edge,
}

impl Choice for RenderMode {
    const LABEL: &'static str = "rendering mode";

    fn choices() -> &'static [(&'static str, Self)] {
        &[
            ("mip", RenderMode::Mip),
            ("volume", RenderMode::Volume),
            ("cinematic", RenderMode::Cinematic),
            ("mida", RenderMode::Mida),
            ("shaded", RenderMode::Shaded),
            ("edge", RenderMode::Edge),
        ]
    }
}

/// Colour map applied to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferFunction {
    Grayscale,
    Viridis,
    Plasma,
    Medical,
    Rainbow,
}

impl Choice for TransferFunction {
    const LABEL: &'static str = "transfer function";

    fn choices() -> &'static [(&'static str, Self)] {
        &[
            ("grayscale", TransferFunction::Grayscale),
            ("viridis", TransferFunction::Viridis),
            ("plasma", TransferFunction::Plasma),
            ("medical", TransferFunction::Medical),
            ("rainbow", TransferFunction::Rainbow),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightingMode {
    /// Light fixed in world space.
    Fixed,
    /// Light follows the camera.
    Headlamp,
}

impl Choice for LightingMode {
    const LABEL: &'static str = "lighting mode";

    fn choices() -> &'static [(&'static str, Self)] {
        &[("fixed", LightingMode::Fixed), ("headlamp", LightingMode::Headlamp)]
    }
}

/// Which layer a layer command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Overlay,
}

impl Choice for Slot {
    const LABEL: &'static str = "slot";

    fn choices() -> &'static [(&'static str, Self)] {
        &[
            ("0", Slot::Primary),
            ("1", Slot::Overlay),
            ("primary", Slot::Primary),
            ("overlay", Slot::Overlay),
        ]
    }
}

impl Slot {
    /// Empty selects the primary layer.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        if raw.trim().is_empty() {
            Ok(Slot::Primary)
        } else {
            bus_runtime::params::parse_choice(raw)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::Primary => "Primary",
            Slot::Overlay => "Overlay",
        }
    }
}

/// Volume axis used by slicing and cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceAxis {
    X,
    Y,
    Z,
}

impl Choice for SliceAxis {
    const LABEL: &'static str = "axis";

    fn choices() -> &'static [(&'static str, Self)] {
        &[("x", SliceAxis::X), ("y", SliceAxis::Y), ("z", SliceAxis::Z)]
    }
}

impl SliceAxis {
    pub fn index(self) -> usize {
        match self {
            SliceAxis::X => 0,
            SliceAxis::Y => 1,
            SliceAxis::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SliceAxis::X => "X",
            SliceAxis::Y => "Y",
            SliceAxis::Z => "Z",
        }
    }
}

/// Per-layer rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSettings {
    pub rendering_mode: RenderMode,
    pub transfer_function: TransferFunction,
    /// In `[0, 1]`.
    pub threshold: f64,
    /// In `[0.1, 500]`.
    pub density: f64,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            rendering_mode: RenderMode::Mip,
            transfer_function: TransferFunction::Grayscale,
            threshold: 0.05,
            density: 50.0,
        }
    }
}

pub const DEFAULT_FOV: f64 = 45.0;
pub const DEFAULT_RADIUS: f64 = 3.0;
pub const MIN_RADIUS: f64 = 0.1;
pub const MAX_RADIUS: f64 = 20.0;

/// Orbit camera around the volume centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    /// Vertical field of view in degrees, `[1, 160]`.
    pub fov: f64,
    /// Distance from the target, `[0.1, 20]`.
    pub radius: f64,
    /// Degrees around the vertical axis, `[0, 360)`.
    pub yaw: f64,
    /// Degrees around the horizontal axis, `[0, 360)`.
    pub pitch: f64,
    /// Orbit centre in normalized volume-box coordinates.
    pub target: [f64; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: DEFAULT_FOV,
            radius: DEFAULT_RADIUS,
            yaw: 0.0,
            pitch: 0.0,
            target: [0.0; 3],
        }
    }
}

/// Wrap into `[0, 360)`. `rem_euclid` rounds tiny negatives up to exactly 360.
fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

impl Camera {
    pub fn rotate_yaw(&mut self, degrees: f64) {
        self.yaw = wrap_degrees(self.yaw + degrees);
    }

    pub fn rotate_pitch(&mut self, degrees: f64) {
        self.pitch = wrap_degrees(self.pitch + degrees);
    }

    /// Orbit the centre of `box_size` from a distance that fits it in view.
    pub fn frame(&mut self, box_size: [f64; 3]) {
        let diagonal = box_size.iter().map(|d| d * d).sum::<f64>().sqrt();
        self.target = box_size.map(|d| d * 0.5);
        self.radius = (diagonal * 1.5).clamp(MIN_RADIUS, MAX_RADIUS);
        self.yaw = 0.0;
        self.pitch = 0.0;
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f64) {
        self.radius = (self.radius - steps * 0.5).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// Orientation and distance back to defaults; the field of view is kept.
    pub fn reset(&mut self) {
        self.radius = DEFAULT_RADIUS;
        self.yaw = 0.0;
        self.pitch = 0.0;
    }
}

/// Normalized clip box, each bound in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for CropBox {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [1.0; 3],
        }
    }
}

/// Everything the viewer's commands read and write.
pub struct ViewerState {
    loader: Box<dyn VolumeLoader>,
    pub volume: Option<VolumeInfo>,
    /// RFC 3339 timestamp of the last successful load.
    pub loaded_at: Option<String>,
    pub primary: LayerSettings,
    pub overlay: LayerSettings,
    pub camera: Camera,
    pub slices: [usize; 3],
    pub lighting: LightingMode,
    /// Sampling rate multiplier, `[0.1, 5]`.
    pub quality: f64,
    pub crop: CropBox,
    /// `[0, 2]`.
    pub specular: f64,
    /// `[1, 128]`.
    pub shininess: f64,
    /// `[0, 50]`.
    pub gradient_weight: f64,
}

impl ViewerState {
    pub fn new(loader: Box<dyn VolumeLoader>) -> Self {
        Self {
            loader,
            volume: None,
            loaded_at: None,
            primary: LayerSettings::default(),
            overlay: LayerSettings::default(),
            camera: Camera::default(),
            slices: [0; 3],
            lighting: LightingMode::Fixed,
            quality: 1.0,
            crop: CropBox::default(),
            specular: 0.5,
            shininess: 32.0,
            gradient_weight: 10.0,
        }
    }

    pub fn loader(&self) -> &dyn VolumeLoader {
        self.loader.as_ref()
    }

    pub fn layer(&self, slot: Slot) -> &LayerSettings {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Overlay => &self.overlay,
        }
    }

    pub fn layer_mut(&mut self, slot: Slot) -> &mut LayerSettings {
        match slot {
            Slot::Primary => &mut self.primary,
            Slot::Overlay => &mut self.overlay,
        }
    }

    /// Install a freshly loaded volume; slices move to the middle of each axis
    /// and the camera is reframed on it.
    pub fn set_volume(&mut self, info: VolumeInfo) {
        self.slices = [info.extent[0] / 2, info.extent[1] / 2, info.extent[2] / 2];
        self.loaded_at = Some(chrono::Utc::now().to_rfc3339());
        self.volume = Some(info);
        let box_size = self.box_size();
        self.camera.frame(box_size);
    }

    /// The volume's extent scaled so its longest side is 1; a unit cube
    /// without a volume.
    pub fn box_size(&self) -> [f64; 3] {
        match &self.volume {
            Some(volume) => {
                let longest = volume.extent.iter().copied().max().unwrap_or(1).max(1) as f64;
                volume.extent.map(|d| d as f64 / longest)
            }
            None => [1.0; 3],
        }
    }

    /// Default orientation and distance, looking at the volume centre.
    pub fn reset_camera(&mut self) {
        self.camera.reset();
        self.camera.target = self.box_size().map(|d| d * 0.5);
    }

    /// Structured snapshot for `get_status`.
    pub fn status(&self) -> serde_json::Value {
        json!({
            "rendering_mode": self.primary.rendering_mode,
            "transfer_function": self.primary.transfer_function,
            "threshold": self.primary.threshold,
            "density": self.primary.density,
            "overlay": self.overlay,
            "slice_indices": self.slices,
            "lighting_mode": self.lighting,
            "quality": self.quality,
            "fov": self.camera.fov,
            "camera": self.camera,
            "crop": self.crop,
            "specular": self.specular,
            "shininess": self.shininess,
            "gradient_weight": self.gradient_weight,
            "has_data": self.volume.is_some(),
            "dataset_path": self.volume.as_ref().map(|v| v.path.display().to_string()),
            "dataset_name": self.volume.as_ref().map(|v| v.name.clone()),
            "extent": self.volume.as_ref().map(|v| v.extent),
            "loaded_at": self.loaded_at,
        })
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new(Box::new(DatasetLoader))
    }
}
