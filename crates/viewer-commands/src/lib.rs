//! The viewer's command surface.
//!
//! `ViewerState` is the owner-thread context; `register` binds every viewer
//! command into a `CommandRegistry<ViewerState>`.

mod error;
mod handlers;
mod loader;
mod state;

pub use error::{LoadError, LoadResult};
pub use handlers::register;
pub use loader::{
    DatasetLoader, ManifestLoader, TiffStackLoader, VolumeInfo, VolumeLoader, MANIFEST_FILE,
    SLICE_EXTENSIONS,
};
pub use state::{
    Camera, CropBox, LayerSettings, LightingMode, RenderMode, SliceAxis, Slot, TransferFunction,
    ViewerState,
};
