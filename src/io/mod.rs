//! External interfaces: output device, media loading, catalog listing.

pub mod catalog;
pub mod decode;
#[cfg(feature = "cpal")]
pub mod device;

use std::future::Future;
use std::pin::Pin;

use tracing::warn;

use crate::error::BackendError;
use crate::graph::{MediaSource, SharedGraph};
use crate::selector::{AudioCatalog, SourceRef};

/// Pending device operation, resolved on the control thread.
pub type DeviceFuture = Pin<Box<dyn Future<Output = Result<(), BackendError>>>>;

/// Background image reference, listed by the same provider as the tracks.
pub type ImageRef = SourceRef;

/// An opened output rendering a [`SharedGraph`].
///
/// Resume and play are asynchronous: the returned futures own everything
/// they need, so the caller can drop its borrow before awaiting.
pub trait OutputDevice {
    fn sample_rate(&self) -> f32;

    /// A suspended device renders nothing until resumed.
    fn is_suspended(&self) -> bool;

    fn resume(&self) -> DeviceFuture;

    /// Start `source` playing through the device.
    fn play(&self, source: &MediaSource) -> DeviceFuture;

    /// Stop rendering and release the device.
    fn close(&mut self);
}

/// Factory for devices and decoded sources.
pub trait AudioBackend {
    type Device: OutputDevice;

    /// Open an output that renders `graph`.
    fn open(&self, graph: SharedGraph) -> Result<Self::Device, BackendError>;

    fn load(&self, source: &SourceRef) -> Result<MediaSource, BackendError>;
}

/// Listing of tracks and background images.
pub trait CatalogProvider {
    fn list_audio_sources(&self) -> Result<Vec<SourceRef>, BackendError>;

    fn list_background_images(&self) -> Result<Vec<ImageRef>, BackendError>;
}

/// Track catalog from `provider`, empty if listing fails.
pub fn load_catalog(provider: &impl CatalogProvider) -> AudioCatalog {
    match provider.list_audio_sources() {
        Ok(sources) => AudioCatalog::new(sources),
        Err(e) => {
            warn!(error = %e, "audio listing failed, catalog is empty");
            AudioCatalog::empty()
        }
    }
}

/// Background images from `provider`, empty if listing fails.
pub fn load_backgrounds(provider: &impl CatalogProvider) -> Vec<ImageRef> {
    provider.list_background_images().unwrap_or_else(|e| {
        warn!(error = %e, "image listing failed");
        Vec::new()
    })
}
