use std::{
    cell::{OnceCell, RefCell},
    fmt,
    rc::Rc,
    sync::mpsc::{channel, Receiver, Sender},
};

use log::info;
use slint::{Rgba8Pixel, SharedPixelBuffer};
use thiserror::Error;

use crate::config::PreviewConfig;

pub mod frame;

#[cfg(target_os = "android")]
mod camera2;

#[cfg(target_os = "windows")]
mod pcam;

#[cfg(test)]
pub mod mock;

pub type PreviewFrame = SharedPixelBuffer<Rgba8Pixel>;

/// Process-wide provider handle, only touched from the UI thread.
pub type SharedProvider = Rc<RefCell<dyn CameraProvider>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraSelector {
    #[default]
    Back,
    Front,
}

impl CameraSelector {
    pub fn toggled(self) -> Self {
        match self {
            CameraSelector::Back => CameraSelector::Front,
            CameraSelector::Front => CameraSelector::Back,
        }
    }
}

impl fmt::Display for CameraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSelector::Back => f.write_str("back"),
            CameraSelector::Front => f.write_str("front"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("no {0} camera available")]
    NoDevice(CameraSelector),
    #[error("no camera backend on this platform")]
    Unsupported,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Sending half of the display surface. Frames are produced on camera threads.
#[derive(Clone)]
pub struct PreviewSurface {
    frames: Sender<PreviewFrame>,
}

impl PreviewSurface {
    pub fn channel() -> (PreviewSurface, Receiver<PreviewFrame>) {
        let (frames, receiver) = channel();
        (PreviewSurface { frames }, receiver)
    }

    /// Returns false once the display side is gone.
    pub fn present(&self, frame: PreviewFrame) -> bool {
        self.frames.send(frame).is_ok()
    }
}

/// Preview use case: a live path from the camera to a surface.
#[derive(Clone)]
pub struct Preview {
    surface: PreviewSurface,
}

impl Preview {
    pub fn new(surface: PreviewSurface) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &PreviewSurface {
        &self.surface
    }
}

pub trait CameraProvider {
    /// Releases every bound preview. Safe to call when nothing is bound.
    fn unbind_all(&mut self);

    fn bind(&mut self, selector: CameraSelector, preview: Preview) -> Result<(), CameraError>;
}

thread_local! {
    static PROVIDER: OnceCell<SharedProvider> = const { OnceCell::new() };
}

/// Resolves to the process camera provider, creating it on first use.
pub async fn get_instance(config: &PreviewConfig) -> Result<SharedProvider, CameraError> {
    if let Some(provider) = PROVIDER.with(|cell| cell.get().cloned()) {
        return Ok(provider);
    }
    let provider = create_provider(config)?;
    info!("camera provider created");
    Ok(PROVIDER.with(|cell| cell.get_or_init(|| provider).clone()))
}

#[cfg(target_os = "android")]
fn create_provider(config: &PreviewConfig) -> Result<SharedProvider, CameraError> {
    Ok(Rc::new(RefCell::new(camera2::AndroidCameraProvider::new(
        config,
    )?)))
}

#[cfg(target_os = "windows")]
fn create_provider(_config: &PreviewConfig) -> Result<SharedProvider, CameraError> {
    Ok(Rc::new(RefCell::new(pcam::KameraProvider::new())))
}

#[cfg(not(any(target_os = "android", target_os = "windows")))]
fn create_provider(_config: &PreviewConfig) -> Result<SharedProvider, CameraError> {
    Ok(Rc::new(RefCell::new(UnsupportedProvider)))
}

#[cfg(not(any(target_os = "android", target_os = "windows")))]
struct UnsupportedProvider;

#[cfg(not(any(target_os = "android", target_os = "windows")))]
impl CameraProvider for UnsupportedProvider {
    fn unbind_all(&mut self) {}

    fn bind(&mut self, _selector: CameraSelector, _preview: Preview) -> Result<(), CameraError> {
        Err(CameraError::Unsupported)
    }
}

/// Picks the supported size closest in area to the request, preferring the
/// requested aspect ratio on ties.
pub fn choose_preview_size(supported: &[(u32, u32)], requested: (u32, u32)) -> Option<(u32, u32)> {
    let area = |(w, h): (u32, u32)| w as i64 * h as i64;
    let requested_area = area(requested);
    supported.iter().copied().min_by_key(|&size| {
        let area_diff = (area(size) - requested_area).abs();
        let aspect_diff =
            (size.0 as i64 * requested.1 as i64 - size.1 as i64 * requested.0 as i64).abs();
        (area_diff, aspect_diff)
    })
}
