use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::sync_channel,
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use kamera::Camera as KCamera;
use log::{info, warn};

use super::{frame, CameraError, CameraProvider, CameraSelector, Preview, PreviewFrame};

struct CaptureThread {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Desktop provider backed by `kamera`. Back is device 0, front is device 1.
#[derive(Default)]
pub struct KameraProvider {
    capture: Option<CaptureThread>,
}

impl KameraProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn device_index(selector: CameraSelector) -> usize {
    match selector {
        CameraSelector::Back => 0,
        CameraSelector::Front => 1,
    }
}

impl CameraProvider for KameraProvider {
    fn unbind_all(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.running.store(false, Ordering::Release);
            info!("stop preview..");
            if capture.handle.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }

    fn bind(&mut self, selector: CameraSelector, preview: Preview) -> Result<(), CameraError> {
        self.unbind_all();
        let index = device_index(selector);
        let running = Arc::new(AtomicBool::new(true));
        let (opened_sender, opened) = sync_channel(1);
        let surface = preview.surface().clone();
        let flag = running.clone();

        let handle = std::thread::spawn(move || {
            let Some(camera) = KCamera::new_device(index) else {
                let _ = opened_sender.send(false);
                return;
            };
            camera.start();
            let _ = opened_sender.send(true);
            while flag.load(Ordering::Acquire) {
                let Some(captured) = camera.wait_for_frame() else {
                    warn!("no frame from camera {index}");
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                };
                let (width, height) = captured.size_u32();
                let mut rgba = captured.data().data_u8().to_vec();
                frame::bgra_to_rgba(&mut rgba);
                if !surface.present(PreviewFrame::clone_from_slice(&rgba, width, height)) {
                    break;
                }
            }
            camera.stop();
        });

        if opened.recv().unwrap_or(false) {
            info!("{selector} camera (device {index}) started");
            self.capture = Some(CaptureThread { running, handle });
            Ok(())
        } else {
            let _ = handle.join();
            Err(CameraError::NoDevice(selector))
        }
    }
}

impl Drop for KameraProvider {
    fn drop(&mut self) {
        self.unbind_all();
    }
}
