use std::{
    sync::mpsc::{channel, Sender},
    thread::JoinHandle,
};

use anyhow::{anyhow, Result};
use log::{info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single worker thread owned by the camera screen.
pub struct CameraExecutor {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Default for CameraExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraExecutor {
    pub fn new() -> Self {
        let (sender, receiver) = channel::<Job>();
        let worker = std::thread::spawn(move || {
            // ends once every sender is dropped and the queue is empty
            while let Ok(job) = receiver.recv() {
                job();
            }
        });
        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("camera executor is shut down"))?;
        sender
            .send(Box::new(job))
            .map_err(|_| anyhow!("camera executor worker has exited"))
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.is_none()
    }

    /// Stops accepting jobs, runs what is queued and joins the worker.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("camera executor worker panicked");
            }
        }
        info!("camera executor shut down");
    }
}

impl Drop for CameraExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
