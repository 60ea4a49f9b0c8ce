//! Camera screen: permission gate, camera binding and controls.
//!
//! The screen is a plain state machine driven from the UI thread. Every
//! input returns the [`Command`]s the UI layer has to carry out; asynchronous
//! answers come back through [`CameraScreen::on_permission_result`] and
//! [`CameraScreen::on_provider_ready`].

use log::{info, warn};

use crate::{
    camera::{CameraError, CameraSelector, Preview, PreviewSurface, SharedProvider},
    error::{Notice, ScreenError},
    exercise,
    executor::CameraExecutor,
    navigation::Intent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unchecked,
    Requesting,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraSessionState {
    pub permission_granted: bool,
    pub use_front_camera: bool,
}

impl CameraSessionState {
    pub fn selector(&self) -> CameraSelector {
        if self.use_front_camera {
            CameraSelector::Front
        } else {
            CameraSelector::Back
        }
    }
}

/// Identifies one bind request. Completions for older tickets are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestPermission { request_code: i32 },
    AcquireProvider(BindTicket),
    /// The bound preview is gone; stop showing its last frame.
    ClearPreview,
    Notify(Notice),
    Close,
}

pub struct CameraScreen {
    exercise: String,
    state: CameraSessionState,
    permission: PermissionState,
    request_code: i32,
    surface: PreviewSurface,
    next_ticket: u64,
    pending: Option<BindTicket>,
    bound: Option<SharedProvider>,
    executor: CameraExecutor,
    suspended: bool,
    closed: bool,
}

impl CameraScreen {
    /// Fails with [`ScreenError::MissingExercise`] when the intent carries no exercise.
    pub fn open(
        intent: &Intent,
        surface: PreviewSurface,
        request_code: i32,
    ) -> Result<Self, ScreenError> {
        let exercise = intent.exercise().ok_or(ScreenError::MissingExercise)?;
        info!("camera screen opened for {exercise}");
        Ok(Self {
            exercise: exercise.to_string(),
            state: CameraSessionState::default(),
            permission: PermissionState::Unchecked,
            request_code,
            surface,
            next_ticket: 0,
            pending: None,
            bound: None,
            executor: CameraExecutor::new(),
            suspended: false,
            closed: false,
        })
    }

    pub fn exercise(&self) -> &str {
        &self.exercise
    }

    pub fn title(&self) -> String {
        exercise::title_for(&self.exercise)
    }

    pub fn state(&self) -> CameraSessionState {
        self.state
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True while a preview is bound.
    pub fn is_previewing(&self) -> bool {
        self.bound.is_some()
    }

    pub fn executor(&self) -> &CameraExecutor {
        &self.executor
    }

    /// Runs the permission gate. Only the first call does anything.
    pub fn enter(&mut self, already_granted: bool) -> Vec<Command> {
        if self.closed || self.permission != PermissionState::Unchecked {
            return vec![];
        }
        if already_granted {
            self.grant()
        } else {
            self.permission = PermissionState::Requesting;
            info!("camera permission missing, requesting");
            vec![Command::RequestPermission {
                request_code: self.request_code,
            }]
        }
    }

    pub fn on_permission_result(&mut self, request_code: i32, granted: bool) -> Vec<Command> {
        if self.closed
            || request_code != self.request_code
            || self.permission != PermissionState::Requesting
        {
            return vec![];
        }
        if granted {
            info!("camera permission granted");
            return self.grant();
        }
        warn!("camera permission denied");
        self.permission = PermissionState::Denied;
        self.fail(ScreenError::PermissionDenied)
    }

    /// Completes a bind: unbinds whatever the provider holds, then binds the
    /// preview to the selected camera.
    pub fn on_provider_ready(
        &mut self,
        ticket: BindTicket,
        provider: Result<SharedProvider, CameraError>,
    ) -> Vec<Command> {
        if self.closed || self.pending != Some(ticket) {
            info!("ignoring stale camera provider completion {ticket:?}");
            return vec![];
        }
        self.pending = None;
        match provider.and_then(|provider| self.bind(provider)) {
            Ok(()) => vec![],
            Err(err) => {
                // whatever was previewing before this bind is gone too
                self.release();
                let mut commands = vec![Command::ClearPreview];
                commands.extend(self.fail(ScreenError::CameraBindFailure(err)));
                commands
            }
        }
    }

    pub fn toggle_camera(&mut self) -> Vec<Command> {
        if self.closed {
            return vec![];
        }
        let selector = self.state.selector().toggled();
        self.state.use_front_camera = selector == CameraSelector::Front;
        info!("camera switched to {selector}");
        if self.permission == PermissionState::Granted && !self.suspended {
            vec![self.request_bind()]
        } else {
            vec![]
        }
    }

    pub fn toggle_flash(&self) -> Vec<Command> {
        vec![Command::Notify(Notice::FlashNotImplemented)]
    }

    pub fn exit(&mut self) -> Vec<Command> {
        self.close();
        vec![Command::Close]
    }

    /// The screen went to the background: drop the binding and any bind in flight.
    pub fn suspend(&mut self) -> Vec<Command> {
        if self.closed || self.suspended {
            return vec![];
        }
        self.suspended = true;
        self.pending = None;
        info!("camera screen inactive");
        if self.release() {
            vec![Command::ClearPreview]
        } else {
            vec![]
        }
    }

    /// The screen is visible again: rebind when permission allows it.
    pub fn resume(&mut self) -> Vec<Command> {
        if self.closed || !self.suspended {
            return vec![];
        }
        self.suspended = false;
        info!("camera screen active");
        if self.permission == PermissionState::Granted {
            vec![self.request_bind()]
        } else {
            vec![]
        }
    }

    /// Releases the binding and stops the executor. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.pending = None;
        self.release();
        self.executor.shutdown();
        info!("camera screen closed");
    }

    /// Unbinds the held provider. Returns whether anything was bound.
    fn release(&mut self) -> bool {
        let Some(provider) = self.bound.take() else {
            return false;
        };
        match provider.try_borrow_mut() {
            Ok(mut provider) => provider.unbind_all(),
            Err(_) => warn!("camera provider busy, binding not released"),
        }
        true
    }

    fn grant(&mut self) -> Vec<Command> {
        self.permission = PermissionState::Granted;
        self.state.permission_granted = true;
        if self.suspended {
            // bound on resume
            return vec![];
        }
        vec![self.request_bind()]
    }

    fn request_bind(&mut self) -> Command {
        self.next_ticket += 1;
        let ticket = BindTicket(self.next_ticket);
        self.pending = Some(ticket);
        Command::AcquireProvider(ticket)
    }

    fn bind(&mut self, provider: SharedProvider) -> Result<(), CameraError> {
        self.bound = None;
        let selector = self.state.selector();
        {
            let mut handle = provider.borrow_mut();
            handle.unbind_all();
            handle.bind(selector, Preview::new(self.surface.clone()))?;
        }
        info!("preview bound to {selector} camera");
        self.bound = Some(provider);
        Ok(())
    }

    fn fail(&mut self, err: ScreenError) -> Vec<Command> {
        warn!("{err}: {:?}", std::error::Error::source(&err));
        let mut commands = vec![Command::Notify(Notice::from(&err))];
        if err.is_terminal() {
            self.close();
            commands.push(Command::Close);
        }
        commands
    }
}

impl Drop for CameraScreen {
    fn drop(&mut self) {
        self.close();
    }
}
