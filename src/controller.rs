//! UI-independent application flow.
//!
//! `AppController` owns the selection list and the open camera screen and
//! turns user input, permission answers and provider completions into
//! [`UiAction`]s. The Slint layer only performs those actions.

use std::sync::mpsc::Receiver;

use log::{info, warn};

use crate::{
    camera::{CameraError, PreviewFrame, PreviewSurface, SharedProvider},
    error::Notice,
    navigation::Intent,
    selection::SelectionScreen,
    session::{BindTicket, CameraScreen, Command},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    ShowCamera { title: String },
    HideCamera,
    ClearPreview,
    Notify(Notice),
    RequestPermission { request_code: i32 },
    StopPermissionWatch,
    AcquireProvider(BindTicket),
}

pub struct AppController {
    selection: SelectionScreen,
    surface: PreviewSurface,
    request_code: i32,
    screen: Option<CameraScreen>,
}

impl AppController {
    pub fn new(surface: PreviewSurface, request_code: i32) -> Self {
        Self {
            selection: SelectionScreen::new(),
            surface,
            request_code,
            screen: None,
        }
    }

    pub fn selection(&self) -> &SelectionScreen {
        &self.selection
    }

    pub fn screen(&self) -> Option<&CameraScreen> {
        self.screen.as_ref()
    }

    /// A card was tapped. `granted` is only asked once a screen is open.
    pub fn select(&mut self, identifier: &str, granted: impl FnOnce() -> bool) -> Vec<UiAction> {
        match self.selection.select(identifier) {
            Some(intent) => self.open(&intent, granted),
            None => {
                warn!("no card for {identifier}");
                vec![]
            }
        }
    }

    pub fn open(&mut self, intent: &Intent, granted: impl FnOnce() -> bool) -> Vec<UiAction> {
        if self.screen.is_some() {
            warn!("camera screen already open");
            return vec![];
        }
        let mut screen = match CameraScreen::open(intent, self.surface.clone(), self.request_code)
        {
            Ok(screen) => screen,
            Err(err) => {
                warn!("camera screen not opened: {err}");
                return vec![UiAction::Notify(Notice::from(&err))];
            }
        };
        let mut actions = vec![UiAction::ShowCamera {
            title: screen.title(),
        }];
        let commands = screen.enter(granted());
        self.screen = Some(screen);
        actions.extend(self.apply(commands));
        actions
    }

    pub fn exit(&mut self) -> Vec<UiAction> {
        self.forward(CameraScreen::exit)
    }

    pub fn toggle_camera(&mut self) -> Vec<UiAction> {
        self.forward(CameraScreen::toggle_camera)
    }

    pub fn toggle_flash(&mut self) -> Vec<UiAction> {
        self.forward(|screen| screen.toggle_flash())
    }

    pub fn suspend(&mut self) -> Vec<UiAction> {
        self.forward(CameraScreen::suspend)
    }

    pub fn resume(&mut self) -> Vec<UiAction> {
        self.forward(CameraScreen::resume)
    }

    pub fn on_permission_result(&mut self, request_code: i32, granted: bool) -> Vec<UiAction> {
        self.forward(|screen| screen.on_permission_result(request_code, granted))
    }

    /// The prompt could not be shown; treated as a denial.
    pub fn permission_request_failed(&mut self, request_code: i32) -> Vec<UiAction> {
        self.on_permission_result(request_code, false)
    }

    pub fn on_provider_ready(
        &mut self,
        ticket: BindTicket,
        provider: Result<SharedProvider, CameraError>,
    ) -> Vec<UiAction> {
        self.forward(|screen| screen.on_provider_ready(ticket, provider))
    }

    /// Drops the open screen, releasing its binding.
    pub fn close(&mut self) -> Vec<UiAction> {
        match self.screen.take() {
            Some(screen) => {
                drop(screen);
                info!("camera screen dismissed");
                vec![UiAction::StopPermissionWatch, UiAction::HideCamera]
            }
            None => vec![],
        }
    }

    /// Drains pending frames and returns the newest one, unless no preview
    /// is bound right now.
    pub fn latest_frame(&self, frames: &Receiver<PreviewFrame>) -> Option<PreviewFrame> {
        let frame = frames.try_iter().last()?;
        self.screen
            .as_ref()
            .is_some_and(CameraScreen::is_previewing)
            .then_some(frame)
    }

    fn forward(&mut self, f: impl FnOnce(&mut CameraScreen) -> Vec<Command>) -> Vec<UiAction> {
        let commands = match self.screen.as_mut() {
            Some(screen) => f(screen),
            None => return vec![],
        };
        self.apply(commands)
    }

    fn apply(&mut self, commands: Vec<Command>) -> Vec<UiAction> {
        let mut actions = Vec::with_capacity(commands.len());
        for command in commands {
            match command {
                Command::RequestPermission { request_code } => {
                    actions.push(UiAction::RequestPermission { request_code })
                }
                Command::AcquireProvider(ticket) => actions.push(UiAction::AcquireProvider(ticket)),
                Command::ClearPreview => actions.push(UiAction::ClearPreview),
                Command::Notify(notice) => actions.push(UiAction::Notify(notice)),
                Command::Close => actions.extend(self.close()),
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::mock::{Call, MockProvider},
        navigation::Route,
    };
    use slint::{Rgba8Pixel, SharedPixelBuffer};

    const CODE: i32 = 101;

    fn controller() -> (AppController, PreviewSurface, Receiver<PreviewFrame>) {
        let (surface, frames) = PreviewSurface::channel();
        (AppController::new(surface.clone(), CODE), surface, frames)
    }

    fn ticket_of(actions: &[UiAction]) -> BindTicket {
        actions
            .iter()
            .find_map(|action| match action {
                UiAction::AcquireProvider(ticket) => Some(*ticket),
                _ => None,
            })
            .expect("no provider acquisition")
    }

    fn frame() -> PreviewFrame {
        SharedPixelBuffer::<Rgba8Pixel>::new(2, 2)
    }

    #[test]
    fn frames_without_screen_are_discarded() {
        let (controller, surface, frames) = controller();
        surface.present(frame());
        surface.present(frame());
        assert!(controller.latest_frame(&frames).is_none());
        // drained, not left for a later screen
        assert!(frames.try_recv().is_err());
    }

    #[test]
    fn frames_show_only_while_previewing() {
        let (mut controller, surface, frames) = controller();
        let ticket = ticket_of(&controller.select("Squat", || true));
        surface.present(frame());
        assert!(controller.latest_frame(&frames).is_none());

        let (_mock, provider) = MockProvider::shared(false);
        controller.on_provider_ready(ticket, Ok(provider));
        surface.present(frame());
        surface.present(SharedPixelBuffer::new(4, 4));
        let shown = controller.latest_frame(&frames).unwrap();
        assert_eq!(shown.width(), 4);
    }

    #[test]
    fn select_opens_screen_and_acquires_provider() {
        let (mut controller, _surface, _frames) = controller();
        let actions = controller.select("BicepCurls", || true);
        assert_eq!(
            actions[0],
            UiAction::ShowCamera {
                title: "Bicep Curls".into()
            }
        );
        assert_eq!(actions.len(), 2);
        ticket_of(&actions);
        assert_eq!(controller.screen().unwrap().exercise(), "BicepCurls");
    }

    #[test]
    fn unknown_card_does_nothing() {
        let (mut controller, _surface, _frames) = controller();
        let actions = controller.select("Burpee", || unreachable!());
        assert!(actions.is_empty());
        assert!(controller.screen().is_none());
    }

    #[test]
    fn missing_exercise_only_notifies() {
        let (mut controller, _surface, _frames) = controller();
        let actions = controller.open(&Intent::new(Route::Camera), || unreachable!());
        assert_eq!(actions, vec![UiAction::Notify(Notice::NoExerciseSelected)]);
        assert!(controller.screen().is_none());
    }

    #[test]
    fn denied_permission_drops_screen_and_stops_watch() {
        let (mut controller, _surface, _frames) = controller();
        let actions = controller.select("Plank", || false);
        assert_eq!(
            actions[1],
            UiAction::RequestPermission { request_code: CODE }
        );
        let actions = controller.on_permission_result(CODE, false);
        assert_eq!(
            actions,
            vec![
                UiAction::Notify(Notice::PermissionRequired),
                UiAction::StopPermissionWatch,
                UiAction::HideCamera,
            ]
        );
        assert!(controller.screen().is_none());
        assert!(controller.on_permission_result(CODE, true).is_empty());
    }

    #[test]
    fn failed_permission_request_counts_as_denial() {
        let (mut controller, _surface, _frames) = controller();
        controller.select("Pushup", || false);
        let actions = controller.permission_request_failed(CODE);
        assert_eq!(actions[0], UiAction::Notify(Notice::PermissionRequired));
        assert_eq!(actions.last(), Some(&UiAction::HideCamera));
        assert!(controller.screen().is_none());
    }

    #[test]
    fn exit_releases_binding_and_hides_camera() {
        let (mut controller, _surface, _frames) = controller();
        let ticket = ticket_of(&controller.select("Squat", || true));
        let (mock, provider) = MockProvider::shared(false);
        controller.on_provider_ready(ticket, Ok(provider));
        mock.borrow_mut().calls.clear();

        let actions = controller.exit();
        assert_eq!(
            actions,
            vec![UiAction::StopPermissionWatch, UiAction::HideCamera]
        );
        assert_eq!(mock.borrow().calls, vec![Call::UnbindAll]);
        assert!(controller.exit().is_empty());
    }

    #[test]
    fn late_completion_after_exit_is_ignored() {
        let (mut controller, _surface, _frames) = controller();
        let ticket = ticket_of(&controller.select("Squat", || true));
        controller.exit();
        let (mock, provider) = MockProvider::shared(false);
        assert!(controller.on_provider_ready(ticket, Ok(provider)).is_empty());
        assert!(mock.borrow().calls.is_empty());
    }

    #[test]
    fn failed_toggle_clears_preview() {
        let (mut controller, _surface, _frames) = controller();
        let ticket = ticket_of(&controller.select("Squat", || true));
        let (mock, provider) = MockProvider::shared(false);
        controller.on_provider_ready(ticket, Ok(provider.clone()));
        mock.borrow_mut().fail_bind = true;

        let ticket = ticket_of(&controller.toggle_camera());
        let actions = controller.on_provider_ready(ticket, Ok(provider));
        assert_eq!(
            actions,
            vec![
                UiAction::ClearPreview,
                UiAction::Notify(Notice::CameraInitFailed),
            ]
        );
    }

    #[test]
    fn suspend_and_resume_round_trip() {
        let (mut controller, _surface, _frames) = controller();
        let ticket = ticket_of(&controller.select("Squat", || true));
        let (mock, provider) = MockProvider::shared(false);
        controller.on_provider_ready(ticket, Ok(provider.clone()));

        assert_eq!(controller.suspend(), vec![UiAction::ClearPreview]);
        assert_eq!(mock.borrow().bound(), None);
        let ticket = ticket_of(&controller.resume());
        controller.on_provider_ready(ticket, Ok(provider));
        assert!(mock.borrow().bound().is_some());
    }

    #[test]
    fn second_open_is_ignored() {
        let (mut controller, _surface, _frames) = controller();
        controller.select("Squat", || true);
        assert!(controller.select("Plank", || true).is_empty());
        assert_eq!(controller.screen().unwrap().exercise(), "Squat");
    }

    #[test]
    fn flash_without_screen_is_silent() {
        let (mut controller, _surface, _frames) = controller();
        assert!(controller.toggle_flash().is_empty());
        controller.select("Squat", || true);
        assert_eq!(
            controller.toggle_flash(),
            vec![UiAction::Notify(Notice::FlashNotImplemented)]
        );
    }
}
