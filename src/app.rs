use std::{cell::RefCell, rc::Rc, sync::mpsc::Receiver};

use anyhow::Result;
use log::{error, info, warn};
use slint::{Image, ModelRc, SharedString, Timer, TimerMode, VecModel};

use crate::{
    camera::{self, PreviewFrame, PreviewSurface},
    config::AppConfig,
    controller::{AppController, UiAction},
    error::Notice,
    platform::{ActivityWatcher, Lifecycle, PermissionWatcher, Platform},
    selection::SelectionScreen,
    session::BindTicket,
};

slint::slint! {
    import { Button, VerticalBox, HorizontalBox } from "std-widgets.slint";

    export struct ExerciseCard {
        id: string,
        title: string,
    }

    export component MainWindow inherits Window {
        title: "Flexify";
        preferred-width: 420px;
        preferred-height: 780px;

        in property <[ExerciseCard]> exercises;
        in property <bool> camera-open;
        in property <string> exercise-title;
        in property <image> camera-frame;
        in property <bool> preview-active;
        in property <string> notice;

        callback exercise-selected(string);
        callback exit-camera();
        callback toggle-camera();
        callback toggle-flash();

        if !root.camera-open : VerticalBox {
            alignment: start;
            Text {
                text: "Choose an exercise";
                font-size: 24px;
                horizontal-alignment: center;
            }
            for card in root.exercises : Rectangle {
                height: 72px;
                border-radius: 12px;
                background: touch.pressed ? #3a3f47 : #2b2f36;
                Text {
                    text: card.title;
                    color: white;
                    font-size: 20px;
                    horizontal-alignment: center;
                    vertical-alignment: center;
                }
                touch := TouchArea {
                    clicked => {
                        root.exercise-selected(card.id);
                    }
                }
            }
        }

        if root.camera-open : Rectangle {
            background: black;
            if root.preview-active : Image {
                width: 100%;
                height: 100%;
                source: root.camera-frame;
                image-fit: contain;
            }
            Text {
                y: 16px;
                width: 100%;
                height: 32px;
                text: root.exercise-title;
                color: white;
                font-size: 22px;
                horizontal-alignment: center;
            }
            HorizontalBox {
                y: parent.height - self.height - 24px;
                width: 100%;
                height: 56px;
                alignment: center;
                Button {
                    text: "Exit";
                    clicked => {
                        root.exit-camera();
                    }
                }
                Button {
                    text: "Flip";
                    clicked => {
                        root.toggle-camera();
                    }
                }
                Button {
                    text: "Flash";
                    clicked => {
                        root.toggle-flash();
                    }
                }
            }
        }

        if root.notice != "" : Rectangle {
            width: 80%;
            height: 40px;
            x: (parent.width - self.width) / 2;
            y: parent.height - 140px;
            border-radius: 20px;
            background: #000000c0;
            Text {
                text: root.notice;
                color: white;
                horizontal-alignment: center;
                vertical-alignment: center;
            }
        }
    }
}

/// Performs the controller's actions on the window and the platform.
struct AppContext {
    window: slint::Weak<MainWindow>,
    config: AppConfig,
    platform: Box<dyn Platform>,
    controller: RefCell<AppController>,
    notice_timer: Timer,
    permission_timer: Timer,
}

impl AppContext {
    /// Runs `f` on the controller, then performs its actions with the borrow released.
    fn update(self: &Rc<Self>, f: impl FnOnce(&mut AppController) -> Vec<UiAction>) {
        let actions = f(&mut self.controller.borrow_mut());
        self.perform(actions);
    }

    fn permission_granted(&self) -> bool {
        self.platform.camera_permission_granted().unwrap_or_else(|err| {
            warn!("permission check failed: {err:#}");
            false
        })
    }

    fn perform(self: &Rc<Self>, actions: Vec<UiAction>) {
        for action in actions {
            match action {
                UiAction::ShowCamera { title } => self.with_window(|window| {
                    window.set_exercise_title(title.into());
                    window.set_preview_active(false);
                    window.set_camera_open(true);
                }),
                UiAction::HideCamera => self.with_window(|window| {
                    window.set_preview_active(false);
                    window.set_camera_open(false);
                }),
                UiAction::ClearPreview => {
                    self.with_window(|window| window.set_preview_active(false))
                }
                UiAction::Notify(notice) => self.notify(notice),
                UiAction::RequestPermission { request_code } => {
                    self.request_permission(request_code)
                }
                UiAction::StopPermissionWatch => self.permission_timer.stop(),
                UiAction::AcquireProvider(ticket) => self.acquire_provider(ticket),
            }
        }
    }

    fn with_window(&self, f: impl FnOnce(&MainWindow)) {
        if let Some(window) = self.window.upgrade() {
            f(&window);
        }
    }

    fn request_permission(self: &Rc<Self>, request_code: i32) {
        if let Err(err) = self.platform.request_camera_permission(request_code) {
            error!("permission request failed: {err:#}");
            self.update(|controller| controller.permission_request_failed(request_code));
            return;
        }
        let context = Rc::downgrade(self);
        let mut watcher = PermissionWatcher::new(self.config.permission.settle_polls());
        self.permission_timer.start(
            TimerMode::Repeated,
            self.config.permission.poll_interval(),
            move || {
                let Some(context) = context.upgrade() else {
                    return;
                };
                let focused = context.platform.window_focused().unwrap_or(true);
                let answer = watcher.poll(focused, || context.permission_granted());
                if let Some(granted) = answer {
                    context.permission_timer.stop();
                    context.update(|controller| {
                        controller.on_permission_result(request_code, granted)
                    });
                }
            },
        );
    }

    fn acquire_provider(self: &Rc<Self>, ticket: BindTicket) {
        let context = Rc::downgrade(self);
        let preview = self.config.preview.clone();
        let spawned = slint::spawn_local(async move {
            let provider = camera::get_instance(&preview).await;
            if let Some(context) = context.upgrade() {
                context.update(|controller| controller.on_provider_ready(ticket, provider));
            }
        });
        if let Err(err) = spawned {
            error!("camera provider acquisition not scheduled: {err}");
        }
    }

    fn notify(&self, notice: Notice) {
        info!("notice: {}", notice.text());
        let Some(window) = self.window.upgrade() else {
            return;
        };
        window.set_notice(notice.text().into());
        let weak = self.window.clone();
        self.notice_timer.start(
            TimerMode::SingleShot,
            self.config.ui.notice_duration(),
            move || {
                if let Some(window) = weak.upgrade() {
                    window.set_notice(SharedString::default());
                }
            },
        );
    }

    fn on_lifecycle(self: &Rc<Self>, lifecycle: Lifecycle) {
        match lifecycle {
            Lifecycle::Inactive => self.update(AppController::suspend),
            Lifecycle::Active => self.update(AppController::resume),
        }
    }

    fn show_latest_frame(&self, frames: &Receiver<PreviewFrame>) {
        let Some(frame) = self.controller.borrow().latest_frame(frames) else {
            return;
        };
        self.with_window(|window| {
            window.set_camera_frame(Image::from_rgba8(frame));
            window.set_preview_active(true);
        });
    }
}

fn exercise_cards(selection: &SelectionScreen) -> ModelRc<ExerciseCard> {
    let cards: Vec<ExerciseCard> = selection
        .cards()
        .iter()
        .map(|card| ExerciseCard {
            id: card.exercise.identifier().into(),
            title: card.title.as_str().into(),
        })
        .collect();
    ModelRc::new(VecModel::from(cards))
}

pub fn run(
    #[cfg(target_os = "android")]
    android_app: slint::android::AndroidApp,
) -> Result<()> {
    let config = AppConfig::load()?;
    let window = MainWindow::new()?;

    #[cfg(target_os = "android")]
    let platform: Box<dyn Platform> =
        Box::new(crate::platform::AndroidPlatform::new(android_app));
    #[cfg(not(target_os = "android"))]
    let platform: Box<dyn Platform> = Box::new(crate::platform::DesktopPlatform);

    let (surface, frames) = PreviewSurface::channel();
    let controller = AppController::new(surface, config.permission.request_code);
    window.set_exercises(exercise_cards(controller.selection()));

    let context = Rc::new(AppContext {
        window: window.as_weak(),
        config,
        platform,
        controller: RefCell::new(controller),
        notice_timer: Timer::default(),
        permission_timer: Timer::default(),
    });

    let frame_timer = Timer::default();
    let weak = Rc::downgrade(&context);
    frame_timer.start(TimerMode::Repeated, context.config.ui.frame_poll(), move || {
        if let Some(context) = weak.upgrade() {
            context.show_latest_frame(&frames);
        }
    });

    let lifecycle_timer = Timer::default();
    let weak = Rc::downgrade(&context);
    let mut activity = ActivityWatcher::new();
    lifecycle_timer.start(
        TimerMode::Repeated,
        context.config.permission.poll_interval(),
        move || {
            let Some(context) = weak.upgrade() else {
                return;
            };
            let focused = context.platform.window_focused().unwrap_or(true);
            if let Some(lifecycle) = activity.observe(focused) {
                context.on_lifecycle(lifecycle);
            }
        },
    );

    let weak = Rc::downgrade(&context);
    window.on_exercise_selected(move |identifier| {
        if let Some(context) = weak.upgrade() {
            let granted = || context.permission_granted();
            context.update(|controller| controller.select(identifier.as_str(), granted));
        }
    });

    let weak = Rc::downgrade(&context);
    window.on_exit_camera(move || {
        if let Some(context) = weak.upgrade() {
            context.update(AppController::exit);
        }
    });

    let weak = Rc::downgrade(&context);
    window.on_toggle_camera(move || {
        if let Some(context) = weak.upgrade() {
            context.update(AppController::toggle_camera);
        }
    });

    let weak = Rc::downgrade(&context);
    window.on_toggle_flash(move || {
        if let Some(context) = weak.upgrade() {
            context.update(AppController::toggle_flash);
        }
    });

    info!("flexify started");
    window.run()?;
    lifecycle_timer.stop();
    context.update(AppController::close);
    Ok(())
}
