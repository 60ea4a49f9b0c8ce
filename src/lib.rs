mod app;

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod exercise;
pub mod executor;
pub mod navigation;
pub mod platform;
pub mod selection;
pub mod session;

pub use app::run;

#[cfg(target_os = "android")]
#[no_mangle]
fn android_main(app: slint::android::AndroidApp) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("flexify"),
    );
    if let Err(err) = slint::android::init(app.clone()) {
        log::error!("slint android init failed: {err}");
        return;
    }
    if let Err(err) = app::run(app) {
        log::error!("flexify exited with error: {err:#}");
    }
}
