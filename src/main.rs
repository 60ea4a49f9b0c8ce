#[cfg(not(target_os = "android"))]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    flexify::run()
}

// Android enters through `android_main` in the library.
#[cfg(target_os = "android")]
fn main() {}
