//! Runtime permission plumbing.

use anyhow::Result;

#[cfg(target_os = "android")]
mod android;

#[cfg(target_os = "android")]
pub use android::AndroidPlatform;

pub const CAMERA_PERMISSION: &str = "android.permission.CAMERA";

pub trait Platform {
    fn camera_permission_granted(&self) -> Result<bool>;

    /// Shows the system permission prompt. The answer is observed through
    /// [`PermissionWatcher`].
    fn request_camera_permission(&self, request_code: i32) -> Result<()>;

    /// Whether the app window currently holds input focus.
    fn window_focused(&self) -> Result<bool>;
}

/// Desktop targets have no runtime camera permission.
#[derive(Debug, Default)]
pub struct DesktopPlatform;

impl Platform for DesktopPlatform {
    fn camera_permission_granted(&self) -> Result<bool> {
        Ok(true)
    }

    fn request_camera_permission(&self, _request_code: i32) -> Result<()> {
        Ok(())
    }

    fn window_focused(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Resolves a pending permission request by polling.
///
/// The permission dialog takes focus away from our window; the answer is the
/// permission status once focus comes back. When focus is never lost within
/// `settle_polls` polls the system answered without a dialog, and the
/// current status is the answer.
#[derive(Debug)]
pub struct PermissionWatcher {
    settle_polls: u32,
    polls: u32,
    saw_focus_loss: bool,
}

impl PermissionWatcher {
    pub fn new(settle_polls: u32) -> Self {
        Self {
            settle_polls: settle_polls.max(1),
            polls: 0,
            saw_focus_loss: false,
        }
    }

    /// Feeds one poll. Returns `Some(granted)` once the request is resolved.
    pub fn poll(&mut self, focused: bool, granted: impl FnOnce() -> bool) -> Option<bool> {
        self.polls += 1;
        if !focused {
            self.saw_focus_loss = true;
            return None;
        }
        if self.saw_focus_loss || self.polls >= self.settle_polls {
            return Some(granted());
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Inactive,
}

/// Turns polled window focus into activity transitions.
#[derive(Debug, Default)]
pub struct ActivityWatcher {
    current: Lifecycle,
}

impl ActivityWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Lifecycle {
        self.current
    }

    /// Returns the new state when `focused` changes it.
    pub fn observe(&mut self, focused: bool) -> Option<Lifecycle> {
        let next = if focused {
            Lifecycle::Active
        } else {
            Lifecycle::Inactive
        };
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_when_focus_returns() {
        let mut watcher = PermissionWatcher::new(10);
        assert_eq!(watcher.poll(true, || false), None);
        assert_eq!(watcher.poll(false, || false), None);
        assert_eq!(watcher.poll(false, || false), None);
        assert_eq!(watcher.poll(true, || true), Some(true));
    }

    #[test]
    fn denial_after_dialog() {
        let mut watcher = PermissionWatcher::new(10);
        watcher.poll(false, || unreachable!());
        assert_eq!(watcher.poll(true, || false), Some(false));
    }

    #[test]
    fn settles_without_dialog() {
        let mut watcher = PermissionWatcher::new(3);
        assert_eq!(watcher.poll(true, || unreachable!()), None);
        assert_eq!(watcher.poll(true, || unreachable!()), None);
        assert_eq!(watcher.poll(true, || false), Some(false));
    }

    #[test]
    fn waits_while_dialog_is_open() {
        let mut watcher = PermissionWatcher::new(2);
        for _ in 0..20 {
            assert_eq!(watcher.poll(false, || unreachable!()), None);
        }
        assert_eq!(watcher.poll(true, || true), Some(true));
    }

    #[test]
    fn activity_reports_edges_only() {
        let mut watcher = ActivityWatcher::new();
        assert_eq!(watcher.observe(true), None);
        assert_eq!(watcher.observe(false), Some(Lifecycle::Inactive));
        assert_eq!(watcher.observe(false), None);
        assert_eq!(watcher.current(), Lifecycle::Inactive);
        assert_eq!(watcher.observe(true), Some(Lifecycle::Active));
        assert_eq!(watcher.observe(true), None);
    }

    #[test]
    fn desktop_is_always_granted() {
        let platform = DesktopPlatform;
        assert!(platform.camera_permission_granted().unwrap());
        assert!(platform.request_camera_permission(101).is_ok());
        assert!(platform.window_focused().unwrap());
    }
}
