use thiserror::Error;

use crate::camera::CameraError;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("No exercise selected")]
    MissingExercise,
    #[error("Camera permission is required")]
    PermissionDenied,
    #[error("Camera initialization failed")]
    CameraBindFailure(#[source] CameraError),
}

impl ScreenError {
    /// Terminal errors close the camera screen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScreenError::CameraBindFailure(_))
    }
}

/// Short-lived message shown over the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoExerciseSelected,
    PermissionRequired,
    CameraInitFailed,
    FlashNotImplemented,
}

impl Notice {
    pub fn text(&self) -> &'static str {
        match self {
            Notice::NoExerciseSelected => "No exercise selected",
            Notice::PermissionRequired => "Camera permission is required",
            Notice::CameraInitFailed => "Camera initialization failed",
            Notice::FlashNotImplemented => "Flash toggle not implemented",
        }
    }
}

impl From<&ScreenError> for Notice {
    fn from(err: &ScreenError) -> Self {
        match err {
            ScreenError::MissingExercise => Notice::NoExerciseSelected,
            ScreenError::PermissionDenied => Notice::PermissionRequired,
            ScreenError::CameraBindFailure(_) => Notice::CameraInitFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_match_error_messages() {
        let errors = [
            ScreenError::MissingExercise,
            ScreenError::PermissionDenied,
            ScreenError::CameraBindFailure(CameraError::Unsupported),
        ];
        for err in &errors {
            assert_eq!(Notice::from(err).text(), err.to_string());
        }
    }

    #[test]
    fn only_bind_failure_keeps_the_screen_open() {
        assert!(ScreenError::MissingExercise.is_terminal());
        assert!(ScreenError::PermissionDenied.is_terminal());
        assert!(!ScreenError::CameraBindFailure(CameraError::Unsupported).is_terminal());
    }
}
