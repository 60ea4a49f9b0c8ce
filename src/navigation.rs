//! Screen routing and the intent passed between screens.

use crate::exercise::Exercise;

/// Extra key under which the selected exercise travels.
pub const EXTRA_EXERCISE: &str = "EXERCISE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Selection,
    Camera,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    route: Route,
    exercise: Option<String>,
}

impl Intent {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            exercise: None,
        }
    }

    pub fn camera(exercise: Exercise) -> Self {
        Self::new(Route::Camera).with_extra(EXTRA_EXERCISE, exercise.identifier())
    }

    /// Only [`EXTRA_EXERCISE`] is carried; other keys are dropped.
    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        if key == EXTRA_EXERCISE {
            self.exercise = Some(value.to_string());
        }
        self
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        match key {
            EXTRA_EXERCISE => self.exercise.as_deref(),
            _ => None,
        }
    }

    pub fn exercise(&self) -> Option<&str> {
        self.extra(EXTRA_EXERCISE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_intent_carries_identifier() {
        let intent = Intent::camera(Exercise::BicepCurls);
        assert_eq!(intent.route(), Route::Camera);
        assert_eq!(intent.exercise(), Some("BicepCurls"));
    }

    #[test]
    fn bare_intent_has_no_exercise() {
        let intent = Intent::new(Route::Camera).with_extra("OTHER", "x");
        assert_eq!(intent.exercise(), None);
        assert_eq!(intent.extra("OTHER"), None);
    }
}
