use log::info;

use crate::{exercise::Exercise, navigation::Intent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseCard {
    pub exercise: Exercise,
    pub title: String,
}

/// The exercise list shown at launch.
#[derive(Debug, Clone)]
pub struct SelectionScreen {
    cards: Vec<ExerciseCard>,
}

impl Default for SelectionScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionScreen {
    pub fn new() -> Self {
        let cards = Exercise::ALL
            .into_iter()
            .map(|exercise| ExerciseCard {
                exercise,
                title: exercise.display_name().to_string(),
            })
            .collect();
        Self { cards }
    }

    pub fn cards(&self) -> &[ExerciseCard] {
        &self.cards
    }

    /// Intent for the tapped card, or `None` when the identifier is not on screen.
    pub fn select(&self, identifier: &str) -> Option<Intent> {
        let card = self
            .cards
            .iter()
            .find(|card| card.exercise.identifier() == identifier)?;
        info!("exercise selected: {}", card.exercise.identifier());
        Some(Intent::camera(card.exercise))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Route;

    #[test]
    fn lists_every_exercise_once() {
        let screen = SelectionScreen::new();
        let listed: Vec<Exercise> = screen.cards().iter().map(|c| c.exercise).collect();
        assert_eq!(listed, Exercise::ALL.to_vec());
        assert_eq!(screen.cards()[2].title, "Bicep Curls");
    }

    #[test]
    fn selecting_a_card_carries_exactly_its_identifier() {
        let screen = SelectionScreen::new();
        for exercise in Exercise::ALL {
            let intent = screen.select(exercise.identifier()).unwrap();
            assert_eq!(intent.route(), Route::Camera);
            assert_eq!(intent.exercise(), Some(exercise.identifier()));
        }
    }

    #[test]
    fn unknown_card_does_not_navigate() {
        assert!(SelectionScreen::new().select("Deadlift").is_none());
    }
}
