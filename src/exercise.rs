use std::{fmt, str::FromStr};

use thiserror::Error;

/// Exercises offered on the selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exercise {
    Plank,
    Squat,
    BicepCurls,
    Pushup,
    Suryanamaskara,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown exercise identifier: {0}")]
pub struct UnknownExercise(pub String);

impl Exercise {
    pub const ALL: [Exercise; 5] = [
        Exercise::Plank,
        Exercise::Squat,
        Exercise::BicepCurls,
        Exercise::Pushup,
        Exercise::Suryanamaskara,
    ];

    /// Identifier carried between screens.
    pub fn identifier(&self) -> &'static str {
        match self {
            Exercise::Plank => "Plank",
            Exercise::Squat => "Squat",
            Exercise::BicepCurls => "BicepCurls",
            Exercise::Pushup => "Pushup",
            Exercise::Suryanamaskara => "Suryanamaskara",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Exercise::BicepCurls => "Bicep Curls",
            other => other.identifier(),
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Exercise {
    type Err = UnknownExercise;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Exercise::ALL
            .into_iter()
            .find(|exercise| exercise.identifier() == s)
            .ok_or_else(|| UnknownExercise(s.to_string()))
    }
}

/// Title for any identifier, falling back to the raw string when it is not one we know.
pub fn title_for(identifier: &str) -> String {
    match identifier.parse::<Exercise>() {
        Ok(exercise) => exercise.display_name().to_string(),
        Err(_) => identifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_parse_back() {
        for exercise in Exercise::ALL {
            assert_eq!(exercise.identifier().parse::<Exercise>(), Ok(exercise));
        }
    }

    #[test]
    fn only_bicep_curls_is_renamed() {
        assert_eq!(Exercise::BicepCurls.display_name(), "Bicep Curls");
        assert_eq!(Exercise::Plank.display_name(), "Plank");
        assert_eq!(Exercise::Suryanamaskara.to_string(), "Suryanamaskara");
    }

    #[test]
    fn unknown_identifier_is_rejected_but_titled_raw() {
        assert_eq!(
            "Burpee".parse::<Exercise>(),
            Err(UnknownExercise("Burpee".to_string()))
        );
        assert_eq!(title_for("Burpee"), "Burpee");
        assert_eq!(title_for("BicepCurls"), "Bicep Curls");
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("plank".parse::<Exercise>().is_err());
    }
}
