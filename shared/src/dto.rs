use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Which of the two monthly plan documents a model response is supposed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanKind {
    Workout,
    Meal,
}

const WORKOUT_SECTIONS: &[&str] = &[
    "monthly_overview",
    "weekly_structure",
    "daily_workouts",
    "progression_plan",
    "safety_guidelines",
];

const MEAL_SECTIONS: &[&str] = &[
    "monthly_overview",
    "weekly_themes",
    "daily_meals",
    "weekly_shopping_lists",
    "nutritional_balance",
];

impl PlanKind {
    /// Key under which wrapped service responses carry the plan.
    pub fn plan_key(self) -> &'static str {
        match self {
            PlanKind::Workout => "workout_plan",
            PlanKind::Meal => "meal_plan",
        }
    }

    /// Key of the day-number indexed map.
    pub fn daily_key(self) -> &'static str {
        match self {
            PlanKind::Workout => "daily_workouts",
            PlanKind::Meal => "daily_meals",
        }
    }

    pub fn required_sections(self) -> &'static [&'static str] {
        match self {
            PlanKind::Workout => WORKOUT_SECTIONS,
            PlanKind::Meal => MEAL_SECTIONS,
        }
    }

    /// Sections requested from the model that are kept when present.
    pub fn optional_sections(self) -> &'static [&'static str] {
        match self {
            PlanKind::Workout => &["alternative_exercises"],
            PlanKind::Meal => &["meal_prep_schedule"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Warnings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    /// RFC 3339 timestamp of the validation run.
    pub filtered_at: String,
    pub filter_version: String,
    pub validation_status: ValidationStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterRequest {
    pub raw_text: String,
    pub month: u32,
    pub year: i32,
}

impl FilterRequest {
    /// Checks month and year against what the generation layer accepts.
    pub fn check_bounds(&self, current_year: i32) -> Result<(), String> {
        if !(1..=12).contains(&self.month) {
            return Err(format!("month must be between 1 and 12, got {}", self.month));
        }
        if self.year < current_year || self.year > current_year + 2 {
            return Err(format!(
                "year must be between {} and {}, got {}",
                current_year,
                current_year + 2,
                self.year
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterResponse {
    pub document: Value,
    pub report: ValidationReport,
    pub raw_text: String,
}

/// Body returned when the model output could not be turned into JSON at all.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnparsableResponse {
    pub error: String,
    pub content_length: usize,
    pub preview: String,
    pub line: usize,
    pub column: usize,
    pub raw_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plan_kind_string_forms() {
        assert_eq!(PlanKind::from_str("meal").unwrap(), PlanKind::Meal);
        assert_eq!(PlanKind::Workout.to_string(), "workout");
        assert!(PlanKind::from_str("snack").is_err());
        assert_eq!(serde_json::to_string(&PlanKind::Meal).unwrap(), "\"meal\"");
    }

    #[test]
    fn sections_per_kind() {
        assert_eq!(PlanKind::Workout.daily_key(), "daily_workouts");
        assert!(PlanKind::Meal.required_sections().contains(&"daily_meals"));
        assert_eq!(PlanKind::Meal.required_sections().len(), 5);
        assert_eq!(PlanKind::Workout.required_sections().len(), 5);
    }

    #[test]
    fn request_bounds() {
        let req = FilterRequest { raw_text: String::new(), month: 13, year: 2026 };
        assert!(req.check_bounds(2026).is_err());
        let req = FilterRequest { raw_text: String::new(), month: 2, year: 2029 };
        assert!(req.check_bounds(2026).is_err());
        let req = FilterRequest { raw_text: String::new(), month: 2, year: 2028 };
        assert!(req.check_bounds(2026).is_ok());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ValidationStatus::Warnings).unwrap(),
            "\"warnings\""
        );
    }
}
