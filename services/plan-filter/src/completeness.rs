//! Fills the daily map so that every calendar day of the plan's month has an
//! entry. Missing days get a static rest day or basic meal day.

use serde_json::{json, Map, Value};
use time::{util::days_in_year_month, Date, Month};
use tracing::{debug, info};

use shared::dto::PlanKind;

/// Month a plan document covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: Month,
}

impl Period {
    /// `None` for months outside 1..=12 or years the calendar cannot represent.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
        Date::from_calendar_date(year, month, 1).ok()?;
        Some(Self { year, month })
    }

    pub fn days(self) -> u8 {
        days_in_year_month(self.year, self.month)
    }

    /// English weekday name of `day`, e.g. "Monday".
    pub fn weekday_name(self, day: u8) -> Option<String> {
        Date::from_calendar_date(self.year, self.month, day)
            .ok()
            .map(|d| d.weekday().to_string())
    }

    /// Month and year echoed in `monthly_overview`, each falling back to the
    /// requested value, then to January of `current_year`.
    pub fn resolve(overview: Option<&Value>, requested_month: u32, requested_year: i32, current_year: i32) -> Self {
        let echoed = |key: &str| overview.and_then(|o| o.get(key)).and_then(Value::as_i64);
        let month = echoed("month")
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| (1..=12).contains(m))
            .or_else(|| (1..=12).contains(&requested_month).then_some(requested_month))
            .unwrap_or(1);
        let year = echoed("year")
            .and_then(|y| i32::try_from(y).ok())
            .filter(|&y| Period::new(y, month).is_some())
            .or_else(|| Period::new(requested_year, month).map(|p| p.year))
            .unwrap_or(current_year);

        Period::new(year, month).unwrap_or(Self { year: current_year, month: Month::January })
    }
}

/// Insert a placeholder for every day of `period` missing from the daily map.
/// Existing entries, including days beyond the month, are kept. Returns the
/// number of synthesized days.
pub fn ensure_complete(doc: &mut Map<String, Value>, kind: PlanKind, period: Period) -> usize {
    let daily = doc
        .entry(kind.daily_key())
        .or_insert_with(|| Value::Object(Map::new()));
    if !daily.is_object() {
        *daily = Value::Object(Map::new());
    }
    let Value::Object(days) = daily else {
        return 0;
    };

    let mut added = 0;
    for day in 1..=period.days() {
        let key = day.to_string();
        if days.contains_key(&key) {
            continue;
        }
        let weekday = period.weekday_name(day).unwrap_or_default();
        let entry = match kind {
            PlanKind::Workout => rest_day(&weekday),
            PlanKind::Meal => basic_meal_day(&weekday),
        };
        days.insert(key, entry);
        added += 1;
    }

    if added > 0 {
        info!(%kind, year = period.year, month = %period.month, added, "synthesized missing days");
    } else {
        debug!(%kind, "daily map already complete");
    }
    added
}

fn rest_day(weekday: &str) -> Value {
    json!({
        "day_of_week": weekday,
        "workout_type": "Rest",
        "duration": 0,
        "intensity": "Low",
        "exercises": [],
        "warm_up": [],
        "cool_down": []
    })
}

// The figures below are fixed and do not follow the user's calorie target.
fn basic_meal_day(weekday: &str) -> Value {
    json!({
        "day_of_week": weekday,
        "breakfast": {
            "name": "Basic Breakfast",
            "calories": 300,
            "protein": "15g",
            "carbs": "40g",
            "fat": "10g",
            "prep_time": "10",
            "ingredients": ["Oatmeal", "Banana", "Milk"],
            "instructions": ["Prepare oatmeal according to package directions"],
            "meal_prep_notes": "Can be prepared the night before"
        },
        "lunch": {
            "name": "Simple Lunch",
            "calories": 400,
            "protein": "25g",
            "carbs": "45g",
            "fat": "15g",
            "prep_time": "15",
            "ingredients": ["Chicken breast", "Rice", "Vegetables"],
            "instructions": ["Cook chicken and rice, steam vegetables"],
            "meal_prep_notes": "Can be meal prepped for the week"
        },
        "dinner": {
            "name": "Balanced Dinner",
            "calories": 500,
            "protein": "30g",
            "carbs": "50g",
            "fat": "20g",
            "prep_time": "25",
            "ingredients": ["Fish", "Sweet potato", "Green vegetables"],
            "instructions": ["Bake fish and sweet potato, sauté vegetables"],
            "meal_prep_notes": "Fresh ingredients work best"
        },
        "snacks": [
            {"name": "Healthy Snack", "calories": 150, "ingredients": ["Apple", "Almond butter"]}
        ],
        "daily_totals": {"calories": 1350, "protein": 70, "carbs": 135, "fat": 45, "fiber": 25}
    })
}
