//! One call of the filter: parse, unwrap, clean, complete and validate a
//! model response.

use std::path::PathBuf;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, instrument};

use shared::config::Settings;
use shared::dto::{PlanKind, ValidationReport};
use shared::error::Result;

use crate::cleaner::{clean_plan, Cleaned};
use crate::completeness::{ensure_complete, Period};
use crate::extractor::extract_plan;
use crate::json_relaxed::{parse_json_relaxed, Strategy};
use crate::validator::validate;

#[derive(Clone, Debug)]
pub struct FilterCfg {
    /// Where unparsable responses are written; `None` disables dumps.
    pub debug_dump_dir: Option<PathBuf>,
    pub filter_version: String,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            debug_dump_dir: None,
            filter_version: "1.0.0".into(),
        }
    }
}

impl From<&Settings> for FilterCfg {
    fn from(s: &Settings) -> Self {
        Self {
            debug_dump_dir: s.debug_dumps.then(|| PathBuf::from(&s.debug_dump_dir)),
            filter_version: s.filter_version.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Cleaned, completed plan with `filter_metadata` attached.
    pub document: Value,
    pub report: ValidationReport,
    pub raw_text: String,
    /// Parser output before extraction and cleaning.
    pub parsed: Value,
    pub strategy: Strategy,
}

/// Turns raw model output into a validated plan document.
#[derive(Clone, Debug, Default)]
pub struct PlanFilter {
    cfg: FilterCfg,
}

impl PlanFilter {
    pub fn new(cfg: FilterCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &FilterCfg {
        &self.cfg
    }

    /// Parse, extract, clean, complete and validate `raw_text` for the
    /// requested month. Only text that no parse strategy can handle fails;
    /// every other problem ends up in the report.
    #[instrument(skip(self, raw_text), fields(len = raw_text.len()))]
    pub fn repair_and_validate(
        &self,
        raw_text: &str,
        month: u32,
        year: i32,
        kind: PlanKind,
    ) -> Result<FilterOutcome> {
        let relaxed = parse_json_relaxed(raw_text, self.cfg.debug_dump_dir.as_deref())?;
        let (document, report) = self.filter_parsed(
            relaxed.value.clone(),
            month,
            year,
            kind,
            OffsetDateTime::now_utc(),
        );
        info!(
            strategy = %relaxed.strategy,
            status = ?report.validation_status,
            errors = report.errors.len(),
            "plan filtered"
        );
        Ok(FilterOutcome {
            document,
            report,
            raw_text: raw_text.to_string(),
            parsed: relaxed.value,
            strategy: relaxed.strategy,
        })
    }

    /// Every stage after parsing, with the clock passed in.
    pub fn filter_parsed(
        &self,
        parsed: Value,
        month: u32,
        year: i32,
        kind: PlanKind,
        now: OffsetDateTime,
    ) -> (Value, ValidationReport) {
        let plan = extract_plan(parsed, kind);
        let Cleaned {
            mut document,
            warnings,
        } = clean_plan(plan, kind);

        let period = Period::resolve(document.get("monthly_overview"), month, year, now.year());
        ensure_complete(&mut document, kind, period);

        let report = validate(
            &mut document,
            kind,
            month,
            year,
            warnings,
            &self.cfg.filter_version,
            now,
        );
        (Value::Object(document), report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::dto::ValidationStatus;
    use time::macros::datetime;

    #[test]
    fn cfg_from_settings() {
        let settings = Settings {
            debug_dump_dir: "/tmp/dumps".into(),
            debug_dumps: true,
            filter_version: "2.0.0".into(),
            http_bind: "127.0.0.1".into(),
            http_port: 8000,
            cors_origins: String::new(),
        };
        let cfg = FilterCfg::from(&settings);
        assert_eq!(cfg.debug_dump_dir, Some(PathBuf::from("/tmp/dumps")));
        assert_eq!(cfg.filter_version, "2.0.0");

        let cfg = FilterCfg::from(&Settings { debug_dumps: false, ..settings });
        assert!(cfg.debug_dump_dir.is_none());
    }

    #[test]
    fn wrapped_complete_plan_passes() {
        let parsed = json!({
            "success": true,
            "workout_plan": {
                "monthly_overview": {"month": 4, "year": 2025, "workout_days": 18, "rest_days": 12},
                "weekly_structure": {},
                "daily_workouts": {"1": {"workout_type": "Strength", "duration": 50}},
                "progression_plan": {},
                "safety_guidelines": {}
            }
        });
        let filter = PlanFilter::default();
        let (doc, report) =
            filter.filter_parsed(parsed, 4, 2025, PlanKind::Workout, datetime!(2025-03-20 08:00 UTC));

        assert_eq!(report.validation_status, ValidationStatus::Passed);
        assert_eq!(doc["daily_workouts"].as_object().unwrap().len(), 30);
        assert_eq!(doc["daily_workouts"]["1"]["duration"], 50);
        assert_eq!(doc["daily_workouts"]["1"]["day_of_week"], "");
        assert_eq!(doc["daily_workouts"]["2"]["day_of_week"], "Wednesday");
        assert_eq!(doc["filter_metadata"]["filtered_at"], "2025-03-20T08:00:00Z");
        assert!(doc.get("success").is_none());
    }

    #[test]
    fn echoed_month_drives_completeness() {
        let parsed = json!({"monthly_overview": {"month": 2, "year": 2023}, "daily_meals": {}});
        let filter = PlanFilter::default();
        let (doc, report) =
            filter.filter_parsed(parsed, 3, 2023, PlanKind::Meal, datetime!(2023-01-01 00:00 UTC));
        assert_eq!(doc["daily_meals"].as_object().unwrap().len(), 28);
        assert!(report
            .errors
            .contains(&"Month mismatch: expected 3, got 2".to_string()));
    }
}
