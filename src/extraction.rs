//! Maps raw feed records onto ROI input records.
//!
//! All numeric coercion happens here, once, against [`FIELD_CATALOG`]. The
//! adapter copies what the feed states and leaves every business estimate to
//! the user.

use crate::models::{ExtractedUseCase, ReferenceFields, RoiFields, RoiInputRecord};
use serde::Serialize;
use serde_json::{Map, Value};

pub const BLENDED_HOURLY_RATE: f64 = 100.0;
pub const NEUTRAL_SCORE: u8 = 3;
pub const UNKNOWN_BUSINESS_UNIT: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldGroup {
    CostSavings,
    RevenueGenerated,
    RiskAvoided,
    Referenceability,
    ImplementationCosts,
    Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
    pub description: &'static str,
    pub unit: &'static str,
    pub persisted_default: f64,
}

pub static FIELD_CATALOG: [FieldSpec; 9] = [
    FieldSpec {
        name: "labor_impact_hours",
        group: FieldGroup::CostSavings,
        description: "FTE hours saved per month",
        unit: "hours/month",
        persisted_default: 0.0,
    },
    FieldSpec {
        name: "labor_cost_hourly",
        group: FieldGroup::CostSavings,
        description: "Average loaded cost per FTE",
        unit: "$/hour",
        persisted_default: BLENDED_HOURLY_RATE,
    },
    FieldSpec {
        name: "cost_avoidance_annual",
        group: FieldGroup::CostSavings,
        description: "Hard costs saved such as licenses and penalties",
        unit: "$/year",
        persisted_default: 0.0,
    },
    FieldSpec {
        name: "revenue_impact_annual",
        group: FieldGroup::RevenueGenerated,
        description: "Direct net new revenue generated",
        unit: "$/year",
        persisted_default: 0.0,
    },
    FieldSpec {
        name: "risk_mitigation_score",
        group: FieldGroup::RiskAvoided,
        description: "Reduces regulatory or compliance exposure",
        unit: "1-5 scale",
        persisted_default: NEUTRAL_SCORE as f64,
    },
    FieldSpec {
        name: "customer_reach_score",
        group: FieldGroup::Referenceability,
        description: "Resonates with customers",
        unit: "1-5 scale",
        persisted_default: NEUTRAL_SCORE as f64,
    },
    FieldSpec {
        name: "time_to_value_hours",
        group: FieldGroup::ImplementationCosts,
        description: "Time to develop and release",
        unit: "hours",
        persisted_default: 0.0,
    },
    FieldSpec {
        name: "implementation_cost_hourly",
        group: FieldGroup::ImplementationCosts,
        description: "Average loaded cost per implementation hour",
        unit: "$/hour",
        persisted_default: BLENDED_HOURLY_RATE,
    },
    FieldSpec {
        name: "confidence_level",
        group: FieldGroup::Confidence,
        description: "Requirements understood, data sources defined, repeatable pattern",
        unit: "1-5 scale",
        persisted_default: NEUTRAL_SCORE as f64,
    },
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELD_CATALOG.iter().find(|spec| spec.name == name)
}

fn default_amount(name: &str) -> f64 {
    field_spec(name).map(|spec| spec.persisted_default).unwrap_or(0.0)
}

fn default_score(name: &str) -> u8 {
    field_spec(name)
        .map(|spec| spec.persisted_default as u8)
        .unwrap_or(NEUTRAL_SCORE)
}

/// Reads a non-negative finite amount from loosely typed JSON.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().replace(',', "").trim_start_matches('$').parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

/// Reads a 1-5 score; fractional input rounds to the nearest step.
pub fn coerce_score(value: &Value) -> Option<u8> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    let rounded = parsed.round();
    (1.0..=5.0).contains(&rounded).then_some(rounded as u8)
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn coerce_text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| coerce_text(Some(item)))
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(text)) => text
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_process(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(_)) => coerce_text_list(value).join("\n"),
        other => coerce_text(other),
    }
}

impl RoiFields {
    /// Builds fields from a JSON map keyed by catalog names. Unknown keys are
    /// ignored; malformed values stay unset.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let amount = |name: &str| raw.get(name).and_then(coerce_number);
        let score = |name: &str| raw.get(name).and_then(coerce_score);
        Self {
            labor_impact_hours: amount("labor_impact_hours"),
            labor_cost_hourly: amount("labor_cost_hourly"),
            cost_avoidance_annual: amount("cost_avoidance_annual"),
            revenue_impact_annual: amount("revenue_impact_annual"),
            risk_mitigation_score: score("risk_mitigation_score"),
            customer_reach_score: score("customer_reach_score"),
            time_to_value_hours: amount("time_to_value_hours"),
            implementation_cost_hourly: amount("implementation_cost_hourly"),
            confidence_level: score("confidence_level"),
        }
    }

    /// Fills unset values from the catalog, producing the shape the store persists.
    pub fn with_persisted_defaults(&self) -> Self {
        Self {
            labor_impact_hours: Some(self.labor_impact_hours.unwrap_or_else(|| default_amount("labor_impact_hours"))),
            labor_cost_hourly: Some(self.labor_cost_hourly.unwrap_or_else(|| default_amount("labor_cost_hourly"))),
            cost_avoidance_annual: Some(
                self.cost_avoidance_annual
                    .unwrap_or_else(|| default_amount("cost_avoidance_annual")),
            ),
            revenue_impact_annual: Some(
                self.revenue_impact_annual
                    .unwrap_or_else(|| default_amount("revenue_impact_annual")),
            ),
            risk_mitigation_score: Some(
                self.risk_mitigation_score
                    .unwrap_or_else(|| default_score("risk_mitigation_score")),
            ),
            customer_reach_score: Some(
                self.customer_reach_score
                    .unwrap_or_else(|| default_score("customer_reach_score")),
            ),
            time_to_value_hours: Some(self.time_to_value_hours.unwrap_or_else(|| default_amount("time_to_value_hours"))),
            implementation_cost_hourly: Some(
                self.implementation_cost_hourly
                    .unwrap_or_else(|| default_amount("implementation_cost_hourly")),
            ),
            confidence_level: Some(self.confidence_level.unwrap_or_else(|| default_score("confidence_level"))),
        }
    }
}

/// Produces the default input record for a feed record seen for the first time.
pub fn extract(raw: &Map<String, Value>) -> ExtractedUseCase {
    let inputs = RoiInputRecord::new(coerce_text(raw.get("title")), coerce_text(raw.get("business_unit")))
        .with_fields(RoiFields {
            labor_cost_hourly: Some(BLENDED_HOURLY_RATE),
            implementation_cost_hourly: Some(BLENDED_HOURLY_RATE),
            ..RoiFields::default()
        });

    let reference = ReferenceFields {
        systems_involved: coerce_text_list(raw.get("systems_involved")),
        teams_involved: coerce_text_list(raw.get("teams_involved")),
        roi_estimate: raw.get("roi_estimate").filter(|value| !value.is_null()).cloned(),
        task_frequency: coerce_text(raw.get("task_frequency")),
        task_volume: coerce_text(raw.get("task_volume")),
        importance: coerce_text(raw.get("importance")),
        description: coerce_text(raw.get("description")),
        current_process: coerce_process(raw.get("current_process")),
    };

    ExtractedUseCase { inputs, reference }
}
