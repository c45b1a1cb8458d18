use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The nine user-entered metrics behind one ROI estimate.
///
/// `None` means the user never entered the value. The store replaces unset
/// values with catalog defaults when it persists a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiFields {
    pub labor_impact_hours: Option<f64>,
    pub labor_cost_hourly: Option<f64>,
    pub cost_avoidance_annual: Option<f64>,
    pub revenue_impact_annual: Option<f64>,
    pub risk_mitigation_score: Option<u8>,
    pub customer_reach_score: Option<u8>,
    pub time_to_value_hours: Option<f64>,
    pub implementation_cost_hourly: Option<f64>,
    pub confidence_level: Option<u8>,
}

impl RoiFields {
    /// True when at least one benefit driver carries a non-zero value.
    pub fn has_data(&self) -> bool {
        [
            self.labor_impact_hours,
            self.cost_avoidance_annual,
            self.revenue_impact_annual,
        ]
        .iter()
        .any(|value| matches!(value, Some(v) if *v != 0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiInputRecord {
    pub use_case_title: String,
    pub business_unit: String,
    #[serde(flatten)]
    pub fields: RoiFields,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RoiInputRecord {
    pub fn new(use_case_title: impl Into<String>, business_unit: impl Into<String>) -> Self {
        Self {
            use_case_title: use_case_title.into(),
            business_unit: business_unit.into(),
            fields: RoiFields::default(),
            updated_at: None,
        }
    }

    pub fn with_fields(mut self, fields: RoiFields) -> Self {
        self.fields = fields;
        self
    }
}

/// Descriptive fields copied from a feed record for display next to the calculator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceFields {
    pub systems_involved: Vec<String>,
    pub teams_involved: Vec<String>,
    pub roi_estimate: Option<serde_json::Value>,
    pub task_frequency: String,
    pub task_volume: String,
    pub importance: String,
    pub description: String,
    pub current_process: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedUseCase {
    pub inputs: RoiInputRecord,
    pub reference: ReferenceFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Payback {
    Months(f64),
    Never,
}

impl Payback {
    pub fn months(self) -> Option<f64> {
        match self {
            Self::Months(value) => Some(value),
            Self::Never => None,
        }
    }

    pub fn is_never(self) -> bool {
        matches!(self, Self::Never)
    }
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Months(value) => write!(f, "{:.1} months", value),
            Self::Never => write!(f, "\u{221e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiResult {
    pub labor_savings_monthly: f64,
    pub cost_avoidance_monthly: f64,
    pub revenue_monthly: f64,
    pub monthly_benefit: f64,
    pub annual_benefit: f64,
    pub implementation_cost: f64,
    pub payback_period: Payback,
    pub annual_roi_percentage: f64,
    pub strategic_value: f64,
    pub fte_hours_saved: f64,
    pub costs_saved_annual: f64,
    pub revenue_generated_annual: f64,
    pub time_to_value_hours: f64,
    pub risk_mitigation_score: u8,
    pub customer_reach_score: u8,
    pub confidence_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostCell {
    Set(f64),
    NotSet,
}

impl CostCell {
    pub fn from_cost(cost: f64) -> Self {
        if cost > 0.0 {
            Self::Set(cost)
        } else {
            Self::NotSet
        }
    }
}

impl fmt::Display for CostCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(value) => write!(f, "${:.0}", value),
            Self::NotSet => write!(f, "Not Set"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoiCell {
    Percent(f64),
    NotApplicable,
}

impl RoiCell {
    /// Ordering value; `NotApplicable` sorts as zero.
    pub fn sort_value(self) -> f64 {
        match self {
            Self::Percent(value) => value,
            Self::NotApplicable => 0.0,
        }
    }
}

impl fmt::Display for RoiCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{:.1}%", value),
            Self::NotApplicable => write!(f, "N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub use_case_title: String,
    pub business_unit: String,
    pub monthly_benefit: f64,
    pub annual_benefit: f64,
    pub implementation_cost: CostCell,
    pub net_annual_benefit: f64,
    pub roi_percentage: RoiCell,
    pub strategic_value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_annual_benefit: f64,
    pub total_implementation_cost: f64,
    pub total_net_benefit: f64,
    pub overall_roi_percentage: f64,
    pub use_case_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub totals: PortfolioTotals,
    pub rows: Vec<SummaryRow>,
}

impl PortfolioSummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Title,
    MonthlyBenefit,
    AnnualBenefit,
    NetAnnualBenefit,
    RoiPercentage,
    StrategicValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOptions {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            key: SortKey::AnnualBenefit,
            direction: SortDirection::Descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CostCell, Payback, RoiCell, RoiFields};

    #[test]
    fn has_data_ignores_zero_and_unset_drivers() {
        let mut fields = RoiFields {
            time_to_value_hours: Some(40.0),
            labor_cost_hourly: Some(100.0),
            cost_avoidance_annual: Some(0.0),
            ..RoiFields::default()
        };
        assert!(!fields.has_data());

        fields.revenue_impact_annual = Some(1200.0);
        assert!(fields.has_data());
    }

    #[test]
    fn sentinels_render_for_display() {
        assert_eq!(CostCell::from_cost(0.0).to_string(), "Not Set");
        assert_eq!(CostCell::from_cost(1000.0).to_string(), "$1000");
        assert_eq!(RoiCell::NotApplicable.to_string(), "N/A");
        assert_eq!(RoiCell::Percent(860.0).to_string(), "860.0%");
        assert_eq!(RoiCell::NotApplicable.sort_value(), 0.0);
        assert_eq!(Payback::Months(1.5).to_string(), "1.5 months");
        assert_eq!(Payback::Never.months(), None);
    }
}
