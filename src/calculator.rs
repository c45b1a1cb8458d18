use crate::models::{Payback, RoiFields, RoiInputRecord, RoiResult};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Computes the ROI figures for one input record.
///
/// Total over its input: unset amounts and scores count as zero and both
/// divisions fall back to their documented values instead of failing.
pub fn compute(input: &RoiInputRecord) -> RoiResult {
    compute_fields(&input.fields)
}

pub fn compute_fields(fields: &RoiFields) -> RoiResult {
    let fte_hours_saved = fields.labor_impact_hours.unwrap_or(0.0);
    let hourly_rate = fields.labor_cost_hourly.unwrap_or(0.0);
    let costs_saved_annual = fields.cost_avoidance_annual.unwrap_or(0.0);
    let revenue_generated_annual = fields.revenue_impact_annual.unwrap_or(0.0);
    let time_to_value_hours = fields.time_to_value_hours.unwrap_or(0.0);

    let labor_savings_monthly = fte_hours_saved * hourly_rate;
    let cost_avoidance_monthly = costs_saved_annual / MONTHS_PER_YEAR;
    let revenue_monthly = revenue_generated_annual / MONTHS_PER_YEAR;
    let monthly_benefit = labor_savings_monthly + cost_avoidance_monthly + revenue_monthly;
    let annual_benefit = monthly_benefit * MONTHS_PER_YEAR;

    // Implementation effort is priced at the labor rate, not implementation_cost_hourly.
    let implementation_cost = time_to_value_hours * hourly_rate;

    let payback_period = if monthly_benefit > 0.0 {
        Payback::Months(implementation_cost / monthly_benefit)
    } else {
        Payback::Never
    };

    let annual_roi_percentage = if implementation_cost > 0.0 {
        (MONTHS_PER_YEAR * monthly_benefit - implementation_cost) / implementation_cost * 100.0
    } else {
        0.0
    };

    let risk_mitigation_score = fields.risk_mitigation_score.unwrap_or(0);
    let customer_reach_score = fields.customer_reach_score.unwrap_or(0);
    let confidence_score = fields.confidence_level.unwrap_or(0);
    let strategic_value =
        (f64::from(risk_mitigation_score) + f64::from(customer_reach_score) + f64::from(confidence_score)) / 3.0;

    RoiResult {
        labor_savings_monthly,
        cost_avoidance_monthly,
        revenue_monthly,
        monthly_benefit,
        annual_benefit,
        implementation_cost,
        payback_period,
        annual_roi_percentage,
        strategic_value,
        fte_hours_saved,
        costs_saved_annual,
        revenue_generated_annual,
        time_to_value_hours,
        risk_mitigation_score,
        customer_reach_score,
        confidence_score,
    }
}
