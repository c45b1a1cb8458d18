//! Portfolio roll-up of every use case with ROI inputs worth counting.

use crate::calculator;
use crate::db::RoiStore;
use crate::models::{
    CostCell, PortfolioSummary, PortfolioTotals, RoiCell, RoiInputRecord, SortDirection, SortKey, SortOptions,
    SummaryRow,
};
use crate::session::WorkingSet;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Reads the store once and summarizes it together with the session overlay.
pub fn aggregate(store: &RoiStore, overlay: &WorkingSet, sort: SortOptions) -> PortfolioSummary {
    let merged = merge_inputs(store.load_all(), overlay);
    summarize(&merged, sort)
}

/// Stored records in store order, with overlay records replacing same-titled
/// ones in place. Overlay-only titles follow in overlay order.
pub fn merge_inputs(stored: Vec<RoiInputRecord>, overlay: &WorkingSet) -> Vec<RoiInputRecord> {
    let mut seen = HashSet::with_capacity(stored.len());
    let mut merged = Vec::with_capacity(stored.len() + overlay.len());

    for record in stored {
        seen.insert(record.use_case_title.clone());
        match overlay.get(&record.use_case_title) {
            Some(edited) => merged.push(edited.clone()),
            None => merged.push(record),
        }
    }
    for record in overlay.iter() {
        if !seen.contains(&record.use_case_title) {
            merged.push(record.clone());
        }
    }
    merged
}

pub fn summarize(merged: &[RoiInputRecord], sort: SortOptions) -> PortfolioSummary {
    let mut totals = PortfolioTotals::default();
    let mut rows = Vec::new();

    for record in merged.iter().filter(|record| record.fields.has_data()) {
        let result = calculator::compute(record);
        let implementation_cost = result.implementation_cost;
        let roi_percentage = if implementation_cost > 0.0 && result.annual_roi_percentage.is_finite() {
            RoiCell::Percent(result.annual_roi_percentage)
        } else {
            RoiCell::NotApplicable
        };

        totals.total_annual_benefit += result.annual_benefit;
        totals.total_implementation_cost += implementation_cost;

        rows.push(SummaryRow {
            use_case_title: record.use_case_title.clone(),
            business_unit: record.business_unit.clone(),
            monthly_benefit: result.monthly_benefit,
            annual_benefit: result.annual_benefit,
            implementation_cost: CostCell::from_cost(implementation_cost),
            net_annual_benefit: result.annual_benefit - implementation_cost,
            roi_percentage,
            strategic_value: result.strategic_value,
        });
    }

    totals.total_net_benefit = totals.total_annual_benefit - totals.total_implementation_cost;
    totals.overall_roi_percentage = if totals.total_implementation_cost > 0.0 {
        totals.total_net_benefit / totals.total_implementation_cost * 100.0
    } else {
        0.0
    };
    totals.use_case_count = rows.len();

    sort_rows(&mut rows, sort);
    PortfolioSummary { totals, rows }
}

/// Stable sort: rows with equal keys keep their incoming order.
pub fn sort_rows(rows: &mut [SummaryRow], sort: SortOptions) {
    rows.sort_by(|left, right| {
        let ordering = compare_by(left, right, sort.key);
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

fn compare_by(left: &SummaryRow, right: &SummaryRow, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => left.use_case_title.cmp(&right.use_case_title),
        SortKey::MonthlyBenefit => left.monthly_benefit.total_cmp(&right.monthly_benefit),
        SortKey::AnnualBenefit => left.annual_benefit.total_cmp(&right.annual_benefit),
        SortKey::NetAnnualBenefit => left.net_annual_benefit.total_cmp(&right.net_annual_benefit),
        SortKey::RoiPercentage => left
            .roi_percentage
            .sort_value()
            .total_cmp(&right.roi_percentage.sort_value()),
        SortKey::StrategicValue => left.strategic_value.total_cmp(&right.strategic_value),
    }
}

#[cfg(test)]
mod tests {
    use super::{merge_inputs, summarize};
    use crate::models::{CostCell, RoiCell, RoiFields, RoiInputRecord, SortDirection, SortKey, SortOptions};
    use crate::session::WorkingSet;

    fn record(title: &str, hours: f64, time_to_value: f64) -> RoiInputRecord {
        RoiInputRecord::new(title, "Ops").with_fields(RoiFields {
            labor_impact_hours: Some(hours),
            labor_cost_hourly: Some(100.0),
            time_to_value_hours: Some(time_to_value),
            risk_mitigation_score: Some(3),
            customer_reach_score: Some(3),
            confidence_level: Some(3),
            ..RoiFields::default()
        })
    }

    fn titles(summary: &crate::models::PortfolioSummary) -> Vec<&str> {
        summary.rows.iter().map(|row| row.use_case_title.as_str()).collect()
    }

    #[test]
    fn overlay_wins_and_keeps_store_position() {
        let stored = vec![record("a", 1.0, 0.0), record("b", 2.0, 0.0)];
        let overlay: WorkingSet = vec![record("c", 3.0, 0.0), record("a", 9.0, 0.0)].into_iter().collect();

        let merged = merge_inputs(stored, &overlay);
        let order: Vec<&str> = merged.iter().map(|r| r.use_case_title.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(merged[0].fields.labor_impact_hours, Some(9.0));
    }

    #[test]
    fn rows_without_benefit_drivers_are_excluded() {
        let mut costly = record("costly", 0.0, 500.0);
        costly.fields.cost_avoidance_annual = None;
        let merged = vec![record("real", 10.0, 20.0), costly];

        let summary = summarize(&merged, SortOptions::default());
        assert_eq!(titles(&summary), vec!["real"]);
        assert_eq!(summary.totals.use_case_count, 1);
        assert_eq!(summary.totals.total_implementation_cost, 2000.0);
    }

    #[test]
    fn totals_and_sentinels() {
        let merged = vec![record("with cost", 10.0, 20.0), record("free", 5.0, 0.0)];
        let summary = summarize(&merged, SortOptions::default());

        assert_eq!(summary.totals.total_annual_benefit, 18_000.0);
        assert_eq!(summary.totals.total_implementation_cost, 2000.0);
        assert_eq!(summary.totals.total_net_benefit, 16_000.0);
        assert_eq!(summary.totals.overall_roi_percentage, 800.0);

        let free = summary.rows.iter().find(|row| row.use_case_title == "free").expect("free row");
        assert_eq!(free.implementation_cost, CostCell::NotSet);
        assert_eq!(free.roi_percentage, RoiCell::NotApplicable);
        assert_eq!(free.net_annual_benefit, 6000.0);

        let costed = summary.rows.iter().find(|row| row.use_case_title == "with cost").expect("row");
        assert_eq!(costed.implementation_cost, CostCell::Set(2000.0));
        assert_eq!(costed.roi_percentage, RoiCell::Percent(500.0));
        assert_eq!(costed.strategic_value, 3.0);
    }

    #[test]
    fn portfolio_without_costs_reports_zero_roi() {
        let summary = summarize(&[record("free", 5.0, 0.0)], SortOptions::default());
        assert_eq!(summary.totals.overall_roi_percentage, 0.0);
        assert!(summarize(&[], SortOptions::default()).is_empty());
    }

    #[test]
    fn sorting_by_each_key() {
        let merged = vec![
            record("bravo", 10.0, 20.0),
            record("alpha", 5.0, 0.0),
            record("charlie", 20.0, 100.0),
        ];
        let by = |key, direction| summarize(&merged, SortOptions { key, direction });

        assert_eq!(
            titles(&by(SortKey::AnnualBenefit, SortDirection::Descending)),
            vec!["charlie", "bravo", "alpha"]
        );
        assert_eq!(
            titles(&by(SortKey::Title, SortDirection::Ascending)),
            vec!["alpha", "bravo", "charlie"]
        );
        // bravo 500%, charlie 140%, alpha N/A counts as 0
        assert_eq!(
            titles(&by(SortKey::RoiPercentage, SortDirection::Descending)),
            vec!["bravo", "charlie", "alpha"]
        );
        assert_eq!(
            titles(&by(SortKey::NetAnnualBenefit, SortDirection::Ascending)),
            vec!["alpha", "bravo", "charlie"]
        );
        assert_eq!(
            titles(&by(SortKey::MonthlyBenefit, SortDirection::Ascending)),
            vec!["alpha", "bravo", "charlie"]
        );
    }

    #[test]
    fn ties_keep_natural_order_in_both_directions() {
        let merged = vec![record("zulu", 1.0, 0.0), record("alpha", 2.0, 0.0), record("mike", 3.0, 0.0)];
        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let summary = summarize(
                &merged,
                SortOptions {
                    key: SortKey::StrategicValue,
                    direction,
                },
            );
            assert_eq!(titles(&summary), vec!["zulu", "alpha", "mike"]);
        }
    }
}
