use crate::calculator;
use crate::db::RoiStore;
use crate::errors::{AppError, AppResult};
use crate::extraction::{extract, UNKNOWN_BUSINESS_UNIT};
use crate::feed::RawUseCase;
use crate::models::{PortfolioSummary, RoiFields, RoiInputRecord, RoiResult, SortOptions};
use crate::portfolio;
use std::collections::HashMap;

/// In-memory ROI inputs for one user session, in first-touch order.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    records: Vec<RoiInputRecord>,
    index: HashMap<String, usize>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index.contains_key(title)
    }

    pub fn get(&self, title: &str) -> Option<&RoiInputRecord> {
        self.index.get(title).map(|position| &self.records[*position])
    }

    pub fn get_mut(&mut self, title: &str) -> Option<&mut RoiInputRecord> {
        let position = *self.index.get(title)?;
        self.records.get_mut(position)
    }

    /// Inserts or replaces by title. A replaced record keeps its position.
    pub fn upsert(&mut self, record: RoiInputRecord) -> Option<RoiInputRecord> {
        match self.index.get(&record.use_case_title) {
            Some(position) => Some(std::mem::replace(&mut self.records[*position], record)),
            None => {
                self.index.insert(record.use_case_title.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn remove(&mut self, title: &str) -> Option<RoiInputRecord> {
        let position = self.index.remove(title)?;
        let removed = self.records.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoiInputRecord> {
        self.records.iter()
    }
}

impl FromIterator<RoiInputRecord> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = RoiInputRecord>>(iter: I) -> Self {
        let mut working = Self::new();
        for record in iter {
            working.upsert(record);
        }
        working
    }
}

/// One user's editing session: a working set written through to the store.
///
/// Edits always land in the working set first, so a disconnected store only
/// costs durability.
#[derive(Debug)]
pub struct RoiSession<'a> {
    store: &'a RoiStore,
    working: WorkingSet,
}

impl<'a> RoiSession<'a> {
    pub fn new(store: &'a RoiStore) -> Self {
        Self::with_working_set(store, WorkingSet::new())
    }

    pub fn with_working_set(store: &'a RoiStore, working: WorkingSet) -> Self {
        Self { store, working }
    }

    pub fn store(&self) -> &RoiStore {
        self.store
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working
    }

    /// Returns the working record for a feed use case, creating it on first view
    /// from the saved inputs or, failing that, from extracted defaults.
    pub fn open_use_case(&mut self, raw: &RawUseCase) -> AppResult<&RoiInputRecord> {
        let extracted = extract(raw);
        let title = extracted.inputs.use_case_title.clone();
        if title.is_empty() {
            return Err(AppError::Validation("use case has no title".to_string()));
        }

        if !self.working.contains(&title) {
            let record = match self.store.load(&title) {
                Some(saved) => saved,
                None => extracted.inputs,
            };
            self.working.upsert(record);
        }

        self.working
            .get(&title)
            .ok_or_else(|| AppError::Internal(format!("working record for {} vanished", title)))
    }

    /// Replaces the fields of a working record and writes it through.
    /// Unset fields take their persisted defaults in the session too, so the
    /// working record matches what the store holds.
    /// Returns whether the edit reached the store.
    pub fn update_fields(&mut self, title: &str, fields: RoiFields) -> bool {
        if title.trim().is_empty() {
            tracing::warn!("ignoring roi edit without a use case title");
            return false;
        }
        if !self.working.contains(title) {
            self.working.upsert(RoiInputRecord::new(title, UNKNOWN_BUSINESS_UNIT));
        }
        let Some(record) = self.working.get_mut(title) else {
            return false;
        };
        record.fields = fields.with_persisted_defaults();

        if !self.store.is_connected() {
            tracing::debug!(use_case = %title, "roi store offline; keeping edit in session only");
            return false;
        }

        match self.store.try_save(title, &record.fields, Some(record.business_unit.as_str())) {
            Ok(saved) => {
                record.fields = saved.fields;
                record.business_unit = saved.business_unit;
                record.updated_at = saved.updated_at;
                true
            }
            Err(error) => {
                tracing::warn!(use_case = %title, error = %error, "failed to persist roi edit");
                false
            }
        }
    }

    /// Drops the use case from the store and the working set. True if either held it.
    pub fn delete(&mut self, title: &str) -> bool {
        let removed_from_store = self.store.delete(title);
        let removed_from_session = self.working.remove(title).is_some();
        removed_from_store || removed_from_session
    }

    /// Pulls every saved record into the working set, replacing session copies.
    pub fn reload_from_store(&mut self) -> usize {
        let saved = self.store.load_all();
        let count = saved.len();
        for record in saved {
            self.working.upsert(record);
        }
        count
    }

    pub fn result_for(&self, title: &str) -> Option<RoiResult> {
        self.working.get(title).map(calculator::compute)
    }

    pub fn portfolio(&self, sort: SortOptions) -> PortfolioSummary {
        portfolio::aggregate(self.store, &self.working, sort)
    }

    pub fn into_working_set(self) -> WorkingSet {
        self.working
    }
}

#[cfg(test)]
mod tests {
    use super::{RoiSession, WorkingSet};
    use crate::config::StoreSettings;
    use crate::db::RoiStore;
    use crate::errors::AppError;
    use crate::models::{CostCell, RoiFields, RoiInputRecord};
    use serde_json::json;

    fn raw(value: serde_json::Value) -> crate::feed::RawUseCase {
        value.as_object().cloned().expect("object")
    }

    fn benefit_fields(hours: f64) -> RoiFields {
        RoiFields {
            labor_impact_hours: Some(hours),
            labor_cost_hourly: Some(100.0),
            time_to_value_hours: Some(10.0),
            ..RoiFields::default()
        }
    }

    #[test]
    fn working_set_keeps_positions_across_replace_and_remove() {
        let mut working: WorkingSet = ["a", "b", "c"]
            .into_iter()
            .map(|title| RoiInputRecord::new(title, "Ops"))
            .collect();
        assert!(working.upsert(RoiInputRecord::new("b", "Finance")).is_some());
        assert_eq!(working.get("b").map(|record| record.business_unit.as_str()), Some("Finance"));

        assert!(working.remove("a").is_some());
        assert!(working.remove("a").is_none());
        let titles: Vec<&str> = working.iter().map(|record| record.use_case_title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
        assert_eq!(working.get("c").map(|record| record.use_case_title.as_str()), Some("c"));
    }

    #[test]
    fn first_view_uses_saved_inputs_when_present() {
        let store = RoiStore::open(&StoreSettings::in_memory()).expect("store");
        assert!(store.save("Saved case", &benefit_fields(7.0), Some("Finance")));

        let mut session = RoiSession::new(&store);
        let saved = session
            .open_use_case(&raw(json!({"title": "Saved case", "business_unit": "Finance"})))
            .expect("open saved");
        assert_eq!(saved.fields.labor_impact_hours, Some(7.0));

        let fresh = session
            .open_use_case(&raw(json!({"title": "Fresh case", "business_unit": "Ops"})))
            .expect("open fresh");
        assert_eq!(fresh.fields.labor_impact_hours, None);
        assert_eq!(fresh.fields.labor_cost_hourly, Some(100.0));

        let missing_title = session.open_use_case(&raw(json!({"business_unit": "Ops"})));
        assert!(matches!(missing_title, Err(AppError::Validation(_))));
    }

    #[test]
    fn edits_write_through_to_store() {
        let store = RoiStore::open(&StoreSettings::in_memory()).expect("store");
        let mut session = RoiSession::new(&store);
        session
            .open_use_case(&raw(json!({"title": "Invoice triage", "business_unit": "Finance"})))
            .expect("open");

        assert!(session.update_fields("Invoice triage", benefit_fields(12.0)));
        let saved = store.load("Invoice triage").expect("persisted");
        assert_eq!(saved.business_unit, "Finance");
        assert_eq!(saved.fields.labor_impact_hours, Some(12.0));
        assert!(session.working_set().get("Invoice triage").and_then(|r| r.updated_at).is_some());

        let result = session.result_for("Invoice triage").expect("result");
        assert_eq!(result.monthly_benefit, 1200.0);
    }

    #[test]
    fn offline_store_keeps_edits_in_session() {
        let store = RoiStore::disconnected();
        let mut session = RoiSession::new(&store);

        assert!(!session.update_fields("Offline case", benefit_fields(5.0)));
        assert_eq!(
            session.working_set().get("Offline case").and_then(|record| record.fields.labor_impact_hours),
            Some(5.0)
        );
        let summary = session.portfolio(Default::default());
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].use_case_title, "Offline case");
    }

    #[test]
    fn sparse_edit_prices_the_same_before_and_after_reload() {
        let store = RoiStore::open(&StoreSettings::in_memory()).expect("store");
        let sparse = RoiFields {
            labor_impact_hours: Some(10.0),
            time_to_value_hours: Some(20.0),
            ..RoiFields::default()
        };

        let mut session = RoiSession::new(&store);
        assert!(session.update_fields("Case", sparse));
        let live = session.portfolio(Default::default());
        assert_eq!(live.rows.len(), 1);
        assert_eq!(live.rows[0].monthly_benefit, 1000.0);
        assert_eq!(live.rows[0].implementation_cost, CostCell::Set(2000.0));
        assert_eq!(
            session.working_set().get("Case").map(|record| record.fields),
            store.load("Case").map(|record| record.fields)
        );

        let fresh = RoiSession::new(&store);
        let reloaded = fresh.portfolio(Default::default());
        assert_eq!(reloaded.rows, live.rows);
        assert_eq!(reloaded.totals, live.totals);
    }

    #[test]
    fn offline_sparse_edit_uses_persisted_defaults() {
        let store = RoiStore::disconnected();
        let mut session = RoiSession::new(&store);
        let sparse = RoiFields {
            labor_impact_hours: Some(10.0),
            ..RoiFields::default()
        };

        assert!(!session.update_fields("Case", sparse));
        let result = session.result_for("Case").expect("result");
        assert_eq!(result.monthly_benefit, 1000.0);
        assert!(!session.update_fields("  ", sparse));
        assert_eq!(session.working_set().len(), 1);
    }

    #[test]
    fn padded_title_is_one_use_case_in_store_and_session() {
        let store = RoiStore::open(&StoreSettings::in_memory()).expect("store");
        let mut session = RoiSession::new(&store);

        assert!(session.update_fields("Case ", benefit_fields(10.0)));
        assert_eq!(store.list_keys(), vec!["Case "]);
        let summary = session.portfolio(Default::default());
        let titles: Vec<&str> = summary.rows.iter().map(|row| row.use_case_title.as_str()).collect();
        assert_eq!(titles, vec!["Case "]);
        assert_eq!(summary.totals.total_annual_benefit, 12000.0);
    }

    #[test]
    fn delete_and_reload() {
        let store = RoiStore::open(&StoreSettings::in_memory()).expect("store");
        assert!(store.save("Kept", &benefit_fields(1.0), None));
        assert!(store.save("Dropped", &benefit_fields(2.0), None));

        let mut session = RoiSession::new(&store);
        assert_eq!(session.reload_from_store(), 2);
        assert_eq!(session.working_set().len(), 2);

        assert!(session.delete("Dropped"));
        assert!(!session.delete("Dropped"));
        assert_eq!(store.list_keys(), vec!["Kept"]);
        assert!(!session.working_set().contains("Dropped"));

        let working = session.into_working_set();
        assert_eq!(working.len(), 1);
    }
}
