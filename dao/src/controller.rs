use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use chrono::{SecondsFormat, Utc};
use futures::future;
use od_config::query::QueryConfig;
use od_error::AccessError;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    capability::{Action, CapabilityEvaluator},
    collection::Collection,
    dto::pagination::Pagination,
    filter::{FilterSpec, FilterTranslator},
    query::{record_id, QueryExecutor, Record, SelectQuery},
    tenant::{TenantContext, TenantPolicy},
};

#[derive(Default)]
struct ControllerState {
    records: Vec<Record>,
    in_flight: usize,
    error: Option<AccessError>,
    total: u64,
    last_filters: Option<FilterSpec>,
    last_pagination: Option<Pagination>,
}

/// Read-only view of a controller's state at one instant.
#[derive(Clone, PartialEq, Debug)]
pub struct ControllerSnapshot {
    records: Vec<Record>,
    loading: bool,
    error: Option<AccessError>,
    total: u64,
}

impl ControllerSnapshot {
    pub fn records(&self) -> &Vec<Record> {
        &self.records
    }

    pub fn loading(&self) -> &bool {
        &self.loading
    }

    pub fn error(&self) -> &Option<AccessError> {
        &self.error
    }

    pub fn total(&self) -> &u64 {
        &self.total
    }
}

/// Marks an operation as in flight until dropped.
struct InFlight<'a> {
    state: &'a Mutex<ControllerState>,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a Mutex<ControllerState>) -> Self {
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight += 1;
        Self { state }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Permission-checked, tenant-scoped CRUD over one collection, keeping the
/// last loaded page in memory.
///
/// No operation returns an error: failures land in [`error`](Self::error)
/// and the operation yields its empty result. While the capability evaluator
/// is still loading, every operation is a silent no-op.
///
/// Bulk operations check the permission once for the whole batch; the store
/// enforces the same capabilities server-side.
pub struct CrudController<E: QueryExecutor, C: CapabilityEvaluator> {
    executor: Arc<E>,
    evaluator: Arc<C>,
    ctx: TenantContext,
    collection: Collection,
    policy: TenantPolicy,
    translator: FilterTranslator,
    config: QueryConfig,
    state: Mutex<ControllerState>,
    generation: AtomicU64,
}

impl<E: QueryExecutor, C: CapabilityEvaluator> CrudController<E, C> {
    pub fn new(
        executor: Arc<E>,
        evaluator: Arc<C>,
        ctx: &TenantContext,
        collection: &Collection,
        config: &QueryConfig,
        policy: &TenantPolicy,
    ) -> Self {
        Self {
            executor,
            evaluator,
            ctx: ctx.clone(),
            collection: *collection,
            policy: policy.clone(),
            translator: FilterTranslator::new(config),
            config: config.clone(),
            state: Mutex::new(ControllerState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Loads one page into `records`. The arguments are remembered for
    /// [`refresh`](Self::refresh) even when the load fails.
    pub async fn list(
        &self,
        filters: Option<FilterSpec>,
        pagination: Option<Pagination>,
    ) -> Option<Vec<Record>> {
        {
            let mut state = self.state();
            state.last_filters = filters.clone();
            state.last_pagination = pagination.clone();
        }
        if !self.permit(&Action::Read) {
            return None;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight::begin(&self.state);

        let query = match self.list_query(filters.as_ref(), pagination.as_ref()) {
            Ok(query) => query,
            Err(err) => {
                self.fail(err);
                return None;
            }
        };
        let result = match *self.config.exact_total() {
            true => future::try_join(
                self.executor.select(&query),
                self.executor.count(&query.without_range()),
            )
            .await
            .map(|(records, total)| (records, Some(total))),
            false => self
                .executor
                .select(&query)
                .await
                .map(|records| (records, None)),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            od_log::debug(
                "controller",
                format!(
                    "Discarding stale {} page from request {generation}",
                    self.collection.to_str()
                ),
            );
            return None;
        }

        match result {
            Ok((records, total)) => {
                let total =
                    total.unwrap_or_else(|| u64::try_from(records.len()).unwrap_or(u64::MAX));
                let mut state = self.state();
                state.records = records.clone();
                state.total = total;
                Some(records)
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    /// Fetches a single record. A record that does not exist, or is outside
    /// the caller's organization, yields `None` without an error.
    pub async fn get_by_id(&self, id: &str) -> Option<Record> {
        if !self.permit(&Action::Read) {
            return None;
        }
        let _in_flight = InFlight::begin(&self.state);

        let scope = match self.policy.read_scope(&self.ctx, &self.collection) {
            Ok(scope) => scope,
            Err(err) => {
                self.fail(err);
                return None;
            }
        };
        let query = SelectQuery::new(&self.collection)
            .filter(scope.predicates(self.policy.organization_field()))
            .eq(self.config.id_field(), Value::String(id.to_owned()))
            .range(0, 0);

        match self.executor.select(&query).await {
            Ok(records) => records.into_iter().next(),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    pub async fn create(&self, data: Record) -> Option<Record> {
        if !self.permit(&Action::Create) {
            return None;
        }
        let created = self.insert(vec![data]).await?;
        self.refresh().await;
        created.into_iter().next()
    }

    /// Inserts every row in one store call, then reloads the current page.
    pub async fn bulk_create(&self, rows: Vec<Record>) -> Option<Vec<Record>> {
        if !self.permit(&Action::Create) {
            return None;
        }
        let created = self.insert(rows).await?;
        self.refresh().await;
        Some(created)
    }

    /// Merges `patch` into the record and swaps the result into `records`.
    /// The id field cannot be patched.
    pub async fn update(&self, id: &str, patch: Record) -> Option<Record> {
        if !self.permit(&Action::Update) {
            return None;
        }
        self.apply_update(id, patch).await
    }

    /// Runs the updates concurrently and returns the ones that succeeded.
    pub async fn bulk_update(&self, items: Vec<(String, Record)>) -> Vec<Record> {
        if !self.permit(&Action::Update) {
            return Vec::new();
        }
        future::join_all(
            items
                .into_iter()
                .map(|(id, patch)| async move { self.apply_update(&id, patch).await }),
        )
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    /// Returns `false` when the store removed nothing; local state is then
    /// left untouched.
    pub async fn remove(&self, id: &str) -> bool {
        if !self.permit(&Action::Delete) {
            return false;
        }
        self.delete(&[id.to_owned()]).await
    }

    pub async fn bulk_remove(&self, ids: Vec<String>) -> bool {
        if !self.permit(&Action::Delete) {
            return false;
        }
        self.delete(&ids).await
    }

    /// Replays the last `list` call.
    pub async fn refresh(&self) -> Option<Vec<Record>> {
        let (filters, pagination) = {
            let state = self.state();
            (state.last_filters.clone(), state.last_pagination.clone())
        };
        self.list(filters, pagination).await
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state();
        ControllerSnapshot {
            records: state.records.clone(),
            loading: state.in_flight > 0,
            error: state.error.clone(),
            total: state.total,
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.state().records.clone()
    }

    pub fn loading(&self) -> bool {
        self.state().in_flight > 0
    }

    pub fn error(&self) -> Option<AccessError> {
        self.state().error.clone()
    }

    pub fn total(&self) -> u64 {
        self.state().total
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn permit(&self, action: &Action) -> bool {
        if !self.evaluator.is_ready() {
            od_log::debug(
                "controller",
                format!(
                    "Capabilities still loading; skipping {} on {}",
                    action.to_str(),
                    self.collection.to_str()
                ),
            );
            return false;
        }
        let subject = self.collection.subject();
        if !self.evaluator.can(*action, subject) {
            let err = AccessError::permission_denied(action.to_str(), subject.to_str());
            od_log::warn("controller", &err);
            self.state().error = Some(err);
            return false;
        }
        self.state().error = None;
        true
    }

    fn fail(&self, err: AccessError) {
        od_log::error(
            "controller",
            format!("{} operation failed: {err}", self.collection.to_str()),
        );
        self.state().error = Some(err);
    }

    fn list_query(
        &self,
        filters: Option<&FilterSpec>,
        pagination: Option<&Pagination>,
    ) -> Result<SelectQuery, AccessError> {
        let scope = self.policy.read_scope(&self.ctx, &self.collection)?;
        let mut query = SelectQuery::new(&self.collection)
            .filter(scope.predicates(self.policy.organization_field()));
        if let Some(filters) = filters {
            query = query.filter(self.translator.translate(filters, &self.collection)?);
        }
        let created_at_field = self.config.created_at_field();
        match pagination {
            Some(pagination) => {
                let (field, ascending) = pagination.sort(created_at_field);
                let (from, to) = pagination.range(&u64::from(*self.config.default_page_size()));
                query = query.order(field, ascending).range(from, to);
            }
            None => query = query.order(created_at_field, false),
        }
        Ok(query)
    }

    async fn insert(&self, rows: Vec<Record>) -> Option<Vec<Record>> {
        let _in_flight = InFlight::begin(&self.state);

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            match self.prepare_insert(row, &now) {
                Ok(row) => prepared.push(row),
                Err(err) => {
                    self.fail(err);
                    return None;
                }
            }
        }

        match self.executor.insert(&self.collection, &prepared).await {
            Ok(created) => Some(created),
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    fn prepare_insert(&self, mut row: Record, now: &str) -> Result<(String, Record), AccessError> {
        row.insert(
            self.config.created_at_field().to_owned(),
            Value::String(now.to_owned()),
        );
        row.insert(
            self.config.updated_at_field().to_owned(),
            Value::String(now.to_owned()),
        );
        self.policy.stamp_create(&self.ctx, &self.collection, &mut row)?;

        // Always text, so id lookups also match numeric ids.
        let id_field = self.config.id_field();
        let id = record_id(&row, id_field)
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        row.insert(id_field.to_owned(), Value::String(id.clone()));
        Ok((id, row))
    }

    async fn apply_update(&self, id: &str, mut patch: Record) -> Option<Record> {
        let _in_flight = InFlight::begin(&self.state);

        patch.remove(self.config.id_field());
        self.policy.guard_patch(&self.ctx, &self.collection, &mut patch);
        patch.insert(
            self.config.updated_at_field().to_owned(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let scope = match self.policy.write_scope(&self.ctx, &self.collection) {
            Ok(scope) => scope,
            Err(err) => {
                self.fail(err);
                return None;
            }
        };
        let updated = self
            .executor
            .update(
                &self.collection,
                id,
                &patch,
                &scope.predicates(self.policy.organization_field()),
            )
            .await;

        match updated.map(|records| records.into_iter().next()) {
            Ok(Some(record)) => {
                let id_field = self.config.id_field();
                let mut state = self.state();
                if let Some(slot) = state
                    .records
                    .iter_mut()
                    .find(|r| record_id(r, id_field).as_deref() == Some(id))
                {
                    *slot = record.clone();
                }
                Some(record)
            }
            Ok(None) => {
                self.fail(AccessError::not_found(self.collection.to_str(), id));
                None
            }
            Err(err) => {
                self.fail(err);
                None
            }
        }
    }

    async fn delete(&self, ids: &[String]) -> bool {
        if ids.is_empty() {
            return false;
        }
        let _in_flight = InFlight::begin(&self.state);

        let scope = match self.policy.write_scope(&self.ctx, &self.collection) {
            Ok(scope) => scope,
            Err(err) => {
                self.fail(err);
                return false;
            }
        };
        let deleted = match self
            .executor
            .delete(
                &self.collection,
                ids,
                &scope.predicates(self.policy.organization_field()),
            )
            .await
        {
            Ok(deleted) => deleted,
            Err(err) => {
                self.fail(err);
                return false;
            }
        };
        if deleted.is_empty() {
            od_log::debug(
                "controller",
                format!(
                    "Nothing removed from {} for {ids:?}",
                    self.collection.to_str()
                ),
            );
            return false;
        }

        let id_field = self.config.id_field();
        let mut state = self.state();
        state
            .records
            .retain(|r| !record_id(r, id_field).is_some_and(|id| deleted.contains(&id)));
        state.total = state
            .total
            .saturating_sub(u64::try_from(deleted.len()).unwrap_or(u64::MAX));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicBool, AtomicUsize},
        time::Duration,
    };

    use async_trait::async_trait;
    use od_db_sqlite::db::SqliteDb;
    use serde_json::json;

    use super::*;
    use crate::{
        capability::{AbilityRules, CapabilityRule},
        collection::SubjectType,
        dto::pagination::SortOrder,
        filter::Predicate,
        tenant::UserSegment,
        Db,
    };

    /// Memory store that counts mutating calls and can be told to fail or
    /// to stall individual selects.
    struct RecordingExecutor {
        db: Db,
        mutations: AtomicUsize,
        failing: AtomicBool,
        select_delays: Mutex<VecDeque<Duration>>,
    }

    impl RecordingExecutor {
        async fn new() -> Arc<Self> {
            let db = Db::SqliteDb(SqliteDb::new("sqlite::memory:", &1).await.unwrap());
            db.init().await.unwrap();
            Arc::new(Self {
                db,
                mutations: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                select_delays: Mutex::new(VecDeque::new()),
            })
        }

        async fn seed(&self, collection: &Collection, records: Vec<Value>) {
            let rows = records
                .into_iter()
                .map(|value| {
                    let record = value.as_object().cloned().unwrap();
                    (record_id(&record, "id").unwrap(), record)
                })
                .collect::<Vec<_>>();
            self.db.insert(collection, &rows).await.unwrap();
        }

        async fn stored(&self, collection: &Collection, id: &str) -> Option<Record> {
            let query = SelectQuery::new(collection).eq("id", json!(id));
            self.db.select(&query).await.unwrap().into_iter().next()
        }

        fn mutations(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn stall_next_select(&self, delay: Duration) {
            self.select_delays.lock().unwrap().push_back(delay);
        }

        fn check(&self) -> Result<(), AccessError> {
            match self.failing.load(Ordering::SeqCst) {
                true => Err(AccessError::Transport("connection reset".to_owned())),
                false => Ok(()),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for RecordingExecutor {
        async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, AccessError> {
            let delay = self.select_delays.lock().unwrap().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.check()?;
            self.db.select(query).await
        }

        async fn count(&self, query: &SelectQuery) -> Result<u64, AccessError> {
            self.check()?;
            self.db.count(query).await
        }

        async fn insert(
            &self,
            collection: &Collection,
            rows: &[(String, Record)],
        ) -> Result<Vec<Record>, AccessError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.db.insert(collection, rows).await
        }

        async fn update(
            &self,
            collection: &Collection,
            id: &str,
            patch: &Record,
            scope: &[Predicate],
        ) -> Result<Vec<Record>, AccessError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.db.update(collection, id, patch, scope).await
        }

        async fn delete(
            &self,
            collection: &Collection,
            ids: &[String],
            scope: &[Predicate],
        ) -> Result<Vec<String>, AccessError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.db.delete(collection, ids, scope).await
        }
    }

    type Controller = CrudController<RecordingExecutor, AbilityRules>;

    const EVERYTHING: [Action; 4] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
    ];

    fn rules(actions: &[Action]) -> Arc<AbilityRules> {
        Arc::new(AbilityRules::new(vec![CapabilityRule::new(
            &SubjectType::All,
            actions,
        )]))
    }

    fn partner(org: Option<&str>) -> TenantContext {
        TenantContext::new(
            &org.map(str::to_owned),
            &Some("user-7".to_owned()),
            &UserSegment::External("partner".to_owned()),
        )
    }

    fn staff() -> TenantContext {
        TenantContext::new(&None, &Some("staff-1".to_owned()), &UserSegment::Internal)
    }

    fn controller(
        executor: &Arc<RecordingExecutor>,
        evaluator: Arc<AbilityRules>,
        ctx: TenantContext,
        collection: Collection,
        config: &QueryConfig,
    ) -> Controller {
        let policy = TenantPolicy::new(&od_config::tenant::TenantConfig::default());
        CrudController::new(
            executor.clone(),
            evaluator,
            &ctx,
            &collection,
            config,
            &policy,
        )
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| record_id(r, "id").unwrap())
            .collect()
    }

    async fn seeded_content(executor: &RecordingExecutor) {
        executor
            .seed(
                &Collection::Content,
                vec![
                    json!({"id": "c1", "title": "Spring fair", "status": "Published", "organization_id": "org1", "created_at": "2024-01-01T00:00:01.000Z"}),
                    json!({"id": "c2", "title": "Harbour walk", "status": "Draft", "organization_id": "org1", "created_at": "2024-01-01T00:00:02.000Z"}),
                    json!({"id": "c3", "title": "Night market", "status": "Published", "organization_id": "org2", "created_at": "2024-01-01T00:00:03.000Z"}),
                ],
            )
            .await;
    }

    #[tokio::test]
    async fn external_callers_only_see_their_organization() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::Content,
            &QueryConfig::default(),
        );

        let records = controller.list(None, None).await.unwrap();
        assert_eq!(ids(&records), vec!["c2", "c1"]);
        assert!(records.iter().all(|r| r["organization_id"] == "org1"));
        assert_eq!(controller.total(), 2);

        assert!(controller.get_by_id("c3").await.is_none());
        assert!(controller.error().is_none());
        assert_eq!(
            controller.get_by_id("c1").await.unwrap()["title"],
            json!("Spring fair")
        );
    }

    #[tokio::test]
    async fn internal_callers_see_every_organization() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Content,
            &QueryConfig::default(),
        );

        let records = controller.list(None, None).await.unwrap();
        assert_eq!(ids(&records), vec!["c3", "c2", "c1"]);
        assert!(controller.get_by_id("c3").await.is_some());
    }

    #[tokio::test]
    async fn filters_are_applied_inside_the_tenant_scope() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::Content,
            &QueryConfig::default(),
        );

        let filters = FilterSpec::new()
            .with("status", json!("Published"))
            .with("search", json!("FAIR"));
        let records = controller.list(Some(filters), None).await.unwrap();
        assert_eq!(ids(&records), vec!["c1"]);

        let bad = FilterSpec::new()
            .with("title", json!({"operator": "between", "value": 1}));
        assert!(controller.list(Some(bad), None).await.is_none());
        assert!(matches!(controller.error(), Some(AccessError::InvalidFilter(_))));
        assert_eq!(ids(&controller.records()), vec!["c1"]);
    }

    #[tokio::test]
    async fn denied_actions_never_reach_the_store() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&[Action::Read]),
            staff(),
            Collection::Content,
            &QueryConfig::default(),
        );

        assert!(controller
            .create(record(json!({"title": "x"})))
            .await
            .is_none());
        assert_eq!(
            controller.error(),
            Some(AccessError::permission_denied("create", "Content"))
        );
        assert!(controller
            .update("c1", record(json!({"title": "x"})))
            .await
            .is_none());
        assert_eq!(
            controller.error(),
            Some(AccessError::permission_denied("update", "Content"))
        );
        assert!(!controller.remove("c1").await);
        assert!(controller.error().unwrap().is_permission_denied());
        assert!(controller
            .bulk_create(vec![record(json!({"title": "y"}))])
            .await
            .is_none());
        assert!(controller
            .bulk_update(vec![("c1".to_owned(), record(json!({"title": "y"})))])
            .await
            .is_empty());
        assert!(!controller.bulk_remove(vec!["c1".to_owned()]).await);

        assert_eq!(executor.mutations(), 0);

        assert!(controller.list(None, None).await.is_some());
        assert!(controller.error().is_none());
    }

    #[tokio::test]
    async fn repeated_updates_leave_a_single_entry() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::Content,
            &QueryConfig::default(),
        );
        controller.list(None, None).await.unwrap();

        let patch = record(json!({"title": "Autumn fair", "id": "hijack"}));
        controller.update("c1", patch.clone()).await.unwrap();
        let updated = controller.update("c1", patch).await.unwrap();
        assert_eq!(updated["id"], json!("c1"));

        let records = controller.records();
        let matching = records
            .iter()
            .filter(|r| r["id"] == json!("c1"))
            .collect::<Vec<_>>();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0]["title"], json!("Autumn fair"));
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn updates_outside_the_organization_are_not_found() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::Content,
            &QueryConfig::default(),
        );

        let patch = record(json!({"title": "Taken over", "organization_id": "org1"}));
        assert!(controller.update("c3", patch).await.is_none());
        assert_eq!(
            controller.error(),
            Some(AccessError::not_found("content", "c3"))
        );
        let stored = executor.stored(&Collection::Content, "c3").await.unwrap();
        assert_eq!(stored["title"], json!("Night market"));
        assert_eq!(stored["organization_id"], json!("org2"));
    }

    #[tokio::test]
    async fn total_never_goes_negative() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::Content,
            &QueryConfig::default(),
        );
        controller.list(None, None).await.unwrap();

        assert!(controller.remove("c1").await);
        assert!(controller.remove("c2").await);
        assert!(!controller.remove("c1").await);
        assert!(!controller.remove("c3").await);
        assert_eq!(controller.total(), 0);
        assert!(controller.records().is_empty());
        assert!(executor.stored(&Collection::Content, "c3").await.is_some());
    }

    async fn twenty_five_services(executor: &RecordingExecutor) {
        executor
            .seed(
                &Collection::Services,
                (1..=25)
                    .map(|i| {
                        json!({
                            "id": format!("s{i:02}"),
                            "name": format!("Service {i:02}"),
                            "created_at": format!("2024-03-01T00:00:{i:02}.000Z"),
                        })
                    })
                    .collect(),
            )
            .await;
    }

    #[tokio::test]
    async fn second_page_reports_the_exact_total() {
        let executor = RecordingExecutor::new().await;
        twenty_five_services(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Services,
            &QueryConfig::default(),
        );

        let page = Pagination::new(
            &2,
            &10,
            &Some("created_at".to_owned()),
            &Some(SortOrder::Asc),
        );
        let records = controller.list(None, Some(page)).await.unwrap();

        let expected = (11..=20).map(|i| format!("s{i:02}")).collect::<Vec<_>>();
        assert_eq!(ids(&records), expected);
        assert_eq!(controller.total(), 25);
    }

    #[tokio::test]
    async fn second_page_reports_the_page_length_without_exact_totals() {
        let executor = RecordingExecutor::new().await;
        twenty_five_services(&executor).await;
        let mut config = QueryConfig::default();
        config.set_exact_total(&false);
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Services,
            &config,
        );

        let page = Pagination::new(
            &2,
            &10,
            &Some("created_at".to_owned()),
            &Some(SortOrder::Asc),
        );
        let records = controller.list(None, Some(page)).await.unwrap();

        assert_eq!(records.len(), 10);
        assert_eq!(records[0]["id"], json!("s11"));
        assert_eq!(controller.total(), 10);
    }

    #[tokio::test]
    async fn create_stamps_tenant_and_timestamps() {
        let executor = RecordingExecutor::new().await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::BusinessDirectory,
            &QueryConfig::default(),
        );

        let created = controller
            .create(record(json!({"name": "Acme"})))
            .await
            .unwrap();
        let id = record_id(&created, "id").unwrap();
        let stored = executor
            .stored(&Collection::BusinessDirectory, &id)
            .await
            .unwrap();

        assert_eq!(stored["name"], json!("Acme"));
        assert_eq!(stored["organization_id"], json!("org1"));
        assert_eq!(stored["created_by"], json!("user-7"));
        assert!(stored["created_at"].is_string());
        assert_eq!(stored["created_at"], stored["updated_at"]);

        assert_eq!(ids(&controller.records()), vec![id]);
        assert_eq!(controller.total(), 1);
    }

    #[tokio::test]
    async fn numeric_ids_are_found_by_their_text_form() {
        let executor = RecordingExecutor::new().await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Zones,
            &QueryConfig::default(),
        );

        let created = controller
            .create(record(json!({"id": 12, "name": "North"})))
            .await
            .unwrap();
        assert_eq!(created["id"], json!("12"));

        let found = controller.get_by_id("12").await.unwrap();
        assert_eq!(found["name"], json!("North"));
        assert!(controller.error().is_none());
        assert!(controller.remove("12").await);
        assert!(controller.records().is_empty());
    }

    #[tokio::test]
    async fn refresh_replays_the_remembered_filter_and_page() {
        let executor = RecordingExecutor::new().await;
        executor
            .seed(
                &Collection::Services,
                (1..=12)
                    .map(|i| {
                        let status = if i % 2 == 0 { "Active" } else { "Archived" };
                        json!({
                            "id": format!("s{i:02}"),
                            "status": status,
                            "created_at": format!("2024-03-01T00:00:{i:02}.000Z"),
                        })
                    })
                    .collect(),
            )
            .await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Services,
            &QueryConfig::default(),
        );

        let active = FilterSpec::new().with("status", json!("Active"));
        let page = Pagination::new(
            &2,
            &2,
            &Some("created_at".to_owned()),
            &Some(SortOrder::Asc),
        );
        let records = controller.list(Some(active), Some(page)).await.unwrap();
        assert_eq!(ids(&records), vec!["s06", "s08"]);
        assert_eq!(controller.total(), 6);

        executor
            .seed(
                &Collection::Services,
                vec![
                    json!({
                        "id": "s00",
                        "status": "Active",
                        "created_at": "2024-03-01T00:00:00.000Z",
                    }),
                    json!({
                        "id": "s13",
                        "status": "Archived",
                        "created_at": "2024-03-01T00:00:13.000Z",
                    }),
                ],
            )
            .await;

        let refreshed = controller.refresh().await.unwrap();
        assert_eq!(ids(&refreshed), vec!["s04", "s06"]);
        assert_eq!(ids(&controller.records()), vec!["s04", "s06"]);
        assert_eq!(controller.total(), 7);
    }

    #[tokio::test]
    async fn removing_a_missing_id_changes_nothing() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Content,
            &QueryConfig::default(),
        );
        controller.list(None, None).await.unwrap();
        let before = controller.snapshot();

        assert!(!controller.remove("missing-id").await);

        let after = controller.snapshot();
        assert_eq!(after.records(), before.records());
        assert_eq!(after.total(), &3);
        assert!(after.error().is_none());
        assert!(!after.loading());
    }

    #[tokio::test]
    async fn failures_keep_previously_loaded_records() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Content,
            &QueryConfig::default(),
        );
        controller.list(None, None).await.unwrap();

        executor.set_failing(true);
        assert!(controller.list(None, None).await.is_none());
        assert!(controller
            .update("c1", record(json!({"title": "x"})))
            .await
            .is_none());
        assert!(!controller.remove("c1").await);

        let snapshot = controller.snapshot();
        assert_eq!(ids(snapshot.records()), vec!["c3", "c2", "c1"]);
        assert_eq!(snapshot.total(), &3);
        assert!(matches!(snapshot.error(), Some(AccessError::Transport(_))));
        assert!(!snapshot.loading());
    }

    #[tokio::test]
    async fn loading_capabilities_abort_silently() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let evaluator = Arc::new(AbilityRules::loading());
        let controller = controller(
            &executor,
            evaluator.clone(),
            staff(),
            Collection::Content,
            &QueryConfig::default(),
        );

        assert!(controller.list(None, None).await.is_none());
        assert!(controller
            .create(record(json!({"title": "x"})))
            .await
            .is_none());
        assert!(!controller.remove("c1").await);
        assert!(controller.error().is_none());
        assert_eq!(executor.mutations(), 0);

        evaluator.load(vec![CapabilityRule::new(
            &SubjectType::Content,
            &[Action::Read],
        )]);
        assert_eq!(controller.refresh().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn strict_tenancy_refuses_callers_without_organization() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(None),
            Collection::Content,
            &QueryConfig::default(),
        );

        assert!(controller.list(None, None).await.is_none());
        assert_eq!(
            controller.error(),
            Some(AccessError::tenant_unresolved("content"))
        );
        assert!(controller
            .create(record(json!({"title": "x"})))
            .await
            .is_none());
        assert_eq!(executor.mutations(), 0);
    }

    #[tokio::test]
    async fn stale_list_responses_are_discarded() {
        let executor = RecordingExecutor::new().await;
        seeded_content(&executor).await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            staff(),
            Collection::Content,
            &QueryConfig::default(),
        );

        executor.stall_next_select(Duration::from_millis(50));
        let drafts = FilterSpec::new().with("status", json!("Draft"));
        let published = FilterSpec::new().with("status", json!("Published"));
        let (slow, fast) = tokio::join!(
            controller.list(Some(drafts), None),
            controller.list(Some(published), None)
        );

        assert!(slow.is_none());
        assert_eq!(ids(&fast.unwrap()), vec!["c3", "c1"]);
        assert_eq!(ids(&controller.records()), vec!["c3", "c1"]);
        assert_eq!(controller.total(), 2);
    }

    #[tokio::test]
    async fn bulk_operations_compose_single_item_semantics() {
        let executor = RecordingExecutor::new().await;
        let controller = controller(
            &executor,
            rules(&EVERYTHING),
            partner(Some("org1")),
            Collection::GrowthAreas,
            &QueryConfig::default(),
        );

        let created = controller
            .bulk_create(vec![
                record(json!({"id": "g1", "name": "Tourism"})),
                record(json!({"id": "g2", "name": "Fishing"})),
                record(json!({"id": "g3", "name": "Forestry"})),
            ])
            .await
            .unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(executor.mutations(), 1);
        assert_eq!(controller.total(), 3);

        let updated = controller
            .bulk_update(vec![
                ("g1".to_owned(), record(json!({"name": "Eco tourism"}))),
                ("missing".to_owned(), record(json!({"name": "Nothing"}))),
            ])
            .await;
        assert_eq!(ids(&updated), vec!["g1"]);

        assert!(controller
            .bulk_remove(vec!["g2".to_owned(), "g3".to_owned()])
            .await);
        assert_eq!(ids(&controller.records()), vec!["g1"]);
        assert_eq!(controller.records()[0]["name"], json!("Eco tourism"));
        assert_eq!(controller.total(), 1);
    }
}
