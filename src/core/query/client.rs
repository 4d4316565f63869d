//! The generic query and mutation facility.
//!
//! [`QueryClient`] owns the backend, the result cache and the session. Every
//! read goes through [`QueryClient::query`] or [`QueryClient::call`]; every
//! write goes through [`QueryClient::mutate`], which drops the cache entries
//! the caller declares as affected.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::filter::{validate_column, validate_projection, Filter, Match, Order};
use super::key::{Collection, Invalidation, QueryKey};
use super::state::QueryState;
use crate::core::infrastructure::cache::{CacheStats, QueryCache};
use crate::core::infrastructure::session::Session;
use crate::core::services::backend::{Backend, Row, SelectRequest};
use crate::error::{HerdbookError, Result};

/// A read against one collection, bound to one cache key.
#[derive(Debug, Clone)]
pub struct Query {
    pub key: QueryKey,
    pub select: String,
    pub matches: Match,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub single: bool,
    pub enabled: bool,
}

impl Query {
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            select: "*".to_string(),
            matches: Match::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            single: false,
            enabled: true,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.matches.insert(column, value);
        self
    }

    /// Equality only when a value is present.
    pub fn eq_opt(self, column: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.eq(column, value),
            None => self,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_projection(&self.select)?;
        for (column, _) in self.matches.iter() {
            validate_column(column)?;
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        if let Some(order) = &self.order {
            validate_column(&order.column)?;
        }
        Ok(())
    }

    /// Match-set equalities first, then the caller's filters in order.
    pub fn to_select(&self) -> SelectRequest {
        let mut filters = self.matches.to_filters();
        filters.extend(self.filters.iter().cloned());
        SelectRequest {
            collection: self.key.collection,
            columns: self.select.clone(),
            filters,
            order: self.order.clone(),
            limit: self.limit,
            single: self.single,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Mutation {
    Insert(Vec<Row>),
    Update { patch: Row, matcher: Match },
    Delete { matcher: Match },
}

impl Mutation {
    fn operation(&self) -> &'static str {
        match self {
            Mutation::Insert(_) => "insert",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub collection: Collection,
    pub mutation: Mutation,
    pub invalidates: Vec<Invalidation>,
}

impl MutationRequest {
    pub fn new(collection: Collection, mutation: Mutation) -> Self {
        Self {
            collection,
            mutation,
            invalidates: Vec::new(),
        }
    }

    pub fn invalidate(mut self, target: Invalidation) -> Self {
        self.invalidates.push(target);
        self
    }

    /// Checks that must pass before anything is sent.
    pub fn validate(&self) -> Result<()> {
        let unbounded = || HerdbookError::UnboundedMutation {
            collection: self.collection.to_string(),
            operation: self.mutation.operation(),
        };
        match &self.mutation {
            Mutation::Insert(rows) => {
                if rows.is_empty() {
                    return Err(HerdbookError::Validation(format!(
                        "Nothing to insert into {}",
                        self.collection
                    )));
                }
                for row in rows {
                    row.keys().try_for_each(|column| validate_column(column))?;
                }
            }
            Mutation::Update { patch, matcher } => {
                if matcher.is_empty() {
                    return Err(unbounded());
                }
                if patch.is_empty() {
                    return Err(HerdbookError::Validation(format!(
                        "Empty update for {}",
                        self.collection
                    )));
                }
                patch.keys().try_for_each(|column| validate_column(column))?;
                matcher.iter().try_for_each(|(column, _)| validate_column(column))?;
            }
            Mutation::Delete { matcher } => {
                if matcher.is_empty() {
                    return Err(unbounded());
                }
                matcher.iter().try_for_each(|(column, _)| validate_column(column))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct InFlight {
    gate: Arc<tokio::sync::Mutex<()>>,
    waiters: usize,
    loading: bool,
    invalidated: bool,
}

struct Inner {
    backend: Arc<dyn Backend>,
    cache: Mutex<QueryCache>,
    in_flight: Mutex<HashMap<QueryKey, InFlight>>,
    session: RwLock<Session>,
}

/// Shared handle to the data-access layer. Clones share one cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

/// Keeps a key's in-flight entry alive; the last one out removes it.
struct Registration<'a> {
    inner: &'a Inner,
    key: &'a QueryKey,
    fetching: bool,
}

impl Registration<'_> {
    fn start_fetch(&mut self) {
        self.fetching = true;
        if let Some(entry) = lock(&self.inner.in_flight).get_mut(self.key) {
            entry.loading = true;
            entry.invalidated = false;
        }
    }

    /// True when an invalidation hit this key after the fetch started.
    fn invalidated(&self) -> bool {
        lock(&self.inner.in_flight)
            .get(self.key)
            .map_or(false, |entry| entry.invalidated)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.inner.in_flight);
        let remove = match in_flight.get_mut(self.key) {
            Some(entry) => {
                if self.fetching {
                    entry.loading = false;
                }
                entry.waiters = entry.waiters.saturating_sub(1);
                entry.waiters == 0
            }
            None => false,
        };
        if remove {
            in_flight.remove(self.key);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QueryClient {
    pub fn new(backend: Arc<dyn Backend>, cache: QueryCache, session: Session) -> Self {
        info!("Query client using {} backend", backend.name());
        Self {
            inner: Arc::new(Inner {
                backend,
                cache: Mutex::new(cache),
                in_flight: Mutex::new(HashMap::new()),
                session: RwLock::new(session),
            }),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    pub fn session(&self) -> Session {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap the identity. Cached results belong to the old identity and go.
    pub fn set_session(&self, session: Session) {
        *self.inner.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        lock(&self.inner.cache).clear();
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .session
            .read()
            .map(|session| session.is_authenticated())
            .unwrap_or(false)
    }

    pub fn user_id(&self) -> Option<String> {
        self.session().user_id().map(str::to_string)
    }

    /// Run a read, sharing the cached result and any in-flight fetch for its key.
    pub async fn query<T: DeserializeOwned>(&self, query: &Query, cancel: &CancellationToken) -> QueryState<T> {
        if !query.enabled {
            debug!("Query {} disabled", query.key);
            return QueryState::NotStarted;
        }
        if !self.is_authenticated() {
            debug!("Query {} skipped: no identity", query.key);
            return QueryState::NotStarted;
        }
        if let Err(e) = query.validate() {
            return QueryState::Failed(e);
        }

        let request = query.to_select();
        let backend = Arc::clone(&self.inner.backend);
        let fetched = self
            .fetch_shared(&query.key, cancel, async move { backend.select(&request).await })
            .await;

        QueryState::from(fetched.and_then(decode::<T>))
    }

    /// Invoke a backend procedure with the same caching rules as [`query`](Self::query).
    pub async fn call<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        procedure: &str,
        params: Value,
        enabled: bool,
        cancel: &CancellationToken,
    ) -> QueryState<T> {
        if !enabled || !self.is_authenticated() {
            debug!("Procedure {} for {} not started", procedure, key);
            return QueryState::NotStarted;
        }

        let backend = Arc::clone(&self.inner.backend);
        let procedure = procedure.to_string();
        let caller = self.user_id();
        let fetched = self
            .fetch_shared(key, cancel, async move {
                backend.call(&procedure, params, caller.as_deref()).await
            })
            .await;

        QueryState::from(fetched.and_then(decode::<T>))
    }

    async fn fetch_shared<F>(&self, key: &QueryKey, cancel: &CancellationToken, fetch: F) -> Result<Value>
    where
        F: Future<Output = Result<Value>>,
    {
        if let Some(data) = lock(&self.inner.cache).get(key) {
            return Ok(data);
        }

        let gate = {
            let mut in_flight = lock(&self.inner.in_flight);
            let entry = in_flight.entry(key.clone()).or_insert_with(|| InFlight {
                gate: Arc::new(tokio::sync::Mutex::new(())),
                waiters: 0,
                loading: false,
                invalidated: false,
            });
            entry.waiters += 1;
            Arc::clone(&entry.gate)
        };
        let mut registration = Registration {
            inner: &self.inner,
            key,
            fetching: false,
        };

        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HerdbookError::Cancelled),
            guard = gate.lock_owned() => guard,
        };

        // Another caller may have filled the entry while this one waited.
        {
            let mut cache = lock(&self.inner.cache);
            if let Some(data) = cache.peek(key).cloned() {
                cache.record_hit();
                debug!("Shared in-flight result for {}", key);
                return Ok(data);
            }
        }

        registration.start_fetch();
        debug!("Fetching {} from {}", key, self.inner.backend.name());
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HerdbookError::Cancelled),
            result = fetch => result,
        };

        match &result {
            Ok(data) => {
                let stale = registration.invalidated();
                if stale {
                    debug!("{} was invalidated mid-fetch; storing as stale", key);
                }
                lock(&self.inner.cache).put(key.clone(), data.clone(), stale);
            }
            Err(HerdbookError::Cancelled) => debug!("Fetch of {} cancelled", key),
            Err(e) => warn!("Fetch of {} failed: {}", key, e),
        }
        result
    }

    /// Dispatch a write and invalidate its declared targets.
    ///
    /// Invalidation also runs when the caller cancels, since the backend may
    /// already have committed the write.
    pub async fn mutate(&self, request: MutationRequest, cancel: &CancellationToken) -> Result<Vec<Row>> {
        if !self.is_authenticated() {
            return Err(HerdbookError::NotAuthenticated);
        }
        request.validate()?;

        let MutationRequest {
            collection,
            mutation,
            invalidates,
        } = request;
        let operation = mutation.operation();
        let backend = Arc::clone(&self.inner.backend);
        let dispatch = async move {
            match mutation {
                Mutation::Insert(rows) => backend.insert(collection, rows).await,
                Mutation::Update { patch, matcher } => backend.update(collection, patch, &matcher).await,
                Mutation::Delete { matcher } => backend.delete(collection, &matcher).await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HerdbookError::Cancelled),
            outcome = dispatch => outcome,
        };

        match &outcome {
            Ok(rows) => {
                debug!("{} on {} affected {} rows", operation, collection, rows.len());
                self.invalidate_all(&invalidates);
            }
            Err(HerdbookError::Cancelled) => {
                warn!("{} on {} cancelled; invalidating anyway", operation, collection);
                self.invalidate_all(&invalidates);
            }
            Err(e) => warn!("{} on {} failed: {}", operation, collection, e),
        }
        outcome
    }

    fn invalidate_all(&self, targets: &[Invalidation]) {
        for target in targets {
            self.invalidate(target);
        }
    }

    /// Drop matching cache entries and mark matching in-flight fetches stale.
    pub fn invalidate(&self, target: &Invalidation) -> usize {
        for (key, entry) in lock(&self.inner.in_flight).iter_mut() {
            if target.matches(key) {
                entry.invalidated = true;
            }
        }
        lock(&self.inner.cache).invalidate(target)
    }

    /// The state of a key without issuing a request.
    pub fn status(&self, key: &QueryKey) -> QueryState<Value> {
        let loading = lock(&self.inner.in_flight)
            .get(key)
            .map_or(false, |entry| entry.loading);
        if loading {
            return QueryState::Loading;
        }
        match lock(&self.inner.cache).peek(key) {
            Some(data) => QueryState::Ready(data.clone()),
            None => QueryState::NotStarted,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.inner.cache).stats()
    }

    pub fn clear_cache(&self) {
        lock(&self.inner.cache).clear();
    }

    pub fn cleanup_cache(&self) {
        lock(&self.inner.cache).cleanup_old_entries();
    }

    pub fn save_cache(&self, index_path: &Path) -> Result<()> {
        let owner = self.user_id();
        lock(&self.inner.cache).save_index(index_path, owner.as_deref())
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T> {
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::key::Scope;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Counts calls and can hold a select until released.
    #[derive(Default)]
    struct CountingBackend {
        selects: AtomicUsize,
        writes: AtomicUsize,
        hold: Option<Arc<Notify>>,
        rows: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Backend for CountingBackend {
        async fn select(&self, request: &SelectRequest) -> Result<Value> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            let rows = lock(&self.rows).clone();
            if request.single {
                return rows.into_iter().next().ok_or(HerdbookError::NotFound {
                    collection: request.collection.to_string(),
                });
            }
            Ok(Value::Array(rows))
        }

        async fn insert(&self, _collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            lock(&self.rows).extend(rows.iter().cloned().map(Value::Object));
            Ok(rows)
        }

        async fn update(&self, _collection: Collection, patch: Row, _matcher: &Match) -> Result<Vec<Row>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(vec![patch])
        }

        async fn delete(&self, _collection: Collection, _matcher: &Match) -> Result<Vec<Row>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn call(&self, _procedure: &str, _params: Value, _caller: Option<&str>) -> Result<Value> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            Ok(json!([]))
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn client_with(backend: Arc<CountingBackend>) -> QueryClient {
        QueryClient::new(
            backend,
            QueryCache::new(Duration::from_secs(300), 100),
            Session::local("user-1"),
        )
    }

    fn tasks_query(farm: &str) -> Query {
        Query::new(QueryKey::new(
            Collection::Tasks,
            Scope::FarmAnimal { farm_id: Some(farm.to_string()), animal_id: None },
        ))
        .eq("farm_id", farm)
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[tokio::test]
    async fn test_identical_keys_share_cached_result() {
        let backend = Arc::new(CountingBackend::default());
        let client = client_with(Arc::clone(&backend));
        let cancel = CancellationToken::new();

        let first: QueryState<Vec<Value>> = client.query(&tasks_query("F1"), &cancel).await;
        let second: QueryState<Vec<Value>> = client.clone().query(&tasks_query("F1"), &cancel).await;
        assert!(first.is_ready());
        assert!(second.is_ready());
        assert_eq!(backend.selects.load(Ordering::SeqCst), 1);

        let _: QueryState<Vec<Value>> = client.query(&tasks_query("F2"), &cancel).await;
        assert_eq!(backend.selects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_queries_fetch_once() {
        let hold = Arc::new(Notify::new());
        let backend = Arc::new(CountingBackend {
            hold: Some(Arc::clone(&hold)),
            ..Default::default()
        });
        let client = client_with(Arc::clone(&backend));
        let cancel = CancellationToken::new();
        let query = tasks_query("F1");

        let releaser = async {
            while backend.selects.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            assert!(client.status(&query.key).is_loading());
            hold.notify_one();
        };
        let (a, b, _) = tokio::join!(
            client.query::<Vec<Value>>(&query, &cancel),
            client.query::<Vec<Value>>(&query, &cancel),
            releaser
        );

        assert!(a.is_ready());
        assert!(b.is_ready());
        assert_eq!(backend.selects.load(Ordering::SeqCst), 1);
        assert!(client.status(&query.key).is_ready());
    }

    #[tokio::test]
    async fn test_disabled_query_issues_no_request() {
        let backend = Arc::new(CountingBackend::default());
        let client = client_with(Arc::clone(&backend));

        let state: QueryState<Vec<Value>> = client
            .query(&tasks_query("F1").enabled(false), &CancellationToken::new())
            .await;
        assert!(state.is_not_started());
        assert_eq!(backend.selects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_identity_means_not_started() {
        let backend = Arc::new(CountingBackend::default());
        let client = QueryClient::new(
            backend.clone(),
            QueryCache::new(Duration::from_secs(300), 100),
            Session::anonymous(),
        );
        let cancel = CancellationToken::new();

        let state: QueryState<Vec<Value>> = client.query(&tasks_query("F1"), &cancel).await;
        assert!(state.is_not_started());

        let insert = MutationRequest::new(Collection::Tasks, Mutation::Insert(vec![row(json!({"title": "x"}))]));
        assert!(matches!(client.mutate(insert, &cancel).await, Err(HerdbookError::NotAuthenticated)));
        assert_eq!(backend.selects.load(Ordering::SeqCst), 0);
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unbounded_mutations_rejected_before_dispatch() {
        let backend = Arc::new(CountingBackend::default());
        let client = client_with(Arc::clone(&backend));
        let cancel = CancellationToken::new();

        let update = MutationRequest::new(
            Collection::Animals,
            Mutation::Update { patch: row(json!({"status": "Sold"})), matcher: Match::new() },
        );
        let delete = MutationRequest::new(Collection::Animals, Mutation::Delete { matcher: Match::new() });

        assert!(matches!(
            client.mutate(update, &cancel).await,
            Err(HerdbookError::UnboundedMutation { operation: "update", .. })
        ));
        assert!(matches!(
            client.mutate(delete, &cancel).await,
            Err(HerdbookError::UnboundedMutation { operation: "delete", .. })
        ));
        assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mutation_invalidation_forces_refetch() {
        let backend = Arc::new(CountingBackend::default());
        let client = client_with(Arc::clone(&backend));
        let cancel = CancellationToken::new();
        let query = tasks_query("F1");

        let before: Vec<Value> = client.query(&query, &cancel).await.into_data_or_default().unwrap();
        assert!(before.is_empty());

        let insert = MutationRequest::new(
            Collection::Tasks,
            Mutation::Insert(vec![row(json!({"farm_id": "F1", "title": "Fix fence"}))]),
        )
        .invalidate(Invalidation::Key(query.key.clone()));
        client.mutate(insert, &cancel).await.unwrap();
        assert!(client.status(&query.key).is_not_started());

        let after: Vec<Value> = client.query(&query, &cancel).await.into_data_or_default().unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(backend.selects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_query_caches_nothing() {
        let hold = Arc::new(Notify::new());
        let backend = Arc::new(CountingBackend {
            hold: Some(hold),
            ..Default::default()
        });
        let client = client_with(Arc::clone(&backend));
        let cancel = CancellationToken::new();
        let query = tasks_query("F1");

        let canceller = async {
            while backend.selects.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            cancel.cancel();
        };
        let (state, _) = tokio::join!(client.query::<Vec<Value>>(&query, &cancel), canceller);

        assert!(matches!(state, QueryState::Failed(HerdbookError::Cancelled)));
        assert!(client.status(&query.key).is_not_started());
        assert_eq!(client.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_stores_stale() {
        let hold = Arc::new(Notify::new());
        let backend = Arc::new(CountingBackend {
            hold: Some(Arc::clone(&hold)),
            ..Default::default()
        });
        let client = client_with(Arc::clone(&backend));
        let cancel = CancellationToken::new();
        let query = tasks_query("F1");

        let invalidator = async {
            while backend.selects.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            client.invalidate(&Invalidation::Collection(Collection::Tasks));
            hold.notify_one();
        };
        let (state, _) = tokio::join!(client.query::<Vec<Value>>(&query, &cancel), invalidator);

        assert!(state.is_ready());
        assert!(client.status(&query.key).is_not_started());
    }

    #[tokio::test]
    async fn test_single_not_found_surfaces_error() {
        let backend = Arc::new(CountingBackend::default());
        let client = client_with(backend);
        let query = Query::new(QueryKey::record(Collection::Farms, "missing")).eq("id", "missing").single();

        let state: QueryState<Value> = client.query(&query, &CancellationToken::new()).await;
        assert!(state.error().map_or(false, HerdbookError::is_not_found));
    }

    #[test]
    fn test_query_rejects_injected_columns() {
        let query = tasks_query("F1").eq("farm_id = 1 OR 1", "x");
        assert!(query.validate().is_err());
        let ordered = tasks_query("F1").order(Order::asc("due_date; --"));
        assert!(ordered.validate().is_err());
    }
}
