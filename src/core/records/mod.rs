//! Domain hooks: one typed wrapper per collection over the query client.
//!
//! A hook is built with its scoping ids. Its list query is fixed by that
//! scope, and every mutation it issues invalidates its whole collection plus
//! any related reports. Deletes also invalidate the collections the schema
//! cascades into. Reports are keyed under the collection that feeds them, so
//! a collection invalidation drops its reports too.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::data::database::now_timestamp;
use crate::core::data::models::Validate;
use crate::core::query::client::{Mutation, MutationRequest, Query, QueryClient};
use crate::core::query::filter::Match;
use crate::core::query::key::{Collection, Invalidation, QueryKey};
use crate::core::query::state::QueryState;
use crate::core::services::backend::Row;
use crate::error::{BackendError, HerdbookError, Result};

pub mod analytics;
pub mod breeding;
pub mod categories;
pub mod farms;
pub mod feeding;
pub mod financial;
pub mod health;
pub mod livestock;
pub mod tasks;

pub use analytics::Analytics;
pub use breeding::BreedingRecords;
pub use categories::AnimalCategories;
pub use farms::Farms;
pub use feeding::FeedingRecords;
pub use financial::FinancialRecords;
pub use health::HealthRecords;
pub use livestock::Livestock;
pub use tasks::Tasks;

/// A stored entity and the payloads that create and change it.
pub trait Record: DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;
    type New: Serialize + Validate + Send + Sync;
    type Patch: Serialize + Validate + Send + Sync;
}

pub(crate) fn to_row<T: Serialize>(payload: &T) -> Result<Row> {
    match serde_json::to_value(payload)? {
        Value::Object(row) => Ok(row),
        other => Err(HerdbookError::Validation(format!(
            "Payload must be an object, got {}",
            other
        ))),
    }
}

fn first_row<R: Record>(rows: Vec<Row>) -> Result<R> {
    let row = rows.into_iter().next().ok_or_else(|| HerdbookError::NotFound {
        collection: R::COLLECTION.to_string(),
    })?;
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[async_trait]
pub trait RecordHook: Send + Sync {
    type Record: Record;

    fn client(&self) -> &QueryClient;

    /// The cache key of this hook's list.
    fn key(&self) -> QueryKey;

    fn list_query(&self) -> Query;

    /// Reports fed by this collection.
    fn related(&self) -> Vec<Invalidation> {
        Vec::new()
    }

    /// Collections whose rows a delete here removes or detaches through the
    /// schema's cascades.
    fn cascades(&self) -> Vec<Collection> {
        Vec::new()
    }

    fn invalidations(&self) -> Vec<Invalidation> {
        let mut targets = vec![Invalidation::Collection(<Self::Record as Record>::COLLECTION)];
        targets.extend(self.related());
        targets
    }

    async fn list(&self, cancel: &CancellationToken) -> QueryState<Vec<Self::Record>> {
        self.client().query(&self.list_query(), cancel).await
    }

    async fn get(&self, id: &str, cancel: &CancellationToken) -> QueryState<Self::Record> {
        let collection = <Self::Record as Record>::COLLECTION;
        let query = Query::new(QueryKey::record(collection, id)).eq("id", id).single();
        self.client().query(&query, cancel).await
    }

    /// Insert one record; both timestamps are stamped here.
    async fn create(
        &self,
        new: &<Self::Record as Record>::New,
        cancel: &CancellationToken,
    ) -> Result<Self::Record> {
        new.validate()?;
        let collection = <Self::Record as Record>::COLLECTION;
        let mut row = to_row(new)?;
        let now = now_timestamp();
        row.insert("created_at".to_string(), Value::String(now.clone()));
        row.insert("updated_at".to_string(), Value::String(now));

        let mut request = MutationRequest::new(collection, Mutation::Insert(vec![row]));
        request.invalidates = self.invalidations();
        let rows = self.client().mutate(request, cancel).await?;
        debug!("Created record in {}", collection);
        first_row::<Self::Record>(rows).map_err(|e| match e {
            HerdbookError::NotFound { .. } => BackendError::InvalidResponse {
                reason: format!("insert into {} returned no rows", collection),
            }
            .into(),
            other => other,
        })
    }

    /// Partial update by id; `updated_at` is stamped here.
    async fn update(
        &self,
        id: &str,
        patch: &<Self::Record as Record>::Patch,
        cancel: &CancellationToken,
    ) -> Result<Self::Record> {
        patch.validate()?;
        let collection = <Self::Record as Record>::COLLECTION;
        let mut row = to_row(patch)?;
        row.insert("updated_at".to_string(), Value::String(now_timestamp()));

        let mut request = MutationRequest::new(
            collection,
            Mutation::Update {
                patch: row,
                matcher: Match::id(id),
            },
        );
        request.invalidates = self.invalidations();
        let rows = self.client().mutate(request, cancel).await?;
        first_row(rows)
    }

    async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let collection = <Self::Record as Record>::COLLECTION;
        let mut request = MutationRequest::new(collection, Mutation::Delete { matcher: Match::id(id) });
        request.invalidates = self.invalidations();
        request
            .invalidates
            .extend(self.cascades().into_iter().map(Invalidation::Collection));
        let rows = self.client().mutate(request, cancel).await?;
        if rows.is_empty() {
            return Err(HerdbookError::NotFound {
                collection: collection.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::core::data::database::SqliteBackend;
    use crate::core::infrastructure::cache::QueryCache;
    use crate::core::infrastructure::session::Session;
    use crate::core::query::client::QueryClient;
    use std::sync::Arc;
    use std::time::Duration;

    pub const USER: &str = "user-1";

    /// A client over a fresh in-memory database, signed in as [`USER`].
    pub fn client() -> QueryClient {
        let backend = SqliteBackend::open_in_memory().unwrap();
        QueryClient::new(
            Arc::new(backend),
            QueryCache::new(Duration::from_secs(300), 1000),
            Session::local(USER),
        )
    }
}
