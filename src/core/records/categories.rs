use crate::core::data::models::{AnimalCategory, AnimalCategoryPatch, NewAnimalCategory};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::Order;
use crate::core::query::key::{Collection, Invalidation, QueryKey, Report, Scope};

use super::{Record, RecordHook};

impl Record for AnimalCategory {
    const COLLECTION: Collection = Collection::AnimalCategories;
    type New = NewAnimalCategory;
    type Patch = AnimalCategoryPatch;
}

/// The shared category list.
pub struct AnimalCategories {
    client: QueryClient,
}

impl AnimalCategories {
    pub fn new(client: &QueryClient) -> Self {
        Self { client: client.clone() }
    }
}

impl RecordHook for AnimalCategories {
    type Record = AnimalCategory;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(Collection::AnimalCategories, Scope::All)
    }

    fn list_query(&self) -> Query {
        Query::new(self.key()).order(Order::asc("name"))
    }

    /// Renaming a category changes every farm's category breakdown.
    fn related(&self) -> Vec<Invalidation> {
        vec![Invalidation::Report {
            report: Report::LivestockByCategory,
            farm_id: None,
        }]
    }

    fn cascades(&self) -> Vec<Collection> {
        vec![Collection::Animals]
    }
}
