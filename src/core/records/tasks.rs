use crate::core::data::models::{NewTask, Task, TaskPatch};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::Order;
use crate::core::query::key::{Collection, QueryKey, Scope};

use super::{Record, RecordHook};

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;
    type New = NewTask;
    type Patch = TaskPatch;
}

/// Tasks of a farm and/or an animal, soonest due first, undated last.
pub struct Tasks {
    client: QueryClient,
    farm_id: Option<String>,
    animal_id: Option<String>,
}

impl Tasks {
    pub fn new(client: &QueryClient, farm_id: Option<&str>, animal_id: Option<&str>) -> Self {
        Self {
            client: client.clone(),
            farm_id: farm_id.map(str::to_string),
            animal_id: animal_id.map(str::to_string),
        }
    }
}

impl RecordHook for Tasks {
    type Record = Task;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::Tasks,
            Scope::FarmAnimal {
                farm_id: self.farm_id.clone(),
                animal_id: self.animal_id.clone(),
            },
        )
    }

    fn list_query(&self) -> Query {
        Query::new(self.key())
            .eq_opt("farm_id", self.farm_id.as_deref())
            .eq_opt("animal_id", self.animal_id.as_deref())
            .order(Order::asc("due_date"))
            .enabled(self.farm_id.is_some() || self.animal_id.is_some())
    }
}
