use crate::core::data::models::{FeedingRecord, FeedingRecordPatch, NewFeedingRecord};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::Order;
use crate::core::query::key::{Collection, QueryKey, Scope};

use super::{Record, RecordHook};

impl Record for FeedingRecord {
    const COLLECTION: Collection = Collection::FeedingRecords;
    type New = NewFeedingRecord;
    type Patch = FeedingRecordPatch;
}

pub struct FeedingRecords {
    client: QueryClient,
    animal_id: Option<String>,
}

impl FeedingRecords {
    pub fn new(client: &QueryClient, animal_id: Option<&str>) -> Self {
        Self {
            client: client.clone(),
            animal_id: animal_id.map(str::to_string),
        }
    }
}

impl RecordHook for FeedingRecords {
    type Record = FeedingRecord;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::FeedingRecords,
            Scope::Animal {
                animal_id: self.animal_id.clone(),
            },
        )
    }

    fn list_query(&self) -> Query {
        Query::new(self.key())
            .eq_opt("animal_id", self.animal_id.as_deref())
            .order(Order::desc("feeding_date"))
            .enabled(self.animal_id.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::models::{Gender, NewAnimal, NewFarm};
    use crate::core::records::testing::{client, USER};
    use crate::core::records::{Farms, Livestock};
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_feeding_defaults_and_update() {
        let client = client();
        let cancel = CancellationToken::new();
        let farm = Farms::new(&client)
            .create(
                &NewFarm {
                    user_id: USER.to_string(),
                    name: "North".to_string(),
                    ..Default::default()
                },
                &cancel,
            )
            .await
            .unwrap();
        let animal = Livestock::new(&client, Some(&farm.id))
            .create(&NewAnimal::new(&farm.id, "E-1", "Merino", Gender::Female), &cancel)
            .await
            .unwrap();

        let feeding = FeedingRecords::new(&client, Some(&animal.id));
        let record = feeding
            .create(
                &NewFeedingRecord {
                    animal_id: animal.id.clone(),
                    feed_type: "Hay".to_string(),
                    feeding_date: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
                    quantity: Some(4.0),
                    quantity_unit: None,
                    cost: None,
                    notes: None,
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(record.quantity_unit, "kg");

        let updated = feeding
            .update(
                &record.id,
                &FeedingRecordPatch {
                    cost: Some(6.25),
                    ..Default::default()
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(updated.cost, Some(6.25));
        assert_eq!(updated.feed_type, "Hay");

        let listed = feeding.list(&cancel).await.into_data_or_default().unwrap();
        assert_eq!(listed, vec![updated]);
    }
}
