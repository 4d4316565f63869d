use crate::core::data::models::{BreedingRecord, BreedingRecordPatch, NewBreedingRecord};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::{Filter, Order};
use crate::core::query::key::{Collection, Invalidation, QueryKey, Report, Scope};

use super::{Record, RecordHook};

impl Record for BreedingRecord {
    const COLLECTION: Collection = Collection::BreedingRecords;
    type New = NewBreedingRecord;
    type Patch = BreedingRecordPatch;
}

/// Breedings an animal took part in, as dam or sire.
pub struct BreedingRecords {
    client: QueryClient,
    animal_id: Option<String>,
}

impl BreedingRecords {
    pub fn new(client: &QueryClient, animal_id: Option<&str>) -> Self {
        Self {
            client: client.clone(),
            animal_id: animal_id.map(str::to_string),
        }
    }
}

impl RecordHook for BreedingRecords {
    type Record = BreedingRecord;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::BreedingRecords,
            Scope::Animal {
                animal_id: self.animal_id.clone(),
            },
        )
    }

    fn list_query(&self) -> Query {
        let query = Query::new(self.key())
            .order(Order::desc("breeding_date"))
            .enabled(self.animal_id.is_some());
        match &self.animal_id {
            Some(id) => query.filter(Filter::or([
                Filter::eq("female_id", id.as_str()),
                Filter::eq("male_id", id.as_str()),
            ])),
            None => query,
        }
    }

    fn related(&self) -> Vec<Invalidation> {
        vec![Invalidation::Report {
            report: Report::BreedingStatistics,
            farm_id: None,
        }]
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

    fn breeding(female: &str, male: Option<&str>, month: u32) -> NewBreedingRecord {
        NewBreedingRecord {
            female_id: female.to_string(),
            breeding_date: NaiveDate::from_ymd_opt(2026, month, 1).unwrap(),
            breeding_type: "Natural".to_string(),
            male_id: male.map(str::to_string),
            expected_delivery_date: None,
            actual_delivery_date: None,
            success: None,
            offspring_count: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_list_matches_either_parent() {
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
        let herd = Livestock::new(&client, Some(&farm.id));
        let doe = herd.create(&NewAnimal::new(&farm.id, "D-1", "Boer", Gender::Female), &cancel).await.unwrap();
        let other_doe = herd.create(&NewAnimal::new(&farm.id, "D-2", "Boer", Gender::Female), &cancel).await.unwrap();
        let buck = herd.create(&NewAnimal::new(&farm.id, "B-1", "Boer", Gender::Male), &cancel).await.unwrap();

        let records = BreedingRecords::new(&client, Some(&buck.id));
        records.create(&breeding(&doe.id, Some(&buck.id), 1), &cancel).await.unwrap();
        records.create(&breeding(&other_doe.id, Some(&buck.id), 2), &cancel).await.unwrap();
        records.create(&breeding(&other_doe.id, None, 3), &cancel).await.unwrap();

        let sire = records.list(&cancel).await.into_data_or_default().unwrap();
        assert_eq!(sire.len(), 2);
        assert_eq!(sire[0].female_id, other_doe.id);

        let dam = BreedingRecords::new(&client, Some(&other_doe.id))
            .list(&cancel)
            .await
            .into_data_or_default()
            .unwrap();
        assert_eq!(dam.len(), 2);
        assert_eq!(dam[0].male_id, None);
    }
}
