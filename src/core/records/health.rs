use crate::core::data::models::{HealthRecord, HealthRecordPatch, NewHealthRecord};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::Order;
use crate::core::query::key::{Collection, Invalidation, QueryKey, Report, Scope};

use super::{Record, RecordHook};

impl Record for HealthRecord {
    const COLLECTION: Collection = Collection::HealthRecords;
    type New = NewHealthRecord;
    type Patch = HealthRecordPatch;
}

/// Health history of one animal, newest first.
pub struct HealthRecords {
    client: QueryClient,
    animal_id: Option<String>,
}

impl HealthRecords {
    pub fn new(client: &QueryClient, animal_id: Option<&str>) -> Self {
        Self {
            client: client.clone(),
            animal_id: animal_id.map(str::to_string),
        }
    }
}

impl RecordHook for HealthRecords {
    type Record = HealthRecord;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::HealthRecords,
            Scope::Animal {
                animal_id: self.animal_id.clone(),
            },
        )
    }

    fn list_query(&self) -> Query {
        Query::new(self.key())
            .eq_opt("animal_id", self.animal_id.as_deref())
            .order(Order::desc("record_date"))
            .enabled(self.animal_id.is_some())
    }

    /// The hook only knows the animal, so every farm's statistics go.
    fn related(&self) -> Vec<Invalidation> {
        vec![Invalidation::Report {
            report: Report::HealthStatistics,
            farm_id: None,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::models::{Gender, HealthRecordType, NewAnimal, NewFarm};
    use crate::core::records::testing::{client, USER};
    use crate::core::records::{Farms, Livestock};
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_records_newest_first_and_disabled_without_animal() {
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
            .create(&NewAnimal::new(&farm.id, "C-1", "Angus", Gender::Female), &cancel)
            .await
            .unwrap();

        let health = HealthRecords::new(&client, Some(&animal.id));
        for (day, kind) in [(3, HealthRecordType::Vaccination), (9, HealthRecordType::Checkup)] {
            health
                .create(
                    &NewHealthRecord {
                        animal_id: animal.id.clone(),
                        record_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
                        record_type: kind,
                        description: "routine".to_string(),
                        medicine: None,
                        dosage: None,
                        administered_by: Some("Dr. Hale".to_string()),
                        cost: Some(15.0),
                        notes: None,
                    },
                    &cancel,
                )
                .await
                .unwrap();
        }

        let records = health.list(&cancel).await.into_data_or_default().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, HealthRecordType::Checkup);

        let unscoped = HealthRecords::new(&client, None).list(&cancel).await;
        assert!(unscoped.is_not_started());
    }
}
