use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::data::models::{Animal, AnimalPatch, AnimalWithCategory, NewAnimal};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::{Filter, Order};
use crate::core::query::key::{Collection, Invalidation, QueryKey, Report, Scope};
use crate::core::query::state::QueryState;

use super::categories::AnimalCategories;
use super::farms::Farms;
use super::{Record, RecordHook};

impl Record for Animal {
    const COLLECTION: Collection = Collection::Animals;
    type New = NewAnimal;
    type Patch = AnimalPatch;
}

/// Animals of one farm, or of every farm the user owns.
pub struct Livestock {
    client: QueryClient,
    farm_id: Option<String>,
}

impl Livestock {
    pub fn new(client: &QueryClient, farm_id: Option<&str>) -> Self {
        Self {
            client: client.clone(),
            farm_id: farm_id.map(str::to_string),
        }
    }

    /// The list with category names resolved from the shared category list.
    /// Both lists are cached and invalidated on their own.
    pub async fn list_with_categories(&self, cancel: &CancellationToken) -> QueryState<Vec<AnimalWithCategory>> {
        let category_query = AnimalCategories::new(&self.client);
        let (animals, categories) = futures::join!(
            self.list(cancel),
            category_query.list(cancel)
        );
        let names: HashMap<String, String> = match categories {
            QueryState::Ready(categories) => categories.into_iter().map(|c| (c.id, c.name)).collect(),
            QueryState::Failed(e) => return QueryState::Failed(e),
            QueryState::NotStarted | QueryState::Loading => HashMap::new(),
        };

        animals.map(|animals| {
            animals
                .into_iter()
                .map(|animal| AnimalWithCategory {
                    category_name: animal.category_id.as_ref().and_then(|id| names.get(id).cloned()),
                    animal,
                })
                .collect()
        })
    }
}

#[async_trait]
impl RecordHook for Livestock {
    type Record = Animal;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::Animals,
            Scope::Farm {
                farm_id: self.farm_id.clone(),
            },
        )
    }

    fn list_query(&self) -> Query {
        Query::new(self.key())
            .eq_opt("farm_id", self.farm_id.as_deref())
            .order(Order::asc("tag_id"))
            .enabled(self.farm_id.is_some() || self.client.is_authenticated())
    }

    fn related(&self) -> Vec<Invalidation> {
        vec![Invalidation::Report {
            report: Report::LivestockByCategory,
            farm_id: self.farm_id.clone(),
        }]
    }

    /// Financial records and offspring parents are detached, the rest removed.
    fn cascades(&self) -> Vec<Collection> {
        vec![
            Collection::HealthRecords,
            Collection::BreedingRecords,
            Collection::FeedingRecords,
            Collection::FinancialRecords,
            Collection::Tasks,
        ]
    }

    /// Without a farm, resolve the user's farms first and list across them.
    async fn list(&self, cancel: &CancellationToken) -> QueryState<Vec<Animal>> {
        let query = self.list_query();
        if self.farm_id.is_some() || !query.enabled {
            return self.client.query(&query, cancel).await;
        }

        let farm_ids: Vec<String> = match Farms::new(&self.client).list(cancel).await {
            QueryState::Ready(farms) => farms.into_iter().map(|farm| farm.id).collect(),
            QueryState::NotStarted => return QueryState::NotStarted,
            QueryState::Loading => return QueryState::Loading,
            QueryState::Failed(e) => return QueryState::Failed(e),
        };
        debug!("Listing animals across {} farms", farm_ids.len());
        self.client
            .query(&query.filter(Filter::is_in("farm_id", farm_ids)), cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::models::{
        AnimalStatus, Gender, HealthRecordType, NewAnimalCategory, NewFarm, NewHealthRecord, NewTask,
    };
    use crate::core::records::testing::{client, USER};
    use crate::core::records::{HealthRecords, Tasks};
    use chrono::NaiveDate;

    async fn farm(client: &QueryClient, user: &str, name: &str) -> String {
        Farms::new(client)
            .create(
                &NewFarm {
                    user_id: user.to_string(),
                    name: name.to_string(),
                    ..Default::default()
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_list_by_farm_sorted_by_tag() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client, USER, "North").await;
        let livestock = Livestock::new(&client, Some(&f1));

        for tag in ["G-2", "G-10", "G-1"] {
            livestock
                .create(&NewAnimal::new(&f1, tag, "Boer", Gender::Female), &cancel)
                .await
                .unwrap();
        }

        let tags: Vec<String> = livestock
            .list(&cancel)
            .await
            .into_data_or_default()
            .unwrap()
            .into_iter()
            .map(|a| a.tag_id)
            .collect();
        assert_eq!(tags, vec!["G-1", "G-10", "G-2"]);
    }

    #[tokio::test]
    async fn test_unscoped_list_covers_only_owned_farms() {
        let client = client();
        let cancel = CancellationToken::new();
        let mine = farm(&client, USER, "Mine").await;
        let theirs = farm(&client, "neighbour", "Theirs").await;

        let all = Livestock::new(&client, None);
        all.create(&NewAnimal::new(&mine, "M-1", "Angus", Gender::Male), &cancel)
            .await
            .unwrap();
        all.create(&NewAnimal::new(&theirs, "T-1", "Angus", Gender::Male), &cancel)
            .await
            .unwrap();

        let animals = all.list(&cancel).await.into_data_or_default().unwrap();
        assert_eq!(animals.len(), 1);
        assert_eq!(animals[0].farm_id, mine);

        let second = farm(&client, USER, "Second").await;
        Livestock::new(&client, Some(&second))
            .create(&NewAnimal::new(&second, "S-1", "Angus", Gender::Female), &cancel)
            .await
            .unwrap();
        assert_eq!(all.list(&cancel).await.into_data_or_default().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_with_category_names() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client, USER, "North").await;
        let categories = AnimalCategories::new(&client);
        let goats = categories
            .create(
                &NewAnimalCategory {
                    name: "Goats".to_string(),
                    description: None,
                },
                &cancel,
            )
            .await
            .unwrap();

        let livestock = Livestock::new(&client, Some(&f1));
        let mut doe = NewAnimal::new(&f1, "G-1", "Boer", Gender::Female);
        doe.category_id = Some(goats.id.clone());
        livestock.create(&doe, &cancel).await.unwrap();
        livestock
            .create(&NewAnimal::new(&f1, "X-1", "Mixed", Gender::Male), &cancel)
            .await
            .unwrap();

        let listed = livestock.list_with_categories(&cancel).await.into_data_or_default().unwrap();
        let names: Vec<(String, Option<String>)> = listed
            .iter()
            .map(|a| (a.animal.tag_id.clone(), a.category_name.clone()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("G-1".to_string(), Some("Goats".to_string())),
                ("X-1".to_string(), None),
            ]
        );

        // Deleting the category detaches the animal
        categories.delete(&goats.id, &cancel).await.unwrap();
        let listed = livestock.list_with_categories(&cancel).await.into_data_or_default().unwrap();
        assert!(listed.iter().all(|a| a.category_name.is_none() && a.animal.category_id.is_none()));
    }

    #[tokio::test]
    async fn test_concurrent_updates_last_write_wins() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client, USER, "North").await;
        let livestock = Livestock::new(&client, Some(&f1));
        let animal = livestock
            .create(&NewAnimal::new(&f1, "A-1", "Nubian", Gender::Female), &cancel)
            .await
            .unwrap();

        let heavier = AnimalPatch {
            weight: Some(61.0),
            ..Default::default()
        };
        let sold = AnimalPatch {
            weight: Some(58.5),
            status: Some(AnimalStatus::Sold),
            ..Default::default()
        };
        let (first, second) = tokio::join!(
            livestock.update(&animal.id, &heavier, &cancel),
            livestock.update(&animal.id, &sold, &cancel)
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        let last = if second.updated_at >= first.updated_at { &second } else { &first };
        let stored = livestock.get(&animal.id, &cancel).await.into_result().unwrap().unwrap();
        assert_eq!(stored.weight, last.weight);
        assert_eq!(stored.status, AnimalStatus::Sold);
    }

    #[tokio::test]
    async fn test_deletes_drop_cached_child_lists() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client, USER, "North").await;
        let animal = Livestock::new(&client, Some(&f1))
            .create(&NewAnimal::new(&f1, "A-1", "Nubian", Gender::Female), &cancel)
            .await
            .unwrap();

        let health = HealthRecords::new(&client, Some(&animal.id));
        health
            .create(
                &NewHealthRecord {
                    animal_id: animal.id.clone(),
                    record_date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
                    record_type: HealthRecordType::Checkup,
                    description: "spring checkup".to_string(),
                    medicine: None,
                    dosage: None,
                    administered_by: None,
                    cost: None,
                    notes: None,
                },
                &cancel,
            )
            .await
            .unwrap();
        let tasks = Tasks::new(&client, Some(&f1), None);
        tasks
            .create(
                &NewTask {
                    farm_id: f1.clone(),
                    title: "Mend fence".to_string(),
                    ..Default::default()
                },
                &cancel,
            )
            .await
            .unwrap();

        // Both lists are cached before the deletes
        assert_eq!(health.list(&cancel).await.into_data_or_default().unwrap().len(), 1);
        assert_eq!(tasks.list(&cancel).await.into_data_or_default().unwrap().len(), 1);

        Livestock::new(&client, Some(&f1)).delete(&animal.id, &cancel).await.unwrap();
        assert!(health.list(&cancel).await.into_data_or_default().unwrap().is_empty());
        assert_eq!(tasks.list(&cancel).await.into_data_or_default().unwrap().len(), 1);

        Farms::new(&client).delete(&f1, &cancel).await.unwrap();
        assert!(tasks.list(&cancel).await.into_data_or_default().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_weight_rejected_before_dispatch() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client, USER, "North").await;
        let livestock = Livestock::new(&client, Some(&f1));

        let mut animal = NewAnimal::new(&f1, "A-1", "Nubian", Gender::Female);
        animal.weight = Some(-3.0);
        assert!(matches!(
            livestock.create(&animal, &cancel).await,
            Err(crate::error::HerdbookError::Validation(_))
        ));
        assert!(livestock.list(&cancel).await.into_data_or_default().unwrap().is_empty());
    }
}
