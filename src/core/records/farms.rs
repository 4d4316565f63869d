use crate::core::data::models::{Farm, FarmPatch, NewFarm};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::Order;
use crate::core::query::key::{Collection, Invalidation, QueryKey, Scope};

use super::{Record, RecordHook};

impl Record for Farm {
    const COLLECTION: Collection = Collection::Farms;
    type New = NewFarm;
    type Patch = FarmPatch;
}

/// Farms owned by the signed-in user.
pub struct Farms {
    client: QueryClient,
    user_id: Option<String>,
}

impl Farms {
    pub fn new(client: &QueryClient) -> Self {
        Self {
            client: client.clone(),
            user_id: client.user_id(),
        }
    }
}

impl RecordHook for Farms {
    type Record = Farm;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::Farms,
            Scope::Owner {
                user_id: self.user_id.clone().unwrap_or_default(),
            },
        )
    }

    fn list_query(&self) -> Query {
        Query::new(self.key())
            .eq("user_id", self.user_id.clone().unwrap_or_default())
            .order(Order::asc("name"))
            .enabled(self.user_id.is_some())
    }

    /// The unscoped animal list is filtered by the owner's farm ids.
    fn related(&self) -> Vec<Invalidation> {
        vec![Invalidation::Key(QueryKey::new(
            Collection::Animals,
            Scope::Farm { farm_id: None },
        ))]
    }

    fn cascades(&self) -> Vec<Collection> {
        vec![
            Collection::Animals,
            Collection::HealthRecords,
            Collection::BreedingRecords,
            Collection::FeedingRecords,
            Collection::FinancialRecords,
            Collection::Tasks,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::testing::{client, USER};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_farms_are_scoped_to_owner_and_sorted() {
        let client = client();
        let cancel = CancellationToken::new();
        let farms = Farms::new(&client);

        for name in ["Upper Meadow", "Creekside"] {
            farms
                .create(
                    &NewFarm {
                        user_id: USER.to_string(),
                        name: name.to_string(),
                        ..Default::default()
                    },
                    &cancel,
                )
                .await
                .unwrap();
        }
        farms
            .create(
                &NewFarm {
                    user_id: "someone-else".to_string(),
                    name: "Elsewhere".to_string(),
                    ..Default::default()
                },
                &cancel,
            )
            .await
            .unwrap();

        let names: Vec<String> = farms
            .list(&cancel)
            .await
            .into_data_or_default()
            .unwrap()
            .into_iter()
            .map(|farm| farm.name)
            .collect();
        assert_eq!(names, vec!["Creekside", "Upper Meadow"]);
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let client = client();
        let cancel = CancellationToken::new();
        let farms = Farms::new(&client);

        let created = farms
            .create(
                &NewFarm {
                    user_id: USER.to_string(),
                    name: "Hilltop".to_string(),
                    location: Some("Ridge Rd".to_string()),
                    size: Some(42.5),
                    size_unit: Some("ha".to_string()),
                },
                &cancel,
            )
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let fetched = farms.get(&created.id, &cancel).await.into_result().unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.size, Some(42.5));
        assert_eq!(fetched.location.as_deref(), Some("Ridge Rd"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let client = client();
        let farms = Farms::new(&client);
        let err = farms.delete("missing", &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
