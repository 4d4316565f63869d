use crate::core::data::models::{FinancialRecord, FinancialRecordPatch, NewFinancialRecord};
use crate::core::query::client::{Query, QueryClient};
use crate::core::query::filter::Order;
use crate::core::query::key::{Collection, Invalidation, QueryKey, Report, Scope};

use super::{Record, RecordHook};

impl Record for FinancialRecord {
    const COLLECTION: Collection = Collection::FinancialRecords;
    type New = NewFinancialRecord;
    type Patch = FinancialRecordPatch;
}

/// Transactions of a farm, an animal, or both, newest first.
pub struct FinancialRecords {
    client: QueryClient,
    farm_id: Option<String>,
    animal_id: Option<String>,
}

impl FinancialRecords {
    pub fn new(client: &QueryClient, farm_id: Option<&str>, animal_id: Option<&str>) -> Self {
        Self {
            client: client.clone(),
            farm_id: farm_id.map(str::to_string),
            animal_id: animal_id.map(str::to_string),
        }
    }
}

impl RecordHook for FinancialRecords {
    type Record = FinancialRecord;

    fn client(&self) -> &QueryClient {
        &self.client
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(
            Collection::FinancialRecords,
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
            .order(Order::desc("transaction_date"))
            .enabled(self.farm_id.is_some() || self.animal_id.is_some())
    }

    fn related(&self) -> Vec<Invalidation> {
        vec![Invalidation::Report {
            report: Report::FinancialSummary,
            farm_id: self.farm_id.clone(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::models::{FinancialPeriod, NewFarm, TransactionType};
    use crate::core::query::key::Timeframe;
    use crate::core::records::testing::{client, USER};
    use crate::core::records::{Analytics, Farms};
    use crate::error::HerdbookError;
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;

    fn income(farm_id: &str, amount: f64, day: u32) -> NewFinancialRecord {
        NewFinancialRecord {
            farm_id: farm_id.to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            transaction_type: TransactionType::Income,
            category: "Livestock sales".to_string(),
            amount,
            animal_id: None,
            description: None,
        }
    }

    async fn farm(client: &QueryClient) -> String {
        Farms::new(client)
            .create(
                &NewFarm {
                    user_id: USER.to_string(),
                    name: "North".to_string(),
                    ..Default::default()
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_income_appears_in_monthly_summary() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client).await;
        let analytics = Analytics::new(&client, Some(&f1), Timeframe::Monthly);

        let before = analytics.financial_summary(&cancel).await.into_data_or_default().unwrap();
        assert!(before.is_empty());

        FinancialRecords::new(&client, Some(&f1), None)
            .create(&income(&f1, 1200.0, 14), &cancel)
            .await
            .unwrap();

        let after = analytics.financial_summary(&cancel).await.into_data_or_default().unwrap();
        assert_eq!(
            after,
            vec![FinancialPeriod {
                period: "2026-03".to_string(),
                income: 1200.0,
                expenses: 0.0,
                profit: 1200.0,
            }]
        );
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client).await;
        let records = FinancialRecords::new(&client, Some(&f1), None);

        let result = records.create(&income(&f1, -1.0, 1), &cancel).await;
        assert!(matches!(result, Err(HerdbookError::Validation(_))));

        let patch = FinancialRecordPatch {
            amount: Some(-20.0),
            ..Default::default()
        };
        assert!(matches!(
            records.update("any", &patch, &cancel).await,
            Err(HerdbookError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let client = client();
        let cancel = CancellationToken::new();
        let f1 = farm(&client).await;
        let records = FinancialRecords::new(&client, Some(&f1), None);

        records.create(&income(&f1, 10.0, 2), &cancel).await.unwrap();
        records.create(&income(&f1, 20.0, 20), &cancel).await.unwrap();

        let listed = records.list(&cancel).await.into_data_or_default().unwrap();
        let amounts: Vec<f64> = listed.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![20.0, 10.0]);

        assert!(FinancialRecords::new(&client, None, None).list(&cancel).await.is_not_started());
    }
}
