use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::core::data::models::{BreedingStatistics, CategoryCount, FarmReport, FinancialPeriod, HealthStatistic};
use crate::core::query::client::QueryClient;
use crate::core::query::key::{QueryKey, Report, Timeframe};
use crate::core::query::state::QueryState;
use crate::error::Result;

/// Summary reports computed by backend procedures, for one farm (or all of
/// the user's data) and one timeframe.
pub struct Analytics {
    client: QueryClient,
    farm_id: Option<String>,
    timeframe: Timeframe,
}

impl Analytics {
    pub fn new(client: &QueryClient, farm_id: Option<&str>, timeframe: Timeframe) -> Self {
        Self {
            client: client.clone(),
            farm_id: farm_id.map(str::to_string),
            timeframe,
        }
    }

    pub fn key(&self, report: Report) -> QueryKey {
        let timeframe = match report {
            Report::FinancialSummary => Some(self.timeframe),
            _ => None,
        };
        QueryKey::report(report, self.farm_id.as_deref(), timeframe)
    }

    fn params(&self, report: Report) -> Value {
        match report {
            Report::FinancialSummary => json!({
                "farm_id_param": self.farm_id,
                "timeframe_param": self.timeframe.as_str(),
            }),
            _ => json!({ "farm_id_param": self.farm_id }),
        }
    }

    async fn run<T: DeserializeOwned>(&self, report: Report, cancel: &CancellationToken) -> QueryState<T> {
        self.client
            .call(&self.key(report), report.procedure_name(), self.params(report), true, cancel)
            .await
    }

    pub async fn livestock_by_category(&self, cancel: &CancellationToken) -> QueryState<Vec<CategoryCount>> {
        self.run(Report::LivestockByCategory, cancel).await
    }

    pub async fn financial_summary(&self, cancel: &CancellationToken) -> QueryState<Vec<FinancialPeriod>> {
        self.run(Report::FinancialSummary, cancel).await
    }

    pub async fn health_statistics(&self, cancel: &CancellationToken) -> QueryState<Vec<HealthStatistic>> {
        self.run(Report::HealthStatistics, cancel).await
    }

    pub async fn breeding_statistics(&self, cancel: &CancellationToken) -> QueryState<BreedingStatistics> {
        self.run(Report::BreedingStatistics, cancel).await
    }

    /// All four reports, fetched concurrently. Reports that never started
    /// (no identity) come back empty; the first failure is returned.
    pub async fn report(&self, cancel: &CancellationToken) -> Result<FarmReport> {
        let (categories, finances, health, breeding) = futures::join!(
            self.livestock_by_category(cancel),
            self.financial_summary(cancel),
            self.health_statistics(cancel),
            self.breeding_statistics(cancel),
        );

        Ok(FarmReport {
            livestock_by_category: categories.into_data_or_default()?,
            financial_summary: finances.into_data_or_default()?,
            health_statistics: health.into_data_or_default()?,
            breeding_statistics: breeding.into_data_or_default()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::models::{
        Gender, HealthRecordType, NewAnimal, NewAnimalCategory, NewBreedingRecord, NewFarm, NewHealthRecord,
    };
    use crate::core::infrastructure::cache::QueryCache;
    use crate::core::infrastructure::session::Session;
    use crate::core::data::database::SqliteBackend;
    use crate::core::records::testing::{client, USER};
    use crate::core::records::{AnimalCategories, BreedingRecords, Farms, HealthRecords, Livestock, RecordHook};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_full_report() {
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
        let goats = AnimalCategories::new(&client)
            .create(
                &NewAnimalCategory {
                    name: "Goats".to_string(),
                    description: None,
                },
                &cancel,
            )
            .await
            .unwrap();

        let herd = Livestock::new(&client, Some(&farm.id));
        let mut doe = NewAnimal::new(&farm.id, "D-1", "Boer", Gender::Female);
        doe.category_id = Some(goats.id.clone());
        let doe = herd.create(&doe, &cancel).await.unwrap();
        herd.create(&NewAnimal::new(&farm.id, "X-1", "Mixed", Gender::Male), &cancel)
            .await
            .unwrap();

        let analytics = Analytics::new(&client, Some(&farm.id), Timeframe::Monthly);
        let first = analytics.report(&cancel).await.unwrap();
        assert_eq!(first.livestock_by_category.len(), 2);
        assert!(first.health_statistics.is_empty());
        assert_eq!(first.breeding_statistics, BreedingStatistics::default());

        HealthRecords::new(&client, Some(&doe.id))
            .create(
                &NewHealthRecord {
                    animal_id: doe.id.clone(),
                    record_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                    record_type: HealthRecordType::Vaccination,
                    description: "CDT booster".to_string(),
                    medicine: Some("CDT".to_string()),
                    dosage: Some("2ml".to_string()),
                    administered_by: None,
                    cost: Some(8.0),
                    notes: None,
                },
                &cancel,
            )
            .await
            .unwrap();
        BreedingRecords::new(&client, Some(&doe.id))
            .create(
                &NewBreedingRecord {
                    female_id: doe.id.clone(),
                    breeding_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
                    breeding_type: "Natural".to_string(),
                    male_id: None,
                    expected_delivery_date: None,
                    actual_delivery_date: NaiveDate::from_ymd_opt(2026, 2, 28),
                    success: Some(true),
                    offspring_count: Some(2),
                    notes: None,
                },
                &cancel,
            )
            .await
            .unwrap();

        let second = analytics.report(&cancel).await.unwrap();
        assert_eq!(
            second.health_statistics,
            vec![HealthStatistic {
                record_type: "Vaccination".to_string(),
                count: 1,
                total_cost: 8.0,
            }]
        );
        assert_eq!(second.breeding_statistics.success_rate, 100.0);
        assert_eq!(second.breeding_statistics.total_offspring, 2);
        assert_eq!(second.breeding_statistics.avg_gestation, 150.0);
    }

    #[tokio::test]
    async fn test_report_without_identity_is_empty() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let client = QueryClient::new(
            Arc::new(backend),
            QueryCache::new(Duration::from_secs(300), 100),
            Session::anonymous(),
        );
        let analytics = Analytics::new(&client, None, Timeframe::Yearly);

        assert!(analytics.financial_summary(&CancellationToken::new()).await.is_not_started());
        let report = analytics.report(&CancellationToken::new()).await.unwrap();
        assert_eq!(report, FarmReport::default());
    }

    #[test]
    fn test_only_financial_key_carries_timeframe() {
        let client = client();
        let analytics = Analytics::new(&client, Some("F1"), Timeframe::Weekly);
        assert_eq!(
            analytics.key(Report::FinancialSummary),
            QueryKey::report(Report::FinancialSummary, Some("F1"), Some(Timeframe::Weekly))
        );
        assert_eq!(
            analytics.key(Report::HealthStatistics),
            QueryKey::report(Report::HealthStatistics, Some("F1"), None)
        );
    }
}
