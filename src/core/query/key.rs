use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named backend collection (a table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Farms,
    AnimalCategories,
    Animals,
    HealthRecords,
    BreedingRecords,
    FeedingRecords,
    FinancialRecords,
    Tasks,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Farms,
        Collection::AnimalCategories,
        Collection::Animals,
        Collection::HealthRecords,
        Collection::BreedingRecords,
        Collection::FeedingRecords,
        Collection::FinancialRecords,
        Collection::Tasks,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Farms => "farms",
            Collection::AnimalCategories => "animal_categories",
            Collection::Animals => "animals",
            Collection::HealthRecords => "health_records",
            Collection::BreedingRecords => "breeding_records",
            Collection::FeedingRecords => "feeding_records",
            Collection::FinancialRecords => "financial_records",
            Collection::Tasks => "tasks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Collection {
    type Err = String;

    /// Table name, with `-` accepted for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.table_name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Collection::ALL.iter().map(|c| c.table_name()).collect();
                format!("Unknown collection '{}'. Use: {}", s, names.join(", "))
            })
    }
}

/// Aggregation bucket size for period-based reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Timeframe::Daily),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            "yearly" => Ok(Timeframe::Yearly),
            other => Err(format!(
                "Unknown timeframe '{}'. Use: daily, weekly, monthly, yearly",
                other
            )),
        }
    }
}

/// Backend-side aggregation procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Report {
    LivestockByCategory,
    FinancialSummary,
    HealthStatistics,
    BreedingStatistics,
}

impl Report {
    pub fn procedure_name(&self) -> &'static str {
        match self {
            Report::LivestockByCategory => "get_livestock_by_category",
            Report::FinancialSummary => "get_financial_summary",
            Report::HealthStatistics => "get_health_statistics",
            Report::BreedingStatistics => "get_breeding_statistics",
        }
    }

    /// The collection whose rows feed this report.
    pub fn source(&self) -> Collection {
        match self {
            Report::LivestockByCategory => Collection::Animals,
            Report::FinancialSummary => Collection::FinancialRecords,
            Report::HealthStatistics => Collection::HealthRecords,
            Report::BreedingStatistics => Collection::BreedingRecords,
        }
    }
}

/// The scoping part of a cache key. `None` ids mean "not narrowed".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    All,
    Owner { user_id: String },
    Farm { farm_id: Option<String> },
    Animal { animal_id: Option<String> },
    FarmAnimal { farm_id: Option<String>, animal_id: Option<String> },
    Record { id: String },
    Report { report: Report, farm_id: Option<String>, timeframe: Option<Timeframe> },
}

/// Identifies one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub collection: Collection,
    pub scope: Scope,
}

impl QueryKey {
    pub fn new(collection: Collection, scope: Scope) -> Self {
        Self { collection, scope }
    }

    pub fn record(collection: Collection, id: impl Into<String>) -> Self {
        Self::new(collection, Scope::Record { id: id.into() })
    }

    pub fn report(report: Report, farm_id: Option<&str>, timeframe: Option<Timeframe>) -> Self {
        Self::new(
            report.source(),
            Scope::Report {
                report,
                farm_id: farm_id.map(str::to_string),
                timeframe,
            },
        )
    }
}

fn or_all(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("all")
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.collection)?;
        match &self.scope {
            Scope::All => f.write_str("all"),
            Scope::Owner { user_id } => write!(f, "owner={}", user_id),
            Scope::Farm { farm_id } => write!(f, "farm={}", or_all(farm_id)),
            Scope::Animal { animal_id } => write!(f, "animal={}", or_all(animal_id)),
            Scope::FarmAnimal { farm_id, animal_id } => {
                write!(f, "farm={},animal={}", or_all(farm_id), or_all(animal_id))
            }
            Scope::Record { id } => write!(f, "id={}", id),
            Scope::Report { report, farm_id, timeframe } => {
                write!(f, "{}:farm={}", report.procedure_name(), or_all(farm_id))?;
                if let Some(timeframe) = timeframe {
                    write!(f, ",timeframe={}", timeframe)?;
                }
                Ok(())
            }
        }
    }
}

/// Which cached results a mutation makes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Exactly one key.
    Key(QueryKey),
    /// Every key of a collection, reports included.
    Collection(Collection),
    /// One report for one farm across all timeframes; `None` matches every farm.
    Report { report: Report, farm_id: Option<String> },
}

impl Invalidation {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Invalidation::Key(target) => target == key,
            Invalidation::Collection(collection) => key.collection == *collection,
            Invalidation::Report { report, farm_id } => match &key.scope {
                Scope::Report { report: cached, farm_id: cached_farm, .. } => {
                    cached == report && (farm_id.is_none() || farm_id == cached_farm)
                }
                _ => false,
            },
        }
    }
}
