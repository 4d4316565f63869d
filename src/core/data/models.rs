//! Typed records for every collection, their insert and patch payloads, and
//! the analytics result shapes.
//!
//! Insert and patch payloads skip `None` fields, so a patch only touches the
//! columns it names and an insert leaves column defaults to the backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HerdbookError, Result};

/// Closed string enumerations shared with the backend's check constraints.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let wanted = s.trim().replace(['-', '_'], " ");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(&wanted))
                    .ok_or_else(|| {
                        let options: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("Unknown value '{}'. Use: {}", s, options.join(", "))
                    })
            }
        }
    };
}

string_enum!(AnimalStatus { Active => "Active", Sold => "Sold", Deceased => "Deceased" });

string_enum!(Gender { Male => "Male", Female => "Female" });

string_enum!(HealthRecordType {
    Vaccination => "Vaccination",
    Treatment => "Treatment",
    Checkup => "Checkup",
    Disease => "Disease",
    Other => "Other",
});

string_enum!(TransactionType { Income => "Income", Expense => "Expense" });

string_enum!(TaskPriority { High => "High", Medium => "Medium", Low => "Low" });

string_enum!(TaskStatus {
    Pending => "Pending",
    InProgress => "In Progress",
    Completed => "Completed",
});

impl Default for AnimalStatus {
    fn default() -> Self {
        AnimalStatus::Active
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// Checks a payload must pass before it is sent to a backend.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn non_negative(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(HerdbookError::Validation(format!(
            "{} must be a non-negative number, got {}",
            field, v
        ))),
        _ => Ok(()),
    }
}

fn required(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(HerdbookError::Validation(format!("{} must not be blank", field))),
        _ => Ok(()),
    }
}

// Farms

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub location: Option<String>,
    pub size: Option<f64>,
    pub size_unit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFarm {
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_unit: Option<String>,
}

impl Validate for NewFarm {
    fn validate(&self) -> Result<()> {
        required("user_id", Some(self.user_id.as_str()))?;
        required("name", Some(self.name.as_str()))?;
        non_negative("size", self.size)
    }
}

impl Validate for FarmPatch {
    fn validate(&self) -> Result<()> {
        required("name", self.name.as_deref())?;
        non_negative("size", self.size)
    }
}

// Animal categories

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalCategory {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAnimalCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimalCategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for NewAnimalCategory {
    fn validate(&self) -> Result<()> {
        required("name", Some(self.name.as_str()))
    }
}

impl Validate for AnimalCategoryPatch {
    fn validate(&self) -> Result<()> {
        required("name", self.name.as_deref())
    }
}

// Animals

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub farm_id: String,
    pub category_id: Option<String>,
    pub tag_id: String,
    pub name: Option<String>,
    pub breed: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub weight_unit: String,
    pub status: AnimalStatus,
    pub parent_female_id: Option<String>,
    pub parent_male_id: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub acquisition_cost: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An animal with its category's name, the way animal listings show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimalWithCategory {
    #[serde(flatten)]
    pub animal: Animal,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnimal {
    pub farm_id: String,
    pub tag_id: String,
    pub breed: String,
    pub gender: Gender,
    #[serde(default)]
    pub status: AnimalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_female_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_male_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewAnimal {
    pub fn new(farm_id: impl Into<String>, tag_id: impl Into<String>, breed: impl Into<String>, gender: Gender) -> Self {
        Self {
            farm_id: farm_id.into(),
            tag_id: tag_id.into(),
            breed: breed.into(),
            gender,
            status: AnimalStatus::Active,
            category_id: None,
            name: None,
            date_of_birth: None,
            weight: None,
            weight_unit: None,
            parent_female_id: None,
            parent_male_id: None,
            acquisition_date: None,
            acquisition_cost: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AnimalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_female_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_male_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for NewAnimal {
    fn validate(&self) -> Result<()> {
        required("farm_id", Some(self.farm_id.as_str()))?;
        required("tag_id", Some(self.tag_id.as_str()))?;
        required("breed", Some(self.breed.as_str()))?;
        non_negative("weight", self.weight)?;
        non_negative("acquisition_cost", self.acquisition_cost)
    }
}

impl Validate for AnimalPatch {
    fn validate(&self) -> Result<()> {
        required("tag_id", self.tag_id.as_deref())?;
        required("breed", self.breed.as_deref())?;
        non_negative("weight", self.weight)?;
        non_negative("acquisition_cost", self.acquisition_cost)
    }
}

// Health records

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: String,
    pub animal_id: String,
    pub record_date: NaiveDate,
    pub record_type: HealthRecordType,
    pub description: String,
    pub medicine: Option<String>,
    pub dosage: Option<String>,
    pub administered_by: Option<String>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHealthRecord {
    pub animal_id: String,
    pub record_date: NaiveDate,
    pub record_type: HealthRecordType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administered_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<HealthRecordType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administered_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for NewHealthRecord {
    fn validate(&self) -> Result<()> {
        required("animal_id", Some(self.animal_id.as_str()))?;
        required("description", Some(self.description.as_str()))?;
        non_negative("cost", self.cost)
    }
}

impl Validate for HealthRecordPatch {
    fn validate(&self) -> Result<()> {
        required("description", self.description.as_deref())?;
        non_negative("cost", self.cost)
    }
}

// Breeding records

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingRecord {
    pub id: String,
    pub female_id: String,
    pub male_id: Option<String>,
    pub breeding_date: NaiveDate,
    pub breeding_type: String,
    pub expected_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub success: Option<bool>,
    pub offspring_count: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBreedingRecord {
    pub female_id: String,
    pub breeding_date: NaiveDate,
    pub breeding_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub male_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offspring_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreedingRecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub male_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breeding_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breeding_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offspring_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn non_negative_count(field: &str, value: Option<i64>) -> Result<()> {
    non_negative(field, value.map(|v| v as f64))
}

impl Validate for NewBreedingRecord {
    fn validate(&self) -> Result<()> {
        required("female_id", Some(self.female_id.as_str()))?;
        required("breeding_type", Some(self.breeding_type.as_str()))?;
        non_negative_count("offspring_count", self.offspring_count)
    }
}

impl Validate for BreedingRecordPatch {
    fn validate(&self) -> Result<()> {
        required("breeding_type", self.breeding_type.as_deref())?;
        non_negative_count("offspring_count", self.offspring_count)
    }
}

// Feeding records

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingRecord {
    pub id: String,
    pub animal_id: String,
    pub feed_type: String,
    pub quantity: Option<f64>,
    pub quantity_unit: String,
    pub feeding_date: NaiveDate,
    pub cost: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedingRecord {
    pub animal_id: String,
    pub feed_type: String,
    pub feeding_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedingRecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feeding_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for NewFeedingRecord {
    fn validate(&self) -> Result<()> {
        required("animal_id", Some(self.animal_id.as_str()))?;
        required("feed_type", Some(self.feed_type.as_str()))?;
        non_negative("quantity", self.quantity)?;
        non_negative("cost", self.cost)
    }
}

impl Validate for FeedingRecordPatch {
    fn validate(&self) -> Result<()> {
        required("feed_type", self.feed_type.as_deref())?;
        non_negative("quantity", self.quantity)?;
        non_negative("cost", self.cost)
    }
}

// Financial records

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: String,
    pub farm_id: String,
    pub animal_id: Option<String>,
    pub transaction_date: NaiveDate,
    pub transaction_type: TransactionType,
    pub category: String,
    pub amount: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFinancialRecord {
    pub farm_id: String,
    pub transaction_date: NaiveDate,
    pub transaction_type: TransactionType,
    pub category: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for NewFinancialRecord {
    fn validate(&self) -> Result<()> {
        required("farm_id", Some(self.farm_id.as_str()))?;
        required("category", Some(self.category.as_str()))?;
        non_negative("amount", Some(self.amount))
    }
}

impl Validate for FinancialRecordPatch {
    fn validate(&self) -> Result<()> {
        required("category", self.category.as_deref())?;
        non_negative("amount", self.amount)
    }
}

// Tasks

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub farm_id: String,
    pub animal_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub farm_id: String,
    pub title: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl Validate for NewTask {
    fn validate(&self) -> Result<()> {
        required("farm_id", Some(self.farm_id.as_str()))?;
        required("title", Some(self.title.as_str()))
    }
}

impl Validate for TaskPatch {
    fn validate(&self) -> Result<()> {
        required("title", self.title.as_deref())
    }
}

// Analytics

/// Backends may report empty aggregates as null.
fn null_as_zero<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    #[serde(deserialize_with = "null_as_zero")]
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub period: String,
    #[serde(deserialize_with = "null_as_zero")]
    pub income: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub expenses: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub profit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatistic {
    pub record_type: String,
    #[serde(deserialize_with = "null_as_zero")]
    pub count: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub total_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreedingStatistics {
    pub success_rate: f64,
    pub total_offspring: i64,
    pub avg_gestation: f64,
}

#[derive(Deserialize, Default)]
struct BreedingStatisticsRow {
    #[serde(default, deserialize_with = "null_as_zero")]
    success_rate: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    total_offspring: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    avg_gestation: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(BreedingStatisticsRow),
    Many(Vec<BreedingStatisticsRow>),
}

/// Accepts a single object or a one-row set, as table-returning procedures
/// come back as arrays.
impl<'de> Deserialize<'de> for BreedingStatistics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let row = match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(row) => row,
            OneOrMany::Many(rows) => rows.into_iter().next().unwrap_or_default(),
        };
        Ok(BreedingStatistics {
            success_rate: row.success_rate,
            total_offspring: row.total_offspring,
            avg_gestation: row.avg_gestation,
        })
    }
}

/// All four analytics reports for one farm and timeframe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FarmReport {
    pub livestock_by_category: Vec<CategoryCount>,
    pub financial_summary: Vec<FinancialPeriod>,
    pub health_statistics: Vec<HealthStatistic>,
    pub breeding_statistics: BreedingStatistics,
}
