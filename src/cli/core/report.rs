use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{BreedingStatistics, CategoryCount, FinancialPeriod, HealthStatistic};
use crate::core::query::key::Timeframe;
use crate::core::records::Analytics;
use crate::services::Services;
use crate::utils::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    Livestock,
    Finance,
    Health,
    Breeding,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Limit the report to one farm
    #[arg(short, long)]
    farm: Option<String>,

    /// Grouping for the financial summary: daily, weekly, monthly or yearly
    #[arg(short, long, default_value_t = Timeframe::Monthly)]
    timeframe: Timeframe,

    /// Print only one section
    #[arg(long, value_enum)]
    only: Option<Section>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

pub async fn execute(args: ReportArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let analytics = Analytics::new(services.client(), args.farm.as_deref(), args.timeframe);

    let Some(section) = args.only else {
        let report = analytics.report(&cancel).await?;
        match args.format {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Table => {
                print_livestock(&report.livestock_by_category);
                print_finance(&report.financial_summary, args.timeframe);
                print_health(&report.health_statistics);
                print_breeding(&report.breeding_statistics);
            }
        }
        return Ok(());
    };

    match section {
        Section::Livestock => {
            let data = require(analytics.livestock_by_category(&cancel).await)?;
            match args.format {
                OutputFormat::Json => print_json(&data)?,
                OutputFormat::Table => print_livestock(&data),
            }
        }
        Section::Finance => {
            let data = require(analytics.financial_summary(&cancel).await)?;
            match args.format {
                OutputFormat::Json => print_json(&data)?,
                OutputFormat::Table => print_finance(&data, args.timeframe),
            }
        }
        Section::Health => {
            let data = require(analytics.health_statistics(&cancel).await)?;
            match args.format {
                OutputFormat::Json => print_json(&data)?,
                OutputFormat::Table => print_health(&data),
            }
        }
        Section::Breeding => {
            let data = require(analytics.breeding_statistics(&cancel).await)?;
            match args.format {
                OutputFormat::Json => print_json(&data)?,
                OutputFormat::Table => print_breeding(&data),
            }
        }
    }

    Ok(())
}

fn print_livestock(counts: &[CategoryCount]) {
    println!("🐑 Active livestock by category");
    if counts.is_empty() {
        println!("  No active animals\n");
        return;
    }
    let mut table = Table::new(["Category", "Count"]);
    for count in counts {
        table.row([count.category.clone(), count.count.to_string()]);
    }
    table.print();
    println!("  Total: {}\n", counts.iter().map(|c| c.count).sum::<i64>());
}

fn print_finance(periods: &[FinancialPeriod], timeframe: Timeframe) {
    println!("💰 Financial summary ({})", timeframe);
    if periods.is_empty() {
        println!("  No transactions\n");
        return;
    }
    let mut table = Table::new(["Period", "Income", "Expenses", "Profit"]);
    for period in periods {
        table.row([
            period.period.clone(),
            format!("{:.2}", period.income),
            format!("{:.2}", period.expenses),
            format!("{:.2}", period.profit),
        ]);
    }
    table.print();
    let profit: f64 = periods.iter().map(|p| p.profit).sum();
    println!("  Total profit: {:.2}\n", profit);
}

fn print_health(stats: &[HealthStatistic]) {
    println!("💉 Health records by type");
    if stats.is_empty() {
        println!("  No health records\n");
        return;
    }
    let mut table = Table::new(["Type", "Count", "Total cost"]);
    for stat in stats {
        table.row([
            stat.record_type.clone(),
            stat.count.to_string(),
            format!("{:.2}", stat.total_cost),
        ]);
    }
    table.print();
    println!();
}

fn print_breeding(stats: &BreedingStatistics) {
    println!("🍼 Breeding");
    println!("  Success rate:       {:.1}%", stats.success_rate);
    println!("  Total offspring:    {}", stats.total_offspring);
    println!("  Average gestation:  {:.1} days", stats.avg_gestation);
}
