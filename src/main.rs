use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use herdbook::cli::{
    animals, breeding, cache, categories, config, farms, feeding, finance, health, init, report, tasks,
};
use herdbook::config::Config;
use herdbook::services::Services;
use herdbook::signal_handler::ShutdownSignal;
use herdbook::utils::logging::init_logging;

#[derive(Parser)]
#[command(name = "herdbook")]
#[command(about = "Keep livestock records: farms, animals, health, breeding, feeding, finance and tasks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the configured store and check the connection
    Init(init::InitArgs),

    /// Manage farms
    Farms(farms::FarmsArgs),

    /// Manage livestock categories
    Categories(categories::CategoriesArgs),

    /// Manage animals
    Animals(animals::AnimalsArgs),

    /// Health records: treatments, vaccinations, checkups
    Health(health::HealthArgs),

    /// Breeding records
    Breeding(breeding::BreedingArgs),

    /// Feeding records
    Feeding(feeding::FeedingArgs),

    /// Income and expense records
    Finance(finance::FinanceArgs),

    /// Farm and animal tasks
    Tasks(tasks::TasksArgs),

    /// Farm statistics over a timeframe
    Report(report::ReportArgs),

    /// Manage the query cache
    Cache(cache::CacheArgs),

    /// Show or change configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let app_config = Config::load(cli.config.as_deref())?;

    // Configuration commands never open the backend
    if let Commands::Config(args) = cli.command {
        return config::execute(args, &app_config, cli.config.as_deref()).await;
    }

    let shutdown = ShutdownSignal::new();
    let listener = shutdown.listen();
    let services = Services::with_shutdown(app_config, shutdown.clone())?;

    let result = match cli.command {
        Commands::Init(args) => init::execute(args, &services).await,
        Commands::Farms(args) => farms::execute(args, &services).await,
        Commands::Categories(args) => categories::execute(args, &services).await,
        Commands::Animals(args) => animals::execute(args, &services).await,
        Commands::Health(args) => health::execute(args, &services).await,
        Commands::Breeding(args) => breeding::execute(args, &services).await,
        Commands::Feeding(args) => feeding::execute(args, &services).await,
        Commands::Finance(args) => finance::execute(args, &services).await,
        Commands::Tasks(args) => tasks::execute(args, &services).await,
        Commands::Report(args) => report::execute(args, &services).await,
        Commands::Cache(args) => cache::execute(args, &services).await,
        Commands::Config(args) => config::execute(args, &services.config(), cli.config.as_deref()).await,
    };

    services.shutdown();
    listener.abort();
    if shutdown.is_shutdown_requested() {
        debug!("Exited after shutdown request");
    }

    result
}
