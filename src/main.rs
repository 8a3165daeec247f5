use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use attendance_report::{
    attendance,
    config::Config,
    db::{self, PgStore},
    http::{self, AppState},
    params::ReportQuery,
    report::{self, ReportRequest},
    store::Scope,
};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "attendance-report")]
#[command(about = "Attendance reporting service for campus lecturers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo campus with lecturers, classes and attendance
    Seed,
    /// Run the HTTP API
    Serve {
        /// Overrides ATTENDANCE_BIND
        #[arg(long)]
        bind: Option<String>,
    },
    /// Build a bucketed attendance report for one lecturer
    Report {
        #[arg(long)]
        lecturer: Uuid,
        /// year, month or week
        #[arg(long, default_value = "month")]
        filter: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        week: Option<i32>,
        #[arg(long)]
        class: Option<Uuid>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the attendance summary for a lecturer as JSON
    Summary {
        #[arg(long)]
        lecturer: Uuid,
        #[arg(long)]
        class: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Serve { bind } => {
            let config = config.with_bind(bind);
            info!(max_connections = config.max_connections, "Starting attendance report server");
            let state = AppState::new(Arc::new(PgStore::new(pool)));
            http::serve(state, &config.bind).await?;
        }
        Commands::Report {
            lecturer,
            filter,
            year,
            month,
            week,
            class,
            format,
            out,
        } => {
            let query = ReportQuery {
                lecturer_id: Some(lecturer.to_string()),
                filter: Some(filter),
                year: Some(year.to_string()),
                month: month.map(|value| value.to_string()),
                week: week.map(|value| value.to_string()),
                class_id: class.map(|value| value.to_string()),
            };
            let request = ReportRequest::parse(None, &query)?;
            let store = PgStore::new(pool);
            let entries = report::generate_report(&store, &request).await?;

            let rendered = match format {
                OutputFormat::Markdown => report::render_markdown(&request, &entries).into_bytes(),
                OutputFormat::Csv => {
                    let mut buffer = Vec::new();
                    report::write_csv(&mut buffer, &entries)?;
                    buffer
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{}", String::from_utf8_lossy(&rendered)),
            }
        }
        Commands::Summary { lecturer, class } => {
            let store = PgStore::new(pool);
            let summary = attendance::summary(&store, &Scope::new(lecturer, class)).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
