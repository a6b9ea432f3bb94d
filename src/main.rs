use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod export;
mod filter;
mod models;
mod report;
mod roles;
mod sampling;
mod seed;
mod source;

use crate::api::QaClient;
use crate::config::Config;
use crate::export::Exportable;
use crate::filter::FilterCriteria;
use crate::models::{AuditLogEntry, Portfolio, PortfolioComment, PortfolioUpdate};
use crate::sampling::{Percentage, Sampler, SamplingSession};

#[derive(Parser)]
#[command(name = "qa-review")]
#[command(about = "IQA/EQA sampling, verification and audit desk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a role holds a permission
    Can {
        #[arg(long)]
        role: String,
        #[arg(long)]
        permission: String,
    },
    /// Print the dashboard path for a role
    Dashboard {
        #[arg(long)]
        role: String,
    },
    /// Draw an IQA sample from assessment records
    Sample {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Assessment ids to sample; all loaded records when omitted
        #[arg(long = "id")]
        ids: Vec<String>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        percentage: u8,
        #[arg(long = "seed")]
        rng_seed: Option<u64>,
        #[arg(long)]
        reviewer: Option<String>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// List and filter assessment records
    Assessments {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        flagged: bool,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// List and filter the audit trail
    Audit {
        #[command(flatten)]
        origin: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// List and filter portfolio verification records
    Portfolios {
        #[command(flatten)]
        origin: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Set the verification status of a portfolio
    Verify {
        #[arg(long)]
        id: String,
        #[arg(long)]
        status: String,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Add a comment to a portfolio
    Comment {
        #[arg(long)]
        id: String,
        #[arg(long)]
        text: String,
    },
    /// Show headline quality metrics
    Metrics,
    /// Generate a markdown IQA report
    Report {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        audit_input: Option<PathBuf>,
        /// Draw a sample at this percentage before reporting
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        sample: Option<u8>,
        #[arg(long = "seed")]
        rng_seed: Option<u64>,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "iqa-report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Read records from a JSON file instead of the API
    #[arg(long)]
    input: Option<PathBuf>,
    /// Use the built-in demo records instead of the API
    #[arg(long, conflicts_with = "input")]
    demo: bool,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    status: Option<String>,
    /// Action type for audit entries, course for assessments, qualification for portfolios
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            search: self.search.clone(),
            status: self.status.clone(),
            kind: self.kind.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Text,
    Json,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    #[arg(long, default_value_t = 40)]
    rows_per_page: usize,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let role = config.role.as_deref();

    match cli.command {
        Commands::Can { role, permission } => {
            let granted = roles::has_permission(&role, &permission);
            println!("{}", if granted { "granted" } else { "denied" });
        }
        Commands::Dashboard { role } => {
            println!("{}", roles::dashboard_path(&role));
        }
        Commands::Sample {
            input,
            ids,
            percentage,
            rng_seed,
            reviewer,
            export,
        } => {
            roles::require(role, "sample_assessments")?;
            let percentage = Percentage::new(percentage)?;
            let records = source::load_assessments(input.as_deref())?;
            let mut selected = sampling::select_records(records, &ids);
            if selected.is_empty() {
                println!("No assessments matched the selection.");
                return Ok(());
            }

            let reviewer = reviewer.unwrap_or_else(|| config.reviewer.clone());
            let sampler = Sampler::from_seed_option(rng_seed.or(config.sampling_seed));
            let mut session = SamplingSession::new(sampler);
            let results = session.run(&mut selected, percentage, &reviewer);

            emit("IQA Sampling Results", &results, &export)?;
            tracing::info!(
                history = session.history().len(),
                "sampling session complete"
            );
        }
        Commands::Assessments {
            input,
            flagged,
            filter,
            export,
        } => {
            roles::require(role, "view_assessments")?;
            let records = source::load_assessments(input.as_deref())?;
            let mut records = filter.criteria().retain(records);
            if flagged {
                records.retain(|r| r.flagged);
            }
            emit("Assessments", &records, &export)?;
        }
        Commands::Audit {
            origin,
            filter,
            export,
        } => {
            roles::require(role, "view_audit_trail")?;
            let entries: Vec<AuditLogEntry> =
                load(&config, "audit trail", &origin, seed::audit_trail, |client| async move {
                    client.fetch_audit_trail().await
                })
                .await?;
            let entries = filter.criteria().retain(entries);
            emit("Audit Trail", &entries, &export)?;
        }
        Commands::Portfolios {
            origin,
            filter,
            export,
        } => {
            roles::require(role, "view_portfolios")?;
            let portfolios: Vec<Portfolio> =
                load(&config, "portfolios", &origin, seed::portfolios, |client| async move {
                    client.fetch_portfolios().await
                })
                .await?;
            let portfolios = filter.criteria().retain(portfolios);
            emit("Portfolio Verification", &portfolios, &export)?;
        }
        Commands::Verify {
            id,
            status,
            feedback,
        } => {
            roles::require(role, "verify_portfolios")?;
            if status.trim().is_empty() {
                anyhow::bail!("status must not be empty");
            }
            let client = QaClient::new(&config)?;
            let update = PortfolioUpdate {
                status: status.trim().to_string(),
                feedback,
            };
            let portfolio = client
                .update_portfolio(&id, &update)
                .await
                .with_context(|| format!("failed to update portfolio {id}"))?;
            println!(
                "Portfolio {} is now {}.",
                portfolio.id,
                portfolio.status.as_deref().unwrap_or(&update.status)
            );
        }
        Commands::Comment { id, text } => {
            roles::require(role, "comment_portfolios")?;
            if text.trim().is_empty() {
                anyhow::bail!("comment text must not be empty");
            }
            let client = QaClient::new(&config)?;
            let comment = PortfolioComment {
                id: None,
                author: Some(config.reviewer.clone()),
                comment: text.trim().to_string(),
                created_at: None,
            };
            let stored = client
                .add_portfolio_comment(&id, &comment)
                .await
                .with_context(|| format!("failed to comment on portfolio {id}"))?;
            match stored.and_then(|c| c.id) {
                Some(comment_id) => println!("Comment {comment_id} added to portfolio {id}."),
                None => println!("Comment added to portfolio {id}."),
            }
        }
        Commands::Metrics => {
            roles::require(role, "view_metrics")?;
            let client = QaClient::new(&config)?;
            match client.fetch_quality_metrics().await {
                Ok(metrics) => println!("{}", serde_json::to_string_pretty(&metrics)?),
                Err(err) => {
                    tracing::error!("metrics fetch failed: {err}");
                    eprintln!("error: could not load quality metrics: {err}");
                }
            }
        }
        Commands::Report {
            input,
            audit_input,
            sample,
            rng_seed,
            filter,
            out,
        } => {
            roles::require(role, "generate_reports")?;
            let criteria = filter.criteria();
            let label = criteria.describe();
            let records = source::load_assessments(input.as_deref())?;
            let mut records = criteria.retain(records);
            let audit: Vec<AuditLogEntry> =
                source::from_file_or(audit_input.as_deref(), seed::audit_trail)?;

            let mut session =
                SamplingSession::new(Sampler::from_seed_option(rng_seed.or(config.sampling_seed)));
            if let Some(percentage) = sample {
                roles::require(role, "sample_assessments")?;
                session.run(&mut records, Percentage::new(percentage)?, &config.reviewer);
            }

            let report = report::build_report(
                label.as_deref(),
                Utc::now().date_naive(),
                &records,
                session.history(),
                &audit,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// File, demo data, or the API, in that order. API failures degrade to an empty list.
async fn load<T, S, F, Fut>(
    config: &Config,
    what: &str,
    args: &SourceArgs,
    demo: S,
    fetch: F,
) -> anyhow::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    S: FnOnce() -> Vec<T>,
    F: FnOnce(QaClient) -> Fut,
    Fut: std::future::Future<Output = error::QaResult<Vec<T>>>,
{
    if let Some(path) = args.input.as_deref() {
        return source::read_json_list(path);
    }
    if args.demo {
        return Ok(demo());
    }
    let client = QaClient::new(config)?;
    Ok(source::fetch_or_empty(what, fetch(client)).await)
}

fn emit<T: Exportable>(title: &str, records: &[T], args: &ExportArgs) -> anyhow::Result<()> {
    let columns = export::columns_for::<T>(&args.columns);
    let rows = export::to_rows(records, &columns);

    let mut buffer: Vec<u8> = Vec::new();
    match args.format {
        Format::Csv => export::write_csv(&mut buffer, &columns, &rows)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut buffer, &export::to_json(&rows))?;
            buffer.push(b'\n');
        }
        Format::Text => {
            let pages = export::paginate(title, &columns, &rows, args.rows_per_page);
            buffer.extend_from_slice(pages.join("\n\n").as_bytes());
            buffer.push(b'\n');
        }
    }

    tracing::info!(title, rows = rows.len(), "export assembled");
    write_output(args.out.as_deref(), &buffer)
}

fn write_output(out: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Export written to {}.", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
