use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
use vendor_directory_core::{
    format_verified_date, render, review_queue, vendor_profile, Catalog, Locality, QueryOptions,
    RequestParams, VendorId, VendorType, FRESHNESS_WINDOW_DAYS,
};

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const LOG_ENV: &str = "VENDOR_DIRECTORY_LOG";

#[derive(Debug, Parser)]
#[command(name = "vd")]
#[command(about = "Local vendor directory CLI")]
struct Cli {
    /// Catalog file (.json, .yaml or .yml). Defaults to the bundled catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Reference instant for staleness, RFC3339 UTC. Defaults to the system clock.
    #[arg(long)]
    now: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Cards(CardsArgs),
    Vendor(VendorArgs),
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Debug, Args)]
struct CardsArgs {
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    max_cards: Option<usize>,
    /// Ambient request query string, e.g. `from=annies&city=sf`.
    #[arg(long, default_value = "")]
    query: String,
}

#[derive(Debug, Args)]
struct VendorArgs {
    id: String,
    #[arg(long, default_value = "")]
    from: String,
}

#[derive(Debug, Subcommand)]
enum CatalogCommand {
    Validate,
    List,
    Review,
}

#[derive(Debug, Serialize)]
struct CatalogListEntry<'a> {
    position: usize,
    id: &'a VendorId,
    name: &'a str,
    city: &'a Locality,
    #[serde(rename = "type")]
    vendor_type: VendorType,
    score: u8,
    verified: String,
    referral_slugs: Vec<&'a str>,
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let catalog = load_catalog(cli.catalog.as_ref())?;
    let now = parse_optional_rfc3339(cli.now.as_deref())?;

    match cli.command {
        Command::Cards(args) => run_cards(&catalog, args, now),
        Command::Vendor(args) => run_vendor(&catalog, &args, now),
        Command::Catalog { command } => run_catalog(&catalog, &command, now),
    }
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog> {
    tracing::debug!(path = ?path, "loading vendor catalog");
    match path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display())),
        None => Catalog::builtin().context("bundled catalog is invalid"),
    }
}

fn run_cards(catalog: &Catalog, args: CardsArgs, now: OffsetDateTime) -> Result<()> {
    let options = QueryOptions {
        from: args.from,
        city: args.city,
        category: args.category,
        max_cards: args.max_cards,
    };
    let params = RequestParams::from_query_string(&args.query);
    let listing = render(catalog, &options, &params, now);
    emit_json(serde_json::to_value(&listing).context("failed to serialize card listing")?)
}

fn run_vendor(catalog: &Catalog, args: &VendorArgs, now: OffsetDateTime) -> Result<()> {
    let profile = vendor_profile(catalog, &args.id, &args.from, now)?;
    emit_json(serde_json::to_value(&profile).context("failed to serialize vendor profile")?)
}

fn run_catalog(catalog: &Catalog, command: &CatalogCommand, now: OffsetDateTime) -> Result<()> {
    match command {
        CatalogCommand::Validate => emit_json(serde_json::json!({
            "valid": true,
            "localities": catalog.localities().map(Locality::as_str).collect::<Vec<_>>(),
            "records": catalog.len(),
        })),
        CatalogCommand::List => {
            let records = catalog
                .records()
                .enumerate()
                .map(|(index, record)| CatalogListEntry {
                    position: index + 1,
                    id: &record.id,
                    name: &record.name,
                    city: &record.city,
                    vendor_type: record.vendor_type,
                    score: record.score,
                    verified: format_verified_date(record.verified),
                    referral_slugs: record.notes.keys().map(String::as_str).collect(),
                })
                .collect::<Vec<_>>();
            emit_json(serde_json::json!({ "records": records }))
        }
        CatalogCommand::Review => {
            let stale = review_queue(catalog, now);
            emit_json(serde_json::json!({
                "window_days": FRESHNESS_WINDOW_DAYS,
                "stale": stale,
            }))
        }
    }
}

fn parse_optional_rfc3339(value: Option<&str>) -> Result<OffsetDateTime> {
    match value {
        Some(raw) => parse_rfc3339(raw),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    let parsed = OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .with_context(|| format!("invalid RFC3339 UTC timestamp: {value}"))?;

    if parsed.offset() != time::UtcOffset::UTC {
        return Err(anyhow!("timestamp MUST use UTC offset Z (received: {value})"));
    }

    Ok(parsed)
}
