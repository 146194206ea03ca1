use anyhow::{Context, Result};
use clap::Parser;
use libmarketmate::service::history::{HistoryQuery, DEFAULT_HISTORY_LIMIT};
use libmarketmate::service::MarketMateService;
use libmarketmate::{logging, ContentPost, ContentStatus, MarketMateError, Platform};

#[derive(Parser, Debug)]
#[command(name = "mate-history")]
#[command(version, about = "Show generated and published content history")]
#[command(long_about = r#"Show content history for a user, newest first.

EXAMPLES:
    # Last 10 entries (default)
    mate-history --user alice

    # More entries, one platform
    mate-history --user alice --limit 50 --platform facebook

    # Only failures
    mate-history --user alice --status failed

    # JSON output for scripting
    mate-history --user alice --format json | jq '.[] | .provider_post_id'

    # JSONL output (one JSON object per line)
    mate-history --user alice --format jsonl

    # Export to CSV
    mate-history --user alice --format csv > history.csv

OUTPUT FORMATS:
    text  - Human-readable text with timestamps and status (default)
    json  - JSON array
    jsonl - JSON lines, one object per line
    csv   - CSV with headers

EXIT CODES:
    0 - Success (including empty results)
    1 - Error
    3 - Invalid filter
"#)]
struct Args {
    /// User whose history is shown
    #[arg(short, long, env = "MARKETMATE_USER")]
    user: String,

    /// Filter by platform (facebook, instagram, linkedin)
    #[arg(short, long, value_name = "PLATFORM")]
    platform: Option<String>,

    /// Filter by status (draft, published, failed)
    #[arg(short, long, value_name = "STATUS")]
    #[arg(value_parser = ["draft", "published", "failed"])]
    status: Option<String>,

    /// Maximum number of entries to return
    #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT, value_name = "N")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl", "csv"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Quote a CSV field when it needs it
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn print_text(entries: &[ContentPost]) {
    for entry in entries {
        let dt = chrono::DateTime::from_timestamp(entry.created_at, 0)
            .unwrap_or_else(chrono::Utc::now);
        let timestamp = dt.format("%Y-%m-%d %H:%M:%S");

        let preview: String = entry.content.chars().take(60).collect();
        let preview = if preview.len() < entry.content.len() {
            format!("{}...", preview)
        } else {
            preview
        };

        println!("{} | {} | {}", timestamp, entry.id, preview);

        match entry.status {
            ContentStatus::Published => println!(
                "  ✓ {}: {}",
                entry.platform,
                entry.provider_post_id.as_deref().unwrap_or("")
            ),
            ContentStatus::Failed => println!(
                "  ✗ {}: {}",
                entry.platform,
                entry.error_message.as_deref().unwrap_or("failed")
            ),
            ContentStatus::Draft => println!("  · {}: draft", entry.platform),
        }
        if let Some(image_url) = &entry.image_url {
            println!("  image: {}", image_url);
        }
        println!();
    }
}

fn print_csv(entries: &[ContentPost]) {
    println!("id,timestamp,platform,category,status,provider_post_id,error,content");
    for entry in entries {
        println!(
            "{},{},{},{},{},{},{},{}",
            entry.id,
            entry.created_at,
            entry.platform,
            csv_field(entry.category.label()),
            entry.status,
            csv_field(entry.provider_post_id.as_deref().unwrap_or("")),
            csv_field(entry.error_message.as_deref().unwrap_or("")),
            csv_field(&entry.content)
        );
    }
}

async fn run(args: Args) -> Result<()> {
    let platform = args
        .platform
        .as_deref()
        .map(|p| p.parse::<Platform>().map_err(MarketMateError::Precondition))
        .transpose()?;
    let status = args.status.as_deref().map(ContentStatus::parse);

    let service = MarketMateService::new()
        .await
        .context("Failed to open the MarketMate database")?;

    let query = HistoryQuery {
        platform,
        status,
        limit: Some(args.limit),
    };
    let entries = service
        .history()
        .list(&args.user, &query)
        .await
        .context("Failed to query history")?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        "jsonl" => {
            for entry in &entries {
                println!("{}", serde_json::to_string(entry)?);
            }
        }
        "csv" => print_csv(&entries),
        _ => print_text(&entries),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_default(args.verbose);

    tracing::debug!("mate-history started with args: {:?}", args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<MarketMateError>()
            .map(MarketMateError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
