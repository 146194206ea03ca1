//! mate-ad - Create a Facebook ad set and ad for a published post
//!
//! Request/response entry point: the caller identity comes from the host, the
//! request is JSON, the result is AdResult JSON on stdout.

use clap::Parser;
use libmarketmate::callable::{
    create_ad_set_and_ad, CallableCode, CallableError, CallerContext, CreateAdRequest,
};
use libmarketmate::logging;
use libmarketmate::service::MarketMateService;
use libmarketmate::AdResult;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "mate-ad")]
#[command(version)]
#[command(about = "Create a Facebook ad set and ad for a published post")]
#[command(long_about = "\
mate-ad - Create a Facebook ad set and ad for a published post

DESCRIPTION:
    Reads a JSON request, loads the caller's Facebook Page and Facebook Ads
    credentials, optionally cross-posts to Instagram, then creates an ad set
    and an ad pointing at the post.

REQUEST:
    {
      \"post_id\": \"456\",              required
      \"image_url\": \"https://...\",    optional, enables the Instagram cross-post
      \"caption\": \"...\",              optional
      \"daily_budget_cents\": 20000,    optional
      \"targeting\": {\"countries\": [\"US\"], \"age_min\": 21, \"age_max\": 45},
      \"campaign_id\": \"...\"           optional, overrides the stored campaign
    }

USAGE:
    echo '{\"post_id\":\"456\"}' | mate-ad --caller alice
    mate-ad --caller alice --request request.json

OUTPUT:
    AdResult JSON on stdout. Errors are {\"code\": ..., \"message\": ...} on stdout.

EXIT CODES:
    0  - Ad created
    1  - Internal error, or the provider rejected the ad (AdResult has success=false)
    3  - invalid-argument
    9  - failed-precondition (credentials missing)
    16 - unauthenticated
")]
struct Cli {
    /// Authenticated user making the request
    #[arg(long, env = "MARKETMATE_CALLER")]
    caller: Option<String>,

    /// Request JSON file (reads from stdin if not provided)
    #[arg(long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_default(cli.verbose);

    match run(cli).await {
        Ok(result) => {
            print_json(&result);
            std::process::exit(if result.success { 0 } else { 1 });
        }
        Err(e) => {
            error!("{}", e);
            print_json(&e);
            std::process::exit(e.code.exit_code());
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to serialize output: {}", e),
    }
}

fn internal(e: impl std::fmt::Display) -> CallableError {
    CallableError::new(CallableCode::Internal, e.to_string())
}

fn read_request(path: Option<&PathBuf>) -> Result<CreateAdRequest, CallableError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            CallableError::new(
                CallableCode::InvalidArgument,
                format!("Failed to read request file {}: {}", path.display(), e),
            )
        })?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(internal)?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        return Ok(CreateAdRequest::default());
    }
    serde_json::from_str(&raw).map_err(|e| {
        CallableError::new(
            CallableCode::InvalidArgument,
            format!("Invalid request JSON: {}", e),
        )
    })
}

async fn run(cli: Cli) -> Result<AdResult, CallableError> {
    let ctx = CallerContext {
        user_id: cli.caller,
    };
    ctx.require_user()?;

    let request = read_request(cli.request.as_ref())?;
    debug!(?request, "Parsed ad request");

    let service = MarketMateService::new().await.map_err(internal)?;
    let orchestrator = service.ad_orchestrator().map_err(internal)?;
    let store = service.credentials();

    create_ad_set_and_ad(&ctx, request, store.as_ref(), &orchestrator).await
}
