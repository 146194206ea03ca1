//! mate-creds - Credential vault for MarketMate
//!
//! Stores one credential record per user and provider, shows what is stored
//! without revealing tokens, and checks records against the provider.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libmarketmate::credentials::CredentialDocument;
use libmarketmate::logging;
use libmarketmate::service::MarketMateService;
use libmarketmate::types::Platform;
use libmarketmate::{Credential, MarketMateError, ProviderType};
use std::io::{IsTerminal, Read};

#[derive(Parser)]
#[command(name = "mate-creds")]
#[command(version, about = "Manage MarketMate provider credentials")]
#[command(long_about = r#"Manage per-user provider credentials.

EXAMPLES:
    # Facebook page
    mate-creds set facebook --user alice --token "$PAGE_TOKEN" --page-id 1234567890

    # Facebook ads (token read from stdin)
    echo "$ADS_TOKEN" | mate-creds set facebook_ads --user alice --stdin \
        --ad-account-id 999 --campaign-id 120200000

    # What is stored
    mate-creds list --user alice
    mate-creds show instagram --user alice --format json

    # Check tokens and permissions against the provider
    mate-creds test facebook --user alice
    mate-creds test --all --user alice

PROVIDERS:
    facebook      --page-id
    facebook_ads  --ad-account-id --campaign-id
    instagram     --instagram-user-id
    linkedin      --linkedin-user-id
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store credentials for a provider, replacing any existing record
    Set {
        /// Provider (facebook, facebook_ads, instagram, linkedin)
        provider: String,

        /// Owner of the credentials
        #[arg(short, long, env = "MARKETMATE_USER")]
        user: String,

        /// Access token
        #[arg(long, conflicts_with = "stdin")]
        token: Option<String>,

        /// Read the access token from stdin (for automation/agents)
        #[arg(long)]
        stdin: bool,

        #[arg(long)]
        page_id: Option<String>,

        #[arg(long)]
        instagram_user_id: Option<String>,

        #[arg(long)]
        linkedin_user_id: Option<String>,

        #[arg(long)]
        ad_account_id: Option<String>,

        #[arg(long)]
        campaign_id: Option<String>,
    },

    /// Show one stored record with the token masked
    Show {
        provider: String,

        #[arg(short, long, env = "MARKETMATE_USER")]
        user: String,

        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        #[arg(value_parser = ["text", "json"])]
        format: String,
    },

    /// List stored records (without showing tokens)
    List {
        #[arg(short, long, env = "MARKETMATE_USER")]
        user: String,
    },

    /// Check stored credentials against the provider
    Test {
        /// Provider to test; use --all for every stored record
        provider: Option<String>,

        #[arg(short, long, env = "MARKETMATE_USER")]
        user: String,

        /// Test all stored records
        #[arg(short, long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_default(cli.verbose);

    match run_command(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<MarketMateError>()
                .map(MarketMateError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run_command(command: Commands) -> Result<i32> {
    match command {
        Commands::Set {
            provider,
            user,
            token,
            stdin,
            page_id,
            instagram_user_id,
            linkedin_user_id,
            ad_account_id,
            campaign_id,
        } => {
            let provider = parse_provider(&provider)?;
            let token = if stdin { read_token_stdin()? } else { token };
            let document = CredentialDocument {
                provider: provider.to_string(),
                access_token: token,
                page_id,
                instagram_user_id,
                linkedin_user_id,
                ad_account_id,
                campaign_id,
            };
            set_credentials(&user, provider, document).await
        }
        Commands::Show {
            provider,
            user,
            format,
        } => show_credentials(&user, parse_provider(&provider)?, &format).await,
        Commands::List { user } => list_credentials(&user).await,
        Commands::Test {
            provider,
            user,
            all,
        } => {
            if all {
                test_all_credentials(&user).await
            } else if let Some(provider) = provider {
                test_credentials(&user, parse_provider(&provider)?).await
            } else {
                bail!("Either specify a provider or use --all");
            }
        }
    }
}

fn parse_provider(s: &str) -> Result<ProviderType> {
    Ok(s.parse::<ProviderType>().map_err(MarketMateError::from)?)
}

fn read_token_stdin() -> Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        bail!("--stdin was given but stdin is a terminal");
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read token from stdin")?;
    Ok(Some(buffer.trim().to_string()))
}

/// First and last few characters only
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn describe(credential: &Credential) -> String {
    match credential {
        Credential::Facebook(c) => format!("page {}", c.page_id),
        Credential::FacebookAds(c) => {
            format!("ad account {}, campaign {}", c.ad_account_id, c.campaign_id)
        }
        Credential::Instagram(c) => format!("instagram user {}", c.instagram_user_id),
        Credential::LinkedIn(c) => format!("linkedin member {}", c.linkedin_user_id),
    }
}

async fn set_credentials(user: &str, provider: ProviderType, document: CredentialDocument) -> Result<i32> {
    let credential = Credential::from_document(document).map_err(MarketMateError::from)?;

    let service = MarketMateService::new().await?;
    service
        .credentials()
        .put(user, provider, &credential)
        .await?;

    println!("✓ Stored {} credentials for {} ({})", provider, user, describe(&credential));
    Ok(0)
}

async fn show_credentials(user: &str, provider: ProviderType, format: &str) -> Result<i32> {
    let service = MarketMateService::new().await?;
    let credential = service.credentials().require(user, provider).await?;

    if format == "json" {
        let mut document = credential.to_document();
        document.access_token = document.access_token.as_deref().map(mask);
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        println!("{} ({})", provider, describe(&credential));
        println!("  token: {}", mask(credential.access_token().expose()));
    }
    Ok(0)
}

async fn list_credentials(user: &str) -> Result<i32> {
    let service = MarketMateService::new().await?;
    let credentials = service.credentials().get_all(user).await?;

    if credentials.is_empty() {
        println!("No credentials stored for {}", user);
        return Ok(0);
    }

    for credential in &credentials {
        println!("✓ {}: {}", credential.provider_type(), describe(credential));
    }
    Ok(0)
}

async fn test_credentials(user: &str, provider: ProviderType) -> Result<i32> {
    let service = MarketMateService::new().await?;
    let credential = service.credentials().require(user, provider).await?;
    let ok = check(&service, &credential).await?;
    Ok(if ok { 0 } else { 2 })
}

async fn test_all_credentials(user: &str) -> Result<i32> {
    let service = MarketMateService::new().await?;
    let credentials = service.credentials().get_all(user).await?;
    if credentials.is_empty() {
        println!("No credentials stored for {}", user);
        return Ok(0);
    }

    let mut all_ok = true;
    for credential in &credentials {
        all_ok &= check(&service, credential).await?;
    }
    Ok(if all_ok { 0 } else { 2 })
}

/// Run the provider's credential check and print the outcome
async fn check(service: &MarketMateService, credential: &Credential) -> Result<bool> {
    let provider = credential.provider_type();
    let platform = match provider {
        ProviderType::Facebook => Platform::Facebook,
        ProviderType::Instagram => Platform::Instagram,
        ProviderType::LinkedIn => Platform::LinkedIn,
        ProviderType::FacebookAds => {
            println!("✓ {}: record is complete ({})", provider, describe(credential));
            return Ok(true);
        }
    };

    let publisher = service.publishers()?.get(platform)?;
    let result = publisher
        .validate_credentials(credential.access_token(), credential.target_id())
        .await;

    if result.ok {
        let account = result.account.as_deref().unwrap_or(credential.target_id());
        println!("✓ {}: credentials valid ({})", provider, account);
    } else {
        println!(
            "✗ {}: {}",
            provider,
            result.error.as_deref().unwrap_or("validation failed")
        );
    }
    Ok(result.ok)
}
