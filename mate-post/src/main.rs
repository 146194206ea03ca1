//! mate-post - Generate and publish social media content

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use libmarketmate::logging;
use libmarketmate::service::pipeline::{PipelineOutcome, PublishRequest};
use libmarketmate::service::MarketMateService;
use libmarketmate::types::AdBrief;
use libmarketmate::{ContentCategory, GeneratedContent, MarketMateError, Platform};
use std::io::{IsTerminal, Read};

#[derive(Parser, Debug)]
#[command(name = "mate-post")]
#[command(version, about = "Generate and publish social media content")]
#[command(long_about = r#"Generate post copy and a matching stock image with a generative AI model,
then publish it to Facebook, Instagram or LinkedIn.

EXAMPLES:
    # Preview generated content without publishing
    mate-post generate "new vegan bakery opening" --category "Food & Cooking"

    # Publish to a Facebook page and boost it with an ad
    mate-post publish "spring sale, 20% off" --platform facebook --user alice --ad

    # Prompt from stdin, JSON result for scripting
    echo "we are hiring" | mate-post publish --platform linkedin --user alice --format json

    # Structured ad copy
    mate-post ad-copy --product "Oat latte" --audience "students" --goal "store visits"

EXIT CODES:
    0 - Success
    1 - Provider rejected the post, or any other error
    2 - Credential problem
    3 - Invalid input (empty prompt, unknown category or platform)
    4 - Generative AI overloaded or out of quota
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate copy and an image without publishing
    Generate {
        /// Prompt (reads from stdin if not provided)
        prompt: Option<String>,

        /// Content category, e.g. "Food & Cooking" (default: General)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Generate content and publish it to one platform
    Publish {
        /// Prompt (reads from stdin if not provided)
        prompt: Option<String>,

        /// Target platform (facebook, instagram, linkedin)
        #[arg(short, long)]
        platform: String,

        /// User whose stored credentials are used
        #[arg(short, long, env = "MARKETMATE_USER")]
        user: String,

        /// Content category, e.g. "Food & Cooking" (default: General)
        #[arg(short, long)]
        category: Option<String>,

        /// Create a Facebook ad around the published post
        #[arg(long)]
        ad: bool,
    },

    /// Generate structured ad copy for a product
    AdCopy {
        #[arg(long)]
        product: String,

        #[arg(long)]
        audience: String,

        #[arg(long)]
        offer: Option<String>,

        #[arg(long)]
        goal: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_default(cli.verbose);

    match run(cli).await {
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

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Generate { prompt, category } => {
            let prompt = read_prompt(prompt)?;
            let category = parse_category(category.as_deref())?;

            let service = MarketMateService::new().await?;
            let (content, warnings) = service.pipeline()?.generate(&prompt, category).await?;

            for warning in &warnings {
                eprintln!("Warning: {}", warning);
            }
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&content)?),
                OutputFormat::Text => print_content(&content),
            }
            Ok(0)
        }
        Commands::Publish {
            prompt,
            platform,
            user,
            category,
            ad,
        } => {
            let prompt = read_prompt(prompt)?;
            let category = parse_category(category.as_deref())?;
            let platform: Platform = platform.parse().map_err(MarketMateError::Precondition)?;
            if ad && platform != Platform::Facebook {
                return Err(MarketMateError::Precondition(
                    "--ad is only supported for facebook".to_string(),
                )
                .into());
            }

            let service = MarketMateService::new().await?;
            let mut request = PublishRequest::new(user, platform, prompt).category(category);
            if ad {
                request = request.with_ad();
            }

            let outcome = service.pipeline()?.run(&request).await?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => print_outcome(platform, &outcome),
            }
            Ok(if outcome.is_success() { 0 } else { 1 })
        }
        Commands::AdCopy {
            product,
            audience,
            offer,
            goal,
        } => {
            if product.trim().is_empty() {
                return Err(
                    MarketMateError::Precondition("Product cannot be empty".to_string()).into(),
                );
            }
            let brief = AdBrief {
                product,
                audience,
                offer,
                goal,
            };

            let service = MarketMateService::new().await?;
            let copy = service.content_generator()?.generate_ad_copy(&brief).await?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&copy)?),
                OutputFormat::Text => {
                    println!("{}", copy.caption);
                    println!();
                    println!("Hashtags: {}", copy.hashtags.join(" "));
                    println!("Keywords: {}", copy.keywords.join(", "));
                    for tip in &copy.targeting_tips {
                        println!("  - {}", tip);
                    }
                }
            }
            Ok(0)
        }
    }
}

/// Prompt from the argument, or from stdin when piped
fn read_prompt(arg: Option<String>) -> Result<String> {
    let prompt = match arg {
        Some(prompt) => prompt,
        None if !std::io::stdin().is_terminal() => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read prompt from stdin")?;
            buffer
        }
        None => String::new(),
    };

    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(MarketMateError::Precondition("Prompt cannot be empty".to_string()).into());
    }
    Ok(prompt)
}

fn parse_category(label: Option<&str>) -> Result<ContentCategory> {
    Ok(ContentCategory::from_optional(label).map_err(MarketMateError::Precondition)?)
}

fn print_content(content: &GeneratedContent) {
    println!("{}", content.caption);
    println!();
    println!("Image: {}", content.image_url);
    println!("  ({})", content.image_description);
    if !content.hashtags.is_empty() {
        println!("Hashtags: {}", content.hashtags.join(" "));
    }
}

fn print_outcome(platform: Platform, outcome: &PipelineOutcome) {
    if outcome.publish.success {
        println!(
            "✓ {}: {}",
            platform,
            outcome.publish.post_id.as_deref().unwrap_or("")
        );
    } else {
        println!(
            "✗ {}: {}",
            platform,
            outcome.publish.error.as_deref().unwrap_or("Unknown error")
        );
    }
    println!("  image: {}", outcome.content.image_url);

    if let Some(ad) = &outcome.ad {
        if ad.success {
            println!(
                "✓ ad: {} (ad set {})",
                ad.ad_id.as_deref().unwrap_or(""),
                ad.ad_set_id.as_deref().unwrap_or("")
            );
        } else {
            println!("✗ ad: {}", ad.error.as_deref().unwrap_or("Unknown error"));
        }
    }
    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }
}
