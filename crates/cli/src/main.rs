mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genpanel_client::{GenerationApi, HttpSourceImageResolver};
use genpanel_core::{GenerationDataReference, MediaType};
use genpanel_store::{
    FileStorage, FormDefaults, GenerationContext, PanelState, RemixState, SetDataInput,
    StaticEnvironment,
};

use config::ClientConfig;

/// Drive the generation panel stores from the command line.
#[derive(Parser)]
#[command(name = "genpanel", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the panel, optionally loading data for a reference
    /// (`modelVersion:42`, `modelVersion:42@3`, `modelVersions:1,2`, `image:7`).
    Open {
        reference: Option<GenerationDataReference>,
        /// Route the panel is opened from.
        #[arg(long)]
        route: Option<String>,
        /// Treat the viewport as compact.
        #[arg(long)]
        compact: bool,
    },
    /// Push generation data from a JSON file into the panel.
    Replay {
        file: PathBuf,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        compact: bool,
    },
    /// Inspect or change the persisted form defaults.
    Form {
        #[command(subcommand)]
        action: FormCommand,
    },
    /// Inspect or clear the persisted remix slot.
    Remix {
        #[command(subcommand)]
        action: RemixCommand,
    },
}

#[derive(Subcommand)]
enum FormCommand {
    Show,
    /// Reset to defaults, keeping the media type.
    Reset,
    SetType { media_type: MediaType },
    SetEngine { engine: String },
}

#[derive(Subcommand)]
enum RemixCommand {
    Show,
    Clear,
}

#[derive(Serialize)]
struct Snapshot {
    panel: PanelState,
    form: FormDefaults,
    remix: RemixState,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    init_tracing(config.log_json);

    tracing::debug!(
        api_url = %config.api_url,
        state_dir = %config.state_dir.display(),
        "Loaded client configuration",
    );

    match cli.command {
        Command::Open {
            reference,
            route,
            compact,
        } => {
            let ctx = build_context(&config, route, compact).await?;
            ctx.panel
                .open(reference)
                .await
                .context("failed to open generation panel")?;
            tracing::debug!(cached = ctx.fetcher.len().await, "Generation data cache");
            print_json(&snapshot(&ctx).await)?;
        }
        Command::Replay {
            file,
            route,
            compact,
        } => {
            let raw = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let input: SetDataInput = serde_json::from_slice(&raw)
                .with_context(|| format!("{} is not valid generation data", file.display()))?;

            let ctx = build_context(&config, route, compact).await?;
            ctx.panel
                .set_data(input)
                .await
                .context("failed to replay generation data")?;
            print_json(&snapshot(&ctx).await)?;
        }
        Command::Form { action } => {
            let ctx = build_context(&config, None, false).await?;
            match action {
                FormCommand::Show => {}
                FormCommand::Reset => ctx.form.reset().await,
                FormCommand::SetType { media_type } => ctx.form.set_type(media_type).await,
                FormCommand::SetEngine { engine } => ctx.form.set_engine(engine).await,
            }
            print_json(&ctx.form.snapshot().await)?;
        }
        Command::Remix { action } => {
            let ctx = build_context(&config, None, false).await?;
            if let RemixCommand::Clear = action {
                ctx.remix.clear().await;
            }
            print_json(&ctx.remix.snapshot().await)?;
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "genpanel=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command output.
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_context(
    config: &ClientConfig,
    route: Option<String>,
    compact: bool,
) -> anyhow::Result<GenerationContext> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let api = GenerationApi::with_client(http.clone(), config.api_url.clone());
    let resolver = HttpSourceImageResolver::new(http).with_base_url(config.api_url.clone());
    let storage = FileStorage::new(config.state_dir.clone())
        .context("invalid state directory")?;
    let environment = StaticEnvironment::new(
        compact || config.compact_viewport,
        route.unwrap_or_else(|| config.route.clone()),
    );

    let ctx = GenerationContext::new(
        Arc::new(api),
        Arc::new(resolver),
        Arc::new(storage),
        Arc::new(environment),
    )
    .await
    .context("failed to load persisted generation state")?;

    Ok(ctx)
}

async fn snapshot(ctx: &GenerationContext) -> Snapshot {
    Snapshot {
        panel: ctx.panel.snapshot().await,
        form: ctx.form.snapshot().await,
        remix: ctx.remix.snapshot().await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
