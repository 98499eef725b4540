use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use collage_server::{serve, CaptureBatch, CollageClient, ServerConfig, StoreOverrides};
use collage_store::Artifact;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "collage", version, about = "Compose chart images into a collage")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "COLLAGE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Upload a batch of chart images, then print the collection.
    Submit(SubmitArgs),
    /// Print the collection.
    List(ListArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// TOML config file.
    #[arg(long, env = "COLLAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file.
    #[arg(long, env = "COLLAGE_BIND")]
    bind: Option<SocketAddr>,

    /// Remote media service endpoint; switches the store to http.
    #[arg(long, env = "COLLAGE_STORE_ENDPOINT")]
    store_endpoint: Option<String>,

    /// Folder receiving finished collages (http store only).
    #[arg(long, env = "COLLAGE_STORE_FOLDER")]
    store_folder: Option<String>,

    /// Bearer token for the media service (http store only).
    #[arg(long, env = "COLLAGE_STORE_TOKEN", hide_env_values = true)]
    store_token: Option<String>,
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    /// Server base URL.
    #[arg(long, env = "COLLAGE_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Refuse images that are not exactly one 400x400 tile.
    #[arg(long, default_value_t = false)]
    strict_tiles: bool,

    /// Chart images, in placement order; the last becomes the base.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Server base URL.
    #[arg(long, env = "COLLAGE_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.cmd {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Submit(args) => cmd_submit(args).await,
        Command::List(args) => cmd_list(args).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = args.bind {
        config = config.with_bind(bind);
    }
    config = config
        .with_store_overrides(StoreOverrides {
            endpoint: args.store_endpoint,
            folder: args.store_folder,
            api_token: args.store_token,
        })
        .context("apply store options")?;

    serve(config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Cannot listen for shutdown signal");
        }
    })
    .await
    .context("run server")
}

async fn cmd_submit(args: SubmitArgs) -> anyhow::Result<()> {
    let mut batch = CaptureBatch::from_paths(&args.files).await?;
    if args.strict_tiles {
        batch = batch.strict_tiles()?;
    }

    let client = CollageClient::new(&args.server)?;
    let submission = client.submit(&batch).await.context("submit batch")?;

    eprintln!(
        "composed {} ({}x{}) from {} images",
        submission.artifact.id,
        submission.artifact.width,
        submission.artifact.height,
        batch.len()
    );
    if let Some(warnings) = &submission.warnings {
        for failure in &warnings.failures {
            eprintln!("warning: {} was not deleted: {}", failure.id, failure.reason);
        }
    }

    print_listing(&client.list().await.context("list collages")?);
    Ok(())
}

async fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    let client = CollageClient::new(&args.server)?;
    print_listing(&client.list().await.context("list collages")?);
    Ok(())
}

fn print_listing(artifacts: &[Artifact]) {
    for artifact in artifacts {
        println!(
            "{}\t{}x{}\t{}",
            artifact.id, artifact.width, artifact.height, artifact.url
        );
    }
}
