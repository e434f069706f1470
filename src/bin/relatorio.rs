use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use relatorio::{
    CUSTOM_COVER_VARIANT, ConfigUpdate, Configuration, ConfigurationStore, CoverPreset,
    CoverSettings, ItemPatch, JsonFileStore, ReportError, ReportGenerator, ReportSettings,
    SessionInput, image_data_uri,
};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

const GENERATION_FAILED: &str = "Erro ao gerar o relatório. Tente novamente.";

#[derive(Parser, Debug)]
#[command(name = "relatorio", version, about = "Therapy session report generator")]
struct Cli {
    /// Configuration JSON (introduction, catalog, cover).
    #[arg(long, global = true, default_value = "relatorio.json")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default configuration.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Replace the introduction text with the contents of a file.
    SetIntro {
        #[arg(long)]
        file: PathBuf,
    },
    /// Edit one catalog item.
    SetItem(SetItemArgs),
    /// Store an image file inline on a catalog item.
    UploadImage {
        #[arg(long)]
        id: u32,
        #[arg(long)]
        file: PathBuf,
    },
    /// Choose the cover background.
    SetCover(SetCoverArgs),
    /// Generate the PDF report for a session.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct SetItemArgs {
    #[arg(long)]
    id: u32,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, conflicts_with = "clear_image")]
    image_url: Option<String>,
    /// Remove the item's image.
    #[arg(long)]
    clear_image: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SetCoverArgs {
    /// One of: mandala, nature, lotus, crystals, sacred, meditation.
    #[arg(long)]
    preset: Option<String>,
    /// Custom background URL, path or data URI.
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Session JSON (therapistName, clientName, sessionDate, sessionTime, selectedFrequencies).
    #[arg(long)]
    session: PathBuf,

    /// Directory the PDF is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Layout and rendering overrides (JSON).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("{err:#}");
    }

    let store = JsonFileStore::new(&cli.config);
    let result = match cli.cmd {
        Command::Init { force } => cmd_init(&store, force).await,
        Command::SetIntro { file } => cmd_set_intro(&store, &file).await,
        Command::SetItem(args) => cmd_set_item(&store, args).await,
        Command::UploadImage { id, file } => cmd_upload_image(&store, id, &file).await,
        Command::SetCover(args) => cmd_set_cover(&store, args).await,
        Command::Generate(args) => {
            return match cmd_generate(&store, args).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    tracing::debug!(error = ?err, "generation failed");
                    match err
                        .downcast_ref::<ReportError>()
                        .and_then(ReportError::precondition_notice)
                    {
                        Some(notice) => eprintln!("{notice}"),
                        None => {
                            eprintln!("{GENERATION_FAILED}");
                            eprintln!("{err:#}");
                        }
                    }
                    ExitCode::FAILURE
                }
            };
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

async fn cmd_init(store: &JsonFileStore, force: bool) -> anyhow::Result<()> {
    if !force && tokio::fs::try_exists(store.path()).await.unwrap_or(false) {
        anyhow::bail!(
            "'{}' already exists (use --force to overwrite)",
            store.path().display()
        );
    }
    store.save(&Configuration::default()).await?;
    println!("wrote {}", store.path().display());
    Ok(())
}

async fn cmd_set_intro(store: &JsonFileStore, file: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("read introduction '{}'", file.display()))?;
    store.write(ConfigUpdate::IntroductionText(text)).await?;
    Ok(())
}

async fn cmd_set_item(store: &JsonFileStore, args: SetItemArgs) -> anyhow::Result<()> {
    let image_url = if args.clear_image {
        Some(None)
    } else {
        args.image_url.map(Some)
    };
    let patch = ItemPatch {
        title: args.title,
        description: args.description,
        image_url,
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to change for item {}", args.id);
    }
    store
        .write(ConfigUpdate::Item { id: args.id, patch })
        .await?;
    Ok(())
}

async fn cmd_upload_image(store: &JsonFileStore, id: u32, file: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("read image '{}'", file.display()))?;
    let uri = image_data_uri(&bytes)?;
    let patch = ItemPatch {
        image_url: Some(Some(uri)),
        ..ItemPatch::default()
    };
    store.write(ConfigUpdate::Item { id, patch }).await?;
    println!("stored {} bytes on item {id}", bytes.len());
    Ok(())
}

async fn cmd_set_cover(store: &JsonFileStore, args: SetCoverArgs) -> anyhow::Result<()> {
    let settings = match (args.preset, args.image) {
        (Some(id), _) => CoverPreset::find(&id)
            .with_context(|| format!("unknown cover preset '{id}'"))?
            .settings(),
        (None, Some(image)) => CoverSettings {
            background_image: image,
            background_type: CUSTOM_COVER_VARIANT.to_string(),
        },
        (None, None) => anyhow::bail!("either --preset or --image is required"),
    };
    store.write(ConfigUpdate::CoverSettings(settings)).await?;
    Ok(())
}

async fn cmd_generate(store: &JsonFileStore, args: GenerateArgs) -> anyhow::Result<()> {
    let session: SessionInput = read_json(&args.session, "session").await?;
    let settings: ReportSettings = match &args.settings {
        Some(path) => read_json(path, "settings").await?,
        None => ReportSettings::default(),
    };

    let generator = ReportGenerator::with_defaults(settings)?;
    let issued_on = chrono::Local::now().date_naive();
    let report = generator
        .generate_from_store(store, &session, issued_on, &args.out_dir)
        .await?;

    println!("{}", report.path.display());
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {what} JSON"))
}
