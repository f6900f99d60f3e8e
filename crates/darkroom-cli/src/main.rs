mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use commands::{Context, EXIT_DOCUMENT_ERROR, EXIT_FAILURE, EXIT_RUNTIME_MISSING};
use darkroom_core::InstallerConfig;
use darkroom_remote::SourceConfig;
use darkroom_schema::AccelerationCategory;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_INSTALL_DIR: &str = "./immich-app";

#[derive(Debug, Parser)]
#[command(
    name = "darkroom",
    version,
    about = "Guided installer and hardware acceleration configurator for a self-hosted photo library"
)]
struct Cli {
    /// Install directory holding docker-compose.yml and .env.
    #[arg(long, global = true)]
    dir: Option<String>,

    /// Path to the config file (default: ~/.config/darkroom/config.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Release base URL or local directory to fetch resources from.
    #[arg(long, global = true)]
    source: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    /// Answer yes to every confirmation and take menu defaults.
    #[arg(short, long, default_value_t = false, global = true)]
    yes: bool,

    /// Treat the host as a WSL guest regardless of detection.
    #[arg(long, default_value_t = false, global = true, conflicts_with = "no_wsl")]
    wsl: bool,

    /// Treat the host as native regardless of detection.
    #[arg(long, default_value_t = false, global = true)]
    no_wsl: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CategoryArg {
    All,
    Transcoding,
    Inference,
}

impl CategoryArg {
    fn categories(self) -> Vec<AccelerationCategory> {
        match self {
            Self::All => AccelerationCategory::ALL.to_vec(),
            Self::Transcoding => vec![AccelerationCategory::Transcoding],
            Self::Inference => vec![AccelerationCategory::Inference],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CategoryName {
    Transcoding,
    Inference,
}

impl From<CategoryName> for AccelerationCategory {
    fn from(name: CategoryName) -> Self {
        match name {
            CategoryName::Transcoding => Self::Transcoding,
            CategoryName::Inference => Self::Inference,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download the compose and environment files, then configure acceleration.
    Install {
        /// Overwrite an existing docker-compose.yml without asking.
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Directory for uploaded photos (UPLOAD_LOCATION).
        #[arg(long)]
        upload_location: Option<String>,
        /// Directory for database files (DB_DATA_LOCATION).
        #[arg(long)]
        db_data_location: Option<String>,
        /// Time zone identifier (TZ).
        #[arg(long)]
        timezone: Option<String>,
        /// Release tag to run and download (IMMICH_VERSION).
        #[arg(long)]
        release: Option<String>,
        /// Database password; generated when omitted.
        #[arg(long)]
        db_password: Option<String>,
        /// Transcoding directive: auto, skip, disable, or a profile.
        #[arg(long)]
        transcoding: Option<String>,
        /// Inference directive: auto, skip, disable, or a profile.
        #[arg(long)]
        inference: Option<String>,
        /// Do not configure hardware acceleration.
        #[arg(long, default_value_t = false)]
        no_accel: bool,
        /// Start the stack once the files are written.
        #[arg(long, default_value_t = false)]
        start: bool,
    },
    /// Detect, choose and apply hardware acceleration profiles.
    Accel {
        /// Which category to configure.
        #[arg(value_enum, default_value = "all")]
        category: CategoryArg,
        /// Transcoding directive: auto, skip, disable, or a profile.
        #[arg(long)]
        transcoding: Option<String>,
        /// Inference directive: auto, skip, disable, or a profile.
        #[arg(long)]
        inference: Option<String>,
    },
    /// Remove hardware acceleration from one category.
    Disable {
        #[arg(value_enum)]
        category: CategoryName,
    },
    /// Show host evidence and eligible profiles without changing anything.
    Detect,
    /// Start the stack with docker compose.
    Up,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(id = "out_dir", value_name = "DIR", default_value = "man")]
        out_dir: PathBuf,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DARKROOM_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let needs_runtime = matches!(cli.command, Commands::Install { .. } | Commands::Up);
    if needs_runtime && std::env::var("DARKROOM_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = darkroom_runtime::check_compose_prereqs(&darkroom_runtime::SystemHost);
        if !missing.is_empty() {
            eprintln!("error: {}", darkroom_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_RUNTIME_MISSING);
        }
    }

    let config = match &cli.config {
        Some(path) => InstallerConfig::load(&expand_tilde(path)),
        None => InstallerConfig::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let release = match &cli.command {
        Commands::Install { release, .. } => release.clone(),
        _ => None,
    }
    .or_else(|| config.install.version.clone());
    let source = resolve_source(cli.source.as_deref(), &config, release.as_deref());
    let dir = cli
        .dir
        .as_deref()
        .map(expand_tilde)
        .or_else(|| config.install.directory.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_DIR));
    let wsl = if cli.wsl {
        Some(true)
    } else if cli.no_wsl {
        Some(false)
    } else {
        None
    };
    tracing::debug!("install directory {}, source {}", dir.display(), source.url);

    let ctx = Context::new(dir, config, source, cli.json, cli.yes, wsl);

    let result = match cli.command {
        Commands::Install {
            force,
            upload_location,
            db_data_location,
            timezone,
            release: _,
            db_password,
            transcoding,
            inference,
            no_accel,
            start,
        } => commands::install::run(
            &ctx,
            &commands::install::InstallArgs {
                force,
                upload_location,
                db_data_location,
                timezone,
                release,
                db_password,
                transcoding,
                inference,
                no_accel,
                start,
            },
        ),
        Commands::Accel {
            category,
            transcoding,
            inference,
        } => commands::accel::run(
            &ctx,
            &category.categories(),
            transcoding.as_deref(),
            inference.as_deref(),
        ),
        Commands::Disable { category } => commands::disable::run(&ctx, category.into()),
        Commands::Detect => commands::detect::run(&ctx),
        Commands::Up => commands::up::run(&ctx),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { out_dir } => commands::man_pages::run::<Cli>(&out_dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("document error:") {
                EXIT_DOCUMENT_ERROR
            } else if msg.starts_with("runtime error: container runtime unavailable")
                || msg.starts_with("container runtime unavailable")
            {
                EXIT_RUNTIME_MISSING
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

/// `--source` beats `DARKROOM_SOURCE`, which beats the config file. A
/// pinned release without an explicit source downloads that release.
fn resolve_source(
    flag: Option<&str>,
    config: &InstallerConfig,
    release: Option<&str>,
) -> SourceConfig {
    if let Some(url) = flag {
        return SourceConfig::new(url);
    }
    if let Ok(url) = std::env::var("DARKROOM_SOURCE") {
        if !url.trim().is_empty() {
            return SourceConfig::new(&url);
        }
    }
    if config.source != SourceConfig::default() {
        return config.source.clone();
    }
    match release {
        Some(tag) if tag.starts_with('v') => SourceConfig::for_release(tag),
        _ => config.source.clone(),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
