//! CLI entry point for `emailclipper`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use emailclipper::config::{self, Config};
use emailclipper::host::{EmlFile, MailHost};
use emailclipper::i18n;
use emailclipper::note::BodyFormat;
use emailclipper::prompt::{PromptOptions, PromptUi};
use emailclipper::recent::JsonFileStore;
use emailclipper::service::client::NoteClient;
use emailclipper::service::connect::cancel_pair;
use emailclipper::service::locator::ServiceLocator;
use emailclipper::service::transport::HttpTransport;
use emailclipper::session::{self, ClipOutcome, Session, SessionContext};

#[derive(Parser)]
#[command(name = "emailclipper", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Language (en, es). Defaults to system locale.
    #[arg(long, value_name = "LANG", global = true)]
    lang: Option<String>,

    /// First port to probe for the clipper service
    #[arg(long, value_name = "PORT", global = true)]
    base_port: Option<u16>,

    /// Clipper API token
    #[arg(long, env = "EMAILCLIPPER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an .eml message to Joplin
    Clip {
        file: PathBuf,
        /// Notebook id or title
        #[arg(short, long)]
        notebook: Option<String>,
        /// Tag title (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Attachment file name to include (repeatable)
        #[arg(short, long = "attach", value_name = "NAME")]
        attachments: Vec<String>,
        /// Include every attachment
        #[arg(long, conflicts_with = "attachments")]
        all_attachments: bool,
        /// Do not ask anything; use defaults for missing choices
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the note that would be created
    Preview {
        file: PathBuf,
    },
    /// Look for the clipper service once
    Ping,
    /// List notebooks
    Notebooks {
        #[arg(long)]
        json: bool,
    },
    /// List tags
    Tags {
        #[arg(long)]
        json: bool,
    },
    /// Show or initialize the configuration file
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Detect language early from --lang arg or system env, before clap processes --help.
fn detect_lang_early() -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for (i, arg) in args.iter().enumerate() {
        let code = if arg == "--lang" {
            args.get(i + 1).map(String::as_str)
        } else {
            arg.strip_prefix("--lang=")
        };
        if let Some(lang) = code.and_then(i18n::Lang::from_code) {
            return lang;
        }
    }
    i18n::detect_system_lang()
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command()
        .about(i18n::app_about())
        .long_about(i18n::app_long_about());

    let subcommands: Vec<clap::Command> = cmd
        .get_subcommands()
        .map(|sub| {
            let about = match sub.get_name() {
                "clip" => i18n::help_cmd_clip(),
                "preview" => i18n::help_cmd_preview(),
                "ping" => i18n::help_cmd_ping(),
                "notebooks" => i18n::help_cmd_notebooks(),
                "tags" => i18n::help_cmd_tags(),
                "config" => i18n::help_cmd_config(),
                "completions" => i18n::help_cmd_completions(),
                "manpage" => i18n::help_cmd_manpage(),
                _ => return sub.clone(),
            };
            sub.clone().about(about)
        })
        .collect();

    for sub in subcommands {
        cmd = cmd.mut_subcommand(sub.get_name(), |_| sub.clone());
    }
    cmd
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Detect language BEFORE clap parsing so --help is localized
    i18n::set_lang(detect_lang_early());

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let mut config = config::load_config();
    if let Some(port) = cli.base_port {
        config.service.base_port = port;
    }
    if cli.token.is_some() {
        config.service.token = cli.token.clone();
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Clip {
            file,
            notebook,
            tags,
            attachments,
            all_attachments,
            yes,
        } => {
            let options = PromptOptions {
                notebook,
                tags: (!tags.is_empty()).then_some(tags),
                attachments,
                all_attachments,
                yes,
            };
            cmd_clip(&file, options, &config).await
        }
        Commands::Preview { file } => cmd_preview(&file, &config).await,
        Commands::Ping => cmd_ping(&config).await,
        Commands::Notebooks { json } => cmd_notebooks(json, &config).await,
        Commands::Tags { json } => cmd_tags(json, &config).await,
        Commands::Config { init } => cmd_config(init, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let log_file = config::log_file_path(config);
        let file_name = log_file.file_name().unwrap_or_default();
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn check_file(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("{}: {}", i18n::err_file_not_found(), path.display());
    }
    Ok(())
}

fn locator(config: &Config) -> anyhow::Result<ServiceLocator> {
    let transport = Arc::new(HttpTransport::new()?);
    Ok(ServiceLocator::new(transport, config.service.clone()))
}

/// One discovery pass; fails when the service is not running.
async fn connected_client(config: &Config) -> anyhow::Result<NoteClient> {
    let mut locator = locator(config)?;
    if locator.locate().await.is_none() {
        anyhow::bail!("{}", i18n::msg_service_not_found());
    }
    Ok(NoteClient::from_locator(&locator)?)
}

/// Run a full clipping session for one message file.
async fn cmd_clip(path: &Path, options: PromptOptions, config: &Config) -> anyhow::Result<()> {
    check_file(path)?;

    let host = EmlFile::new(path);
    let ui = PromptUi::new(options);
    let store = JsonFileStore::new(config::recent_picks_path(config));
    let session = Session {
        host: &host,
        ui: &ui,
        store: &store,
        format: BodyFormat {
            include_date: config.note.include_date,
        },
        retry_delay: config.service.retry_delay(),
    };

    // Ctrl-C closes the dialog: observed at every wait point of the session.
    let (canceller, mut signal) = cancel_pair();
    // A second Ctrl-C exits without waiting for the session to wind down.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let mut locator = locator(config)?;
    let mut context = SessionContext::default();
    let outcome = session::clip_message(&session, &mut locator, &mut context, &mut signal).await;
    ui.clear_status();

    match outcome? {
        ClipOutcome::Created(note) => {
            println!("{}: {}", i18n::msg_note_created(), note.id);
        }
        ClipOutcome::Cancelled => {
            eprintln!("{}", i18n::msg_cancelled());
        }
    }
    Ok(())
}

/// Print the note body without contacting the service.
async fn cmd_preview(path: &Path, config: &Config) -> anyhow::Result<()> {
    check_file(path)?;

    let message = EmlFile::new(path).download().await?;
    let format = BodyFormat {
        include_date: config.note.include_date,
    };
    println!("# {}\n", message.note_title());
    println!("{}", format.render(&message, &[]).trim_end());

    if !message.attachments.is_empty() {
        println!("\n{}:", i18n::msg_attachments());
        for att in &message.attachments {
            println!("  - {} ({}, {})", att.file_name, att.content_type, att.size_human());
        }
    }
    Ok(())
}

async fn cmd_ping(config: &Config) -> anyhow::Result<()> {
    let mut locator = locator(config)?;
    match locator.locate().await {
        Some(port) => {
            println!("{}", i18n::status_ready_on_port(port));
            Ok(())
        }
        None => anyhow::bail!("{}", i18n::msg_service_not_found()),
    }
}

async fn cmd_notebooks(json: bool, config: &Config) -> anyhow::Result<()> {
    let client = connected_client(config).await?;
    let notebooks = client.list_notebooks().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notebooks)?);
        return Ok(());
    }
    for nb in emailclipper::model::note::Notebook::flatten(&notebooks) {
        println!("  {:<34} {}", nb.id, nb.label);
    }
    Ok(())
}

async fn cmd_tags(json: bool, config: &Config) -> anyhow::Result<()> {
    let client = connected_client(config).await?;
    let tags = client.list_tags().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }
    for tag in &tags {
        println!("  {:<34} {}", tag.id, tag.title);
    }
    Ok(())
}

fn cmd_config(init: bool, config: &Config) -> anyhow::Result<()> {
    if init {
        let path = config::save_config(config)?;
        println!("{}", path.display());
        return Ok(());
    }

    match config::config_file_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("-"),
    }
    println!("# log: {}", config::log_file_path(config).display());
    println!("# recent notebooks: {}", config::recent_picks_path(config).display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emailclipper", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
