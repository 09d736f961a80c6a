// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use speranto::app_config::{self, Config, DEFAULT_CONFIG_FILE, FileConfig};
use speranto::app_controller::Controller;
use speranto::file_utils::FileManager;
use speranto::providers::ProviderKind;
use speranto::translation::tasks::{LogObserver, ProgressObserver, TaskObserver};

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Mistral,
    Anthropic,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Ollama => ProviderKind::Ollama,
            CliProvider::OpenAI => ProviderKind::OpenAI,
            CliProvider::Mistral => ProviderKind::Mistral,
            CliProvider::Anthropic => ProviderKind::Anthropic,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate source files (default command)
    #[command(alias = "files")]
    Translate(TranslateArgs),

    /// Translate database tables into per-language translation tables
    Db(TranslateArgs),

    /// Generate shell completions for speranto
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct TranslateArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Source language code (e.g., 'en')
    #[arg(short, long = "source-lang")]
    source_lang: Option<String>,

    /// Target language codes, comma separated (e.g., 'es,fr,pt-BR')
    #[arg(short = 'l', long = "target-langs", value_delimiter = ',')]
    target_langs: Option<Vec<String>>,

    /// Directory containing source files
    #[arg(short = 'i', long)]
    source_dir: Option<PathBuf>,

    /// Output directory pattern, [lang] is replaced by the language code
    #[arg(short = 'o', long)]
    target_dir: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Name outputs after the language code (en.json -> es.json)
    #[arg(long)]
    use_lang_code_as_filename: bool,

    /// API key for hosted providers (defaults to LLM_API_KEY)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Directory holding per-language instruction files ({lang}.md)
    #[arg(long)]
    instructions_dir: Option<PathBuf>,

    /// Translate everything, ignoring existing translations
    #[arg(long)]
    retranslate: bool,

    /// Process one file, language and unit at a time
    #[arg(long)]
    sequential: bool,

    /// Units translated at once per file and language
    #[arg(long)]
    concurrency: Option<usize>,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Write the effective options to the config file and exit
    #[arg(long)]
    as_config: bool,

    /// Log progress instead of drawing progress bars
    #[arg(long)]
    no_progress: bool,
}

impl TranslateArgs {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Override config values with the options given on the command line
    fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(source_lang) = &self.source_lang {
            config.source_language = source_lang.clone();
        }
        if let Some(target_langs) = &self.target_langs {
            config.target_languages = target_langs
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
        }
        if let Some(provider) = &self.provider {
            config.provider = provider.clone().into();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(dir) = &self.instructions_dir {
            config.instructions_dir = Some(dir.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone().into();
        }
        config.retranslate |= self.retranslate;
        config.sequential |= self.sequential;

        match (&mut config.files, &self.source_dir) {
            (Some(files), _) => {
                if let Some(source_dir) = &self.source_dir {
                    files.source_dir = source_dir.clone();
                }
                if let Some(target_dir) = &self.target_dir {
                    files.target_dir = target_dir.clone();
                }
                files.use_lang_code_as_filename |= self.use_lang_code_as_filename;
            }
            (None, Some(source_dir)) => {
                let target_dir = self
                    .target_dir
                    .clone()
                    .unwrap_or_else(|| source_dir.join(app_config::LANG_PLACEHOLDER).to_string_lossy().to_string());
                let mut files = FileConfig::new(source_dir.clone(), target_dir);
                files.use_lang_code_as_filename = self.use_lang_code_as_filename;
                config.files = Some(files);
            }
            (None, None) => {}
        }
    }
}

/// speranto - incremental LLM translation
///
/// Translates Markdown, JSON, JavaScript/TypeScript key-value files and
/// database rows into several languages, reusing earlier translations.
#[derive(Parser, Debug)]
#[command(name = "speranto")]
#[command(version)]
#[command(about = "Incremental LLM translation for content files and databases")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "speranto translates content files and database rows with an LLM and only sends what changed.

EXAMPLES:
    speranto                                    # Translate files using speranto.json
    speranto -l es,fr -i content/en -o 'content/[lang]'
    speranto -p ollama -m llama3.1 --sequential # Use a local model, one request at a time
    speranto --retranslate                      # Ignore existing translations
    speranto -l de,it --as-config               # Save the options to speranto.json
    speranto db -c speranto.db.json             # Translate database tables
    speranto completions bash > speranto.bash   # Generate bash completions

CONFIGURATION:
    Configuration is read from speranto.json by default. Command line options
    override the file. The API key may also be given with LLM_API_KEY.

SUPPORTED PROVIDERS:
    mistral   - Mistral API (default, requires API key)
    openai    - OpenAI API (requires API key)
    anthropic - Anthropic API (requires API key)
    ollama    - Local Ollama server, pulls missing models")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color of a level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "speranto", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_files(args).await,
        Some(Commands::Db(args)) => run_database(args).await,
        None => run_files(cli.args).await,
    }
}

/// Load the config file, apply command line overrides and the log level
fn load_config(args: &TranslateArgs) -> Result<Config> {
    let config_path = args.config_path();
    let mut config = if FileManager::file_exists(&config_path) {
        Config::from_file(&config_path)?
    } else if args.config.is_some() && !args.as_config {
        return Err(anyhow!("Config file not found: {:?}", config_path));
    } else {
        if !args.as_config {
            warn!("Config file not found at {:?}, using defaults", config_path);
        }
        Config::default()
    };

    args.apply_to(&mut config);
    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

/// Save the effective config when `--as-config` is given
fn save_as_config(args: &TranslateArgs, config: &Config) -> Result<bool> {
    if !args.as_config {
        return Ok(false);
    }
    let path = args.config_path();
    config.save(&path)?;
    info!("Configuration written to {:?}", path);
    Ok(true)
}

fn observer(args: &TranslateArgs) -> Arc<dyn TaskObserver> {
    if args.no_progress {
        Arc::new(LogObserver)
    } else {
        Arc::new(ProgressObserver::new())
    }
}

async fn run_files(args: TranslateArgs) -> Result<()> {
    let config = load_config(&args)?;
    if save_as_config(&args, &config)? {
        return Ok(());
    }

    let controller = Controller::with_config(config)?.with_observer(observer(&args));
    let summary = controller.translate_files().await.context("File translation failed")?;

    info!(
        "Files: {} written, {} unchanged, {} failed",
        summary.written(),
        summary.skipped(),
        summary.failed()
    );
    if summary.has_failures() {
        return Err(anyhow!("{} file translations failed", summary.failed()));
    }
    Ok(())
}

async fn run_database(args: TranslateArgs) -> Result<()> {
    let config = load_config(&args)?;
    if save_as_config(&args, &config)? {
        return Ok(());
    }

    let controller = Controller::with_config(config)?.with_observer(observer(&args));
    let summary = controller.translate_database().await.context("Database translation failed")?;

    info!(
        "Rows: {} translated, {} already translated, {} failed",
        summary.translated(),
        summary.skipped(),
        summary.failed()
    );
    if summary.has_failures() {
        return Err(anyhow!("Database translation finished with failures"));
    }
    Ok(())
}
