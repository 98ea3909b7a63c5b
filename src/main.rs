// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use dramatis::app_config::{self, Config, LlmBackend};
use dramatis::segmentation::VoicingMode;
use dramatis::AppController;

/// CLI Wrapper for LlmBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLlmBackend {
    Local,
    #[value(name = "lmstudio")]
    LMStudio,
    Ollama,
    #[value(name = "openai")]
    OpenAI,
}

impl From<CliLlmBackend> for LlmBackend {
    fn from(cli_backend: CliLlmBackend) -> Self {
        match cli_backend {
            CliLlmBackend::Local => LlmBackend::Local,
            CliLlmBackend::LMStudio => LlmBackend::LMStudio,
            CliLlmBackend::Ollama => LlmBackend::Ollama,
            CliLlmBackend::OpenAI => LlmBackend::OpenAI,
        }
    }
}

/// CLI Wrapper for VoicingMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliVoicingMode {
    Narrator,
    NarratorAndSpeaker,
    Cast,
}

impl From<CliVoicingMode> for VoicingMode {
    fn from(cli_mode: CliVoicingMode) -> Self {
        match cli_mode {
            CliVoicingMode::Narrator => VoicingMode::Narrator,
            CliVoicingMode::NarratorAndSpeaker => VoicingMode::NarratorAndSpeaker,
            CliVoicingMode::Cast => VoicingMode::Cast,
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
    /// Segment a text file and attribute speakers
    Analyze {
        /// Plain text file to analyse
        #[arg(value_name = "TEXT_FILE")]
        text: PathBuf,

        /// Script file to write (defaults to <TEXT_FILE stem>.script.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Voicing mode
        #[arg(short, long, value_enum)]
        mode: Option<CliVoicingMode>,

        /// Run only the rules-based segmentation, without any LLM call
        #[arg(long)]
        rules_only: bool,

        /// Force overwrite of an existing script file
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Resolve ambiguous speakers of a saved script
    Resolve {
        /// Script file to update in place
        #[arg(value_name = "SCRIPT_FILE")]
        script: PathBuf,
    },

    /// Validate speaker names and merge character aliases of a saved script
    Refine {
        /// Script file to update in place
        #[arg(value_name = "SCRIPT_FILE")]
        script: PathBuf,
    },

    /// Generate shell completions for dramatis
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// dramatis - dialogue segmentation and speaker attribution
///
/// Turns narrative prose into a script of speaker-tagged lines using pattern
/// rules and an OpenAI-compatible LLM endpoint.
#[derive(Parser, Debug)]
#[command(name = "dramatis")]
#[command(version)]
#[command(about = "Dialogue segmentation and speaker attribution for audiobook scripts")]
#[command(long_about = "dramatis splits prose into narration and dialogue lines and attributes each line to a speaker.

EXAMPLES:
    dramatis analyze novel.txt                        # Full analysis with the default config
    dramatis analyze novel.txt --rules-only           # Segmentation only, no LLM needed
    dramatis analyze novel.txt -m narrator-and-speaker -o out.json
    dramatis -p lmstudio resolve novel.script.json    # Resolve ambiguous speakers
    dramatis refine novel.script.json                 # Merge character aliases
    dramatis completions bash > dramatis.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED BACKENDS (all OpenAI-compatible):
    local     - Local server on http://localhost:4247/v1 (default)
    lmstudio  - LM Studio on http://localhost:1234/v1
    ollama    - Ollama on http://localhost:11434/v1
    openai    - OpenAI API (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// LLM backend to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliLlmBackend>,

    /// Model name to request from the backend
    #[arg(long, global = true)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
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
        // The logger accepts everything; log::max_level does the filtering
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

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
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
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "dramatis", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Analyze {
            text,
            output,
            mode,
            rules_only,
            force_overwrite,
        } => {
            if let Some(mode) = mode {
                config.voicing_mode = mode.into();
            }
            let controller = AppController::with_config(config)?;
            controller.analyze(&text, output, force_overwrite, rules_only).await?;
        }
        Commands::Resolve { script } => {
            let controller = AppController::with_config(config)?;
            controller.resolve(&script).await?;
        }
        Commands::Refine { script } => {
            let controller = AppController::with_config(config)?;
            controller.refine(&script).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load or create the configuration, apply CLI overrides and validate it
fn load_config(options: &CommandLineOptions) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file: {}", options.config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", options.config_path);
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", options.config_path))?;
        config
    };

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.llm.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        let backend = config.llm.provider.clone();
        config.llm.provider_config_mut(&backend).model = model.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}
