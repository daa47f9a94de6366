// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use memo_ocr::app_config::{self, Config};
use memo_ocr::{AzureRead, CancelToken, FileManager, ImagePayload, OcrError, OcrSequencer};

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
    /// Recognize text in an image file or every image in a directory
    Recognize(RecognizeArgs),

    /// Generate shell completions for memo-ocr
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RecognizeArgs {
    /// Image file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Read API endpoint, e.g. https://<resource>.cognitiveservices.azure.com/
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Subscription key for the Read API
    #[arg(short = 'k', long, env = "MEMO_OCR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Language hint (e.g. 'en', 'ja')
    #[arg(long)]
    language: Option<String>,

    /// Maximum number of status checks per image
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Delay between status checks in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Overall polling deadline per image in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Write <name>.txt files instead of printing to stdout
    #[arg(short, long)]
    write: bool,

    /// Directory for written text files (defaults to the image's directory)
    #[arg(short, long, requires = "write")]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Emit the structured result as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// memo-ocr - recognize handwritten memos with a remote Read API
#[derive(Parser, Debug)]
#[command(name = "memo-ocr")]
#[command(version)]
#[command(about = "Recognize text in drawn notes with a remote OCR service")]
#[command(long_about = "memo-ocr submits drawings to an asynchronous OCR read service and polls until the text is ready.

EXAMPLES:
    memo-ocr recognize drawing.png                    # Print recognized text
    memo-ocr recognize -w notes/                      # Write notes/*.txt next to each image
    memo-ocr recognize --json drawing.png             # Print the structured result
    memo-ocr recognize --max-attempts 10 drawing.png  # Give up after 10 status checks
    memo-ocr completions bash > memo-ocr.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created; fill in ocr.endpoint and ocr.api_key (or pass
    --endpoint and --api-key / MEMO_OCR_API_KEY).")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Colored stderr logger
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
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
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "\x1B[{}m{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Accept everything here; the effective level is applied through set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "memo-ocr", &mut std::io::stdout());
            Ok(())
        }
        Commands::Recognize(args) => run_recognize(args).await,
    }
}

/// Load the config file and apply command line overrides
fn load_config(options: &RecognizeArgs) -> Result<Config> {
    let (mut config, created) = Config::load_or_create(&options.config_path)?;
    if created {
        warn!("Config file not found at '{}', created a default one.", options.config_path);
    }

    if let Some(endpoint) = &options.endpoint {
        config.ocr.endpoint = endpoint.clone();
    }
    if let Some(api_key) = &options.api_key {
        config.ocr.api_key = api_key.clone();
    }
    if let Some(language) = &options.language {
        config.ocr.language = Some(language.clone());
    }
    if let Some(max_attempts) = options.max_attempts {
        config.polling.max_attempts = max_attempts;
    }
    if let Some(interval_ms) = options.interval_ms {
        config.polling.interval_ms = interval_ms;
    }
    if let Some(deadline_secs) = options.deadline_secs {
        config.polling.deadline_secs = Some(deadline_secs);
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_recognize(options: RecognizeArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&options)?;
    log::set_max_level(config.log_level.to_level_filter());

    let api = AzureRead::new(&config.ocr).map_err(|e| anyhow!("Failed to create Read API client: {}", e))?;
    let sequencer = OcrSequencer::new(api, config.polling.clone())?;

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the current recognition");
            ctrl_c.cancel();
        }
    });

    let images = if options.input_path.is_file() {
        vec![options.input_path.clone()]
    } else if options.input_path.is_dir() {
        FileManager::find_images(&options.input_path)?
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    };

    if images.is_empty() {
        warn!("No image files found in {:?}", options.input_path);
        return Ok(());
    }

    let mut failed = 0usize;
    for (index, image_path) in images.iter().enumerate() {
        if images.len() > 1 {
            info!("[{}/{}] {:?}", index + 1, images.len(), image_path);
        }

        match recognize_file(&sequencer, image_path, &options, images.len() > 1, &cancel).await {
            Ok(()) => {}
            Err(e) => {
                if matches!(e.downcast_ref::<OcrError>(), Some(OcrError::Cancelled)) {
                    warn!("Recognition cancelled");
                    return Err(e);
                }
                error!("{:?}: {:#}", image_path, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} images failed", failed, images.len()));
    }
    Ok(())
}

async fn recognize_file(
    sequencer: &OcrSequencer<AzureRead>,
    image_path: &Path,
    options: &RecognizeArgs,
    print_header: bool,
    cancel: &CancelToken,
) -> Result<()> {
    let output_path = if options.write {
        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => image_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };
        let extension = if options.json { "json" } else { "txt" };
        let output_path = FileManager::generate_output_path(image_path, output_dir, extension);
        if FileManager::file_exists(&output_path) && !options.force_overwrite {
            warn!("Output file already exists: {:?}. Use -f to force overwrite.", output_path);
            return Ok(());
        }
        Some(output_path)
    } else {
        None
    };

    let image = ImagePayload::from_file(image_path)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Recognizing {}", image_path.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = sequencer.recognize(&image, cancel).await;
    spinner.finish_and_clear();
    let result = outcome?;

    let rendered = if options.json {
        serde_json::to_string_pretty(&result.analyze_result).context("Failed to serialize result")?
    } else {
        result.text()
    };

    match output_path {
        Some(path) => {
            FileManager::write_text(&path, &rendered)?;
            info!("Success: {:?} ({} lines)", path, result.line_count());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            if print_header {
                writeln!(stdout, "== {} ==", image_path.display())?;
            }
            writeln!(stdout, "{}", rendered)?;
        }
    }

    Ok(())
}
