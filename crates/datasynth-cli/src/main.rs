mod logging;
mod output;
mod server;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use datasynth_core::{ConfigError, CoreError, Field, GenerationRequest, Settings};
use datasynth_generate::output::csv::write_dataset_csv;
use datasynth_generate::{BackendError, ChatCompletionsBackend, OutputError, SynthesisEngine};
use datasynth_suggest::suggest_schema;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "datasynth.toml";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("generative backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("output error: {0}")]
    Output(#[from] OutputError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(#[from] server::ServerError),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Parser, Debug)]
#[command(name = "datasynth", version, about = "Datasynth CLI")]
struct Cli {
    /// Settings file (defaults to ./datasynth.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest a field schema for a dataset description.
    Suggest(SuggestArgs),
    /// Synthesize rows for a field schema.
    Generate(GenerateArgs),
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct SuggestArgs {
    /// Free-text dataset description.
    description: String,
    /// Maximum number of suggested fields (defaults to `max_columns`).
    #[arg(long)]
    max_fields: Option<usize>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Dataset subject forwarded to the generative backend.
    #[arg(long)]
    description: String,
    /// Locale hint (defaults to `default_country`).
    #[arg(long)]
    locale: Option<String>,
    /// Number of rows to produce.
    #[arg(long, default_value_t = 10)]
    rows: usize,
    /// JSON file holding a field list or a schema suggestion.
    #[arg(long, value_name = "PATH", conflicts_with = "field")]
    fields_file: Option<PathBuf>,
    /// Field as `name` or `name=description`; repeatable.
    #[arg(long, value_name = "FIELD", value_parser = parse_field)]
    field: Vec<Field>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Write to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address (defaults to the `listen` setting).
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

/// Either a bare field list or a saved schema suggestion.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldsFile {
    List(Vec<Field>),
    Suggestion { fields: Vec<Field> },
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json)?;
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Suggest(args) => run_suggest(&settings, args),
        Command::Generate(args) => run_generate(&settings, args),
        Command::Serve(args) => run_serve(settings, args),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) if !path.exists() => Err(CliError::InvalidInput(format!(
            "config file not found: {}",
            path.display()
        ))),
        Some(path) => Ok(Settings::load(Some(path))?),
        None => Ok(Settings::load(Some(Path::new(DEFAULT_CONFIG_FILE)))?),
    }
}

fn run_suggest(settings: &Settings, args: SuggestArgs) -> Result<(), CliError> {
    let max_fields = args.max_fields.unwrap_or(settings.max_columns);
    let suggestion = suggest_schema(settings, &args.description, max_fields);
    let mut data = serde_json::to_vec_pretty(&suggestion)?;
    data.push(b'\n');
    output::emit(None, &data)?;
    Ok(())
}

fn run_generate(settings: &Settings, args: GenerateArgs) -> Result<(), CliError> {
    let fields = match &args.fields_file {
        Some(path) => read_fields_file(path)?,
        None => args.field.clone(),
    };
    let request = GenerationRequest {
        fields,
        count: args.rows,
        description: args.description.clone(),
        locale: args
            .locale
            .clone()
            .unwrap_or_else(|| settings.default_country.clone()),
    };
    request.validate(settings.max_rows)?;

    let backend = backend_for(settings, &request)?;
    let result = SynthesisEngine::new(backend).run(&request);
    tracing::info!(
        event = "dataset_generated",
        rows = result.dataset.len(),
        placeholder_cells = result.report.placeholder_cells
    );

    let data = match args.format {
        OutputFormat::Json => {
            let mut data = serde_json::to_vec_pretty(&result.dataset)?;
            data.push(b'\n');
            data
        }
        OutputFormat::Csv => {
            let mut data = Vec::new();
            write_dataset_csv(&mut data, &request.fields, &result.dataset)?;
            data
        }
    };

    output::emit(args.out.as_deref(), &data)?;
    if let Some(path) = &args.out {
        tracing::info!(
            event = "dataset_written",
            path = %path.display(),
            bytes = data.len()
        );
    }
    Ok(())
}

fn run_serve(mut settings: Settings, args: ServeArgs) -> Result<(), CliError> {
    if let Some(listen) = args.listen {
        settings.listen = listen;
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(settings))?;
    Ok(())
}

/// The chat backend, built only when some field needs model output.
pub(crate) fn backend_for(
    settings: &Settings,
    request: &GenerationRequest,
) -> Result<Option<ChatCompletionsBackend>, BackendError> {
    if request.fields.iter().all(Field::is_identifier) {
        return Ok(None);
    }
    ChatCompletionsBackend::from_settings(settings).map(Some)
}

fn read_fields_file(path: &Path) -> Result<Vec<Field>, CliError> {
    let content = std::fs::read_to_string(path)?;
    let parsed: FieldsFile = serde_json::from_str(&content)?;
    let fields = match parsed {
        FieldsFile::List(fields) => fields,
        FieldsFile::Suggestion { fields } => fields,
    };
    Ok(fields)
}

fn parse_field(value: &str) -> Result<Field, String> {
    let (name, description) = value.split_once('=').unwrap_or((value, ""));
    let name = name.trim();
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    Ok(Field::new(name, description.trim()))
}
