//! apidoc: generate API documentation data from annotated source files.
//!
//! - **stdout mode**: `apidoc -i src` prints the endpoint records
//! - **output mode**: `apidoc -i src -i broker:mqtt -o doc` writes
//!   `api_data.json` and `api_project.json` into `doc`

use anyhow::{Context, Result};
use apidoc::log::TracingLogger;
use apidoc::options::{Encoding, LineEnding, Options, PackageInfos, SrcEntry};
use apidoc::Outcome;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Project metadata file looked up when `--config` is not given.
const CONFIG_FILE: &str = "apidoc.json";

#[derive(Parser)]
#[command(name = "apidoc", version, about = "Extract API documentation from comment blocks")]
struct Cli {
    /// Input directory, optionally with a category (`src/mqtt:mqtt`).
    /// Glob patterns are expanded. Can be given multiple times.
    #[arg(short = 'i', long = "input", default_value = ".")]
    inputs: Vec<String>,

    /// Output directory for api_data.json and api_project.json.
    /// Without it the endpoint data is printed to stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Project metadata file (default: apidoc.json in the working or input directory)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Regex a file path must match to be parsed. Can be given multiple times.
    #[arg(short = 'f', long = "file-filters")]
    file_filters: Vec<String>,

    /// Regex excluding matching file paths. Can be given multiple times.
    #[arg(short = 'e', long = "exclude-filters")]
    exclude_filters: Vec<String>,

    /// Keep only blocks with a matching tag, e.g. `apiGroup=User`
    #[arg(long)]
    filter_by: Option<String>,

    /// Include blocks marked with @apiPrivate
    #[arg(short = 'p', long)]
    private: bool,

    /// Output MQTT endpoints only
    #[arg(long)]
    mqtt_only: bool,

    /// Fail when an inline MQTT payload schema is not valid JSON
    #[arg(long)]
    fail_on_mqtt_schema_error: bool,

    /// Source file encoding
    #[arg(long, value_enum, default_value = "utf8")]
    encoding: Encoding,

    /// Line ending of the generated JSON (default: platform)
    #[arg(long, value_enum)]
    line_ending: Option<LineEnding>,

    /// Keep description fields as written instead of rendering markdown
    #[arg(long)]
    no_markdown: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Debug output
    #[arg(long)]
    debug: bool,

    /// Errors only
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let options = build_options(&cli)?;
    let package = load_package(cli.config.as_deref(), &options.src)?;

    match apidoc::parse(&options, &package, &TracingLogger) {
        Outcome::Data { data, project } => write_output(cli.output.as_deref(), &data, &project),
        Outcome::Nothing => {
            tracing::info!("Nothing to do.");
            Ok(())
        }
        Outcome::Failed => anyhow::bail!("documentation could not be generated"),
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn build_options(cli: &Cli) -> Result<Options> {
    let mut options = Options {
        src: expand_inputs(&cli.inputs)?,
        filter_by: cli.filter_by.clone(),
        api_private: cli.private,
        mqtt_only: cli.mqtt_only,
        fail_on_mqtt_schema_error: cli.fail_on_mqtt_schema_error,
        encoding: cli.encoding,
        markdown: !cli.no_markdown,
        exclude_filters: cli.exclude_filters.clone(),
        ..Options::default()
    };
    if !cli.file_filters.is_empty() {
        options.include_filters = cli.file_filters.clone();
    }
    if let Some(line_ending) = cli.line_ending {
        options.line_ending = line_ending;
    }
    Ok(options)
}

/// Expand glob patterns into directories, keeping the category suffix.
fn expand_inputs(inputs: &[String]) -> Result<Vec<SrcEntry>> {
    let mut entries = Vec::new();
    for input in inputs {
        let entry = SrcEntry::parse(input);
        let pattern = entry.path.to_string_lossy().to_string();
        if entry.path.exists() || !pattern.contains(['*', '?', '[']) {
            entries.push(entry);
            continue;
        }
        let matches: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_dir())
            .collect();
        if matches.is_empty() {
            tracing::warn!("no directories matched: {pattern}");
        }
        for path in matches {
            entries.push(SrcEntry {
                path,
                category: entry.category.clone(),
            });
        }
    }
    Ok(entries)
}

/// `--config`, else the first `apidoc.json` found in the working directory
/// or an input directory, else defaults.
fn load_package(config: Option<&Path>, src: &[SrcEntry]) -> Result<PackageInfos> {
    let path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => std::iter::once(PathBuf::from(CONFIG_FILE))
            .chain(src.iter().map(|s| s.path.join(CONFIG_FILE)))
            .find(|p| p.is_file()),
    };
    let Some(path) = path else {
        tracing::debug!("no {CONFIG_FILE} found, using defaults");
        return Ok(PackageInfos::default());
    };
    let text = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let package = serde_json::from_str(&text).with_context(|| format!("invalid project file: {}", path.display()))?;
    tracing::debug!("project metadata from {}", path.display());
    Ok(package)
}

fn write_output(output: Option<&Path>, data: &str, project: &str) -> Result<()> {
    let Some(dir) = output else {
        println!("{data}");
        return Ok(());
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    for (name, content) in [("api_data.json", data), ("api_project.json", project)] {
        let path = dir.join(name);
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    }
    tracing::info!("Done. Output written to {}", dir.display());
    Ok(())
}
