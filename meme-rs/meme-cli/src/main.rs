use clap::Parser;
use meme_config::{Config, load_or_init};
use meme_generator::{GenerateError, MemeClient, RemoteImageLink};
use meme_image::{FetchedImage, ImageError, SaveImageOptions, fetch_image, save_image};
use meme_registry::{Registry, RegistryError};
use meme_utils::{DEFAULT_FILE_NAME_PREFIX, ImageNameContext};
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// meme CLI entry point.
///
/// Captions a memegenerator.net template and prints the link to the rendered
/// image, or the image itself when stdout is not a terminal.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "meme",
    author,
    version,
    about = "Caption a meme template and get a link to the image.",
    long_about = None
)]
struct Cli {
    /// Generator key, or a case-insensitive pattern matched against keys and names.
    #[arg(value_name = "GENERATOR", required_unless_present = "list")]
    generator: Option<String>,
    /// First caption line, or the only line for generators with a default first line.
    #[arg(value_name = "LINE", required_unless_present = "list")]
    line1: Option<String>,
    /// Second caption line.
    #[arg(value_name = "LINE")]
    line2: Option<String>,
    /// List known generators and exit.
    #[arg(long)]
    list: bool,
    /// Do not copy the link to the clipboard.
    #[arg(long)]
    no_clipboard: bool,
    /// Also download the image into the configured output directory.
    #[arg(long)]
    save: bool,
    /// Enable debug logging on stderr.
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!(?cli, "meme starting");

    if cli.list {
        print!("{}", format_listing(Registry::builtin()));
        return ExitCode::SUCCESS;
    }

    let result = run(cli).and_then(|context| {
        for message in &context.infos {
            eprintln!("{message}");
        }
        for warning in &context.warnings {
            eprintln!("{warning}");
        }
        emit(&context)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Generator table sorted by key, keys padded to a common width.
fn format_listing(registry: &Registry) -> String {
    let entries = registry.sorted();
    let width = entries.iter().map(|entry| entry.key.len()).max().unwrap_or(0);

    entries
        .iter()
        .map(|entry| format!("{:<width$}  {}\n", entry.key, entry.record.generator_name))
        .collect()
}

#[derive(Debug)]
struct RunContext {
    link: RemoteImageLink,
    infos: Vec<String>,
    warnings: Vec<String>,
    user_agent: String,
    timeout: Option<Duration>,
    image: Option<FetchedImage>,
}

fn run(cli: Cli) -> Result<RunContext, CliError> {
    let Cli {
        generator,
        line1,
        line2,
        no_clipboard,
        save,
        ..
    } = cli;

    let generator = generator.ok_or(CliError::MissingArgument("generator"))?;
    let line1 = line1.ok_or(CliError::MissingArgument("caption line"))?;

    let mut infos = Vec::new();
    let mut warnings = Vec::new();

    let config = match load_or_init() {
        Ok(outcome) => {
            if outcome.created {
                infos.push(format!(
                    "Created meme configuration at {}",
                    outcome.path.display()
                ));
            }
            outcome.config
        }
        Err(error) => {
            warnings.push(format!(
                "Warning: failed to load meme configuration ({error}). Falling back to defaults."
            ));
            Config::default().with_env_overrides()
        }
    };

    let entry = Registry::builtin().resolve(&generator)?;
    let client = MemeClient::new(config.service_url.as_str()).with_timeout(config.timeout());
    let link = client.generate(&entry.record, &line1, line2.as_deref())?;

    if config.clipboard && !no_clipboard {
        if let Err(error) = meme_utils::paste(link.as_str()) {
            warnings.push(format!("Warning: failed to copy link to clipboard ({error})."));
        }
    }

    let mut image = None;
    if save {
        match fetch_image(link.as_str(), client.user_agent(), config.timeout()) {
            Ok(fetched) => {
                let name = ImageNameContext::new(
                    DEFAULT_FILE_NAME_PREFIX,
                    [Some(entry.key), Some(line1.as_str()), line2.as_deref()],
                );
                let file_stem = name.file_stem();
                let options = SaveImageOptions {
                    file_stem: Some(file_stem.as_str()),
                    mime_type: fetched.mime_type.as_deref(),
                    output_dir: Some(Path::new(&config.image_output_dir)),
                };
                match save_image(&fetched.bytes, options) {
                    Ok(path) => infos.push(format!("Saved image to {}", path.display())),
                    Err(error) => warnings.push(format!("Warning: failed to save image ({error}).")),
                }
                image = Some(fetched);
            }
            Err(error) => warnings.push(format!("Warning: failed to download image ({error}).")),
        }
    }

    Ok(RunContext {
        link,
        infos,
        warnings,
        user_agent: client.user_agent().to_string(),
        timeout: config.timeout(),
        image,
    })
}

/// Prints the link for a terminal; otherwise streams the image bytes so the
/// output can be piped into a file or viewer.
fn emit(context: &RunContext) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    if stdout.is_terminal() {
        writeln!(stdout, "{}", context.link)?;
        return Ok(());
    }

    match &context.image {
        Some(image) => stdout.write_all(&image.bytes)?,
        None => {
            let image = fetch_image(context.link.as_str(), &context.user_agent, context.timeout)?;
            stdout.write_all(&image.bytes)?;
        }
    }
    stdout.flush()?;
    Ok(())
}
