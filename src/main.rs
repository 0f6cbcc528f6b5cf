//! loregraph CLI: entity canonicalization and inline tagging for books.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use loregraph::collect::collect_mentions;
use loregraph::config::PipelineConfig;
use loregraph::document::load_registry;
use loregraph::model::{Book, TagStyle};
use loregraph::oracle::{OllamaClient, OllamaOracle, OracleError};
use loregraph::paths::LorePaths;
use loregraph::pipeline::{Pipeline, PipelineReport, TagOptions, tag_book};
use loregraph::tagger::{AliasTable, SpanTagger};

#[derive(Parser)]
#[command(
    name = "loregraph",
    version,
    about = "Canonicalize a book's entities and tag its paragraphs"
)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/loregraph/config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ollama model used for canonicalization.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Ollama base URL.
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Values per oracle request.
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the deduplicated mention list of a book as JSON.
    Collect {
        /// Book JSON (full book or single chapter).
        book: PathBuf,
    },

    /// Build the entity registry and attach it to the book.
    Canonicalize {
        book: PathBuf,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Tag a book's paragraphs against an existing registry.
    Tag {
        book: PathBuf,
        /// Registry JSON: a canonicalized book or a bare entity array.
        registry: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit `[[ID]]` markers instead of `[ID]`.
        #[arg(long)]
        markdown_style: bool,
    },

    /// Run the whole pipeline: canonicalize, then tag.
    Run {
        book: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        markdown_style: bool,
    },

    /// Tag a single paragraph and print the result.
    TagText {
        text: String,
        registry: PathBuf,
        #[arg(long)]
        markdown_style: bool,
    },

    /// Check the Ollama server and list its local models.
    Probe,

    /// Write the default config file.
    InitConfig {
        /// Destination (default: $XDG_CONFIG_HOME/loregraph/config.toml).
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    // Logs go to stderr; stdout carries JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Collect { book } => {
            let book = Book::load(&book)?;
            let mentions = collect_mentions(&book.chapters);
            println!(
                "{}",
                serde_json::to_string_pretty(&mentions).into_diagnostic()?
            );
        }

        Commands::Canonicalize { book, output } => {
            let mut book = Book::load(&book)?;
            let pipeline = Pipeline::new(config.clone(), connect(&config)?);
            let report = pipeline.canonicalize_book(&mut book)?;
            emit(&book, output.as_deref())?;
            print_report(&report);
        }

        Commands::Tag {
            book,
            registry,
            output,
            markdown_style,
        } => {
            if markdown_style {
                config.tag_style = TagStyle::Double;
            }
            let mut book = Book::load(&book)?;
            let registry = load_registry(&registry)?;
            let report = tag_book(&mut book, &registry, &TagOptions::from(&config))?;
            book.global_entities = Some(registry);
            emit(&book, output.as_deref())?;
            print_report(&report);
        }

        Commands::Run {
            book,
            output,
            markdown_style,
        } => {
            if markdown_style {
                config.tag_style = TagStyle::Double;
            }
            let mut book = Book::load(&book)?;
            let pipeline = Pipeline::new(config.clone(), connect(&config)?);
            let report = pipeline.run(&mut book)?;
            emit(&book, output.as_deref())?;
            print_report(&report);
        }

        Commands::TagText {
            text,
            registry,
            markdown_style,
        } => {
            let style = if markdown_style {
                TagStyle::Double
            } else {
                config.tag_style
            };
            let registry = load_registry(&registry)?;
            let table = AliasTable::build(&registry, config.collision_policy)?;
            let span_tagger = SpanTagger::new(&table, style)?;
            tracing::debug!(
                aliases = table.len(),
                style = ?span_tagger.style(),
                "tagging text"
            );
            let tagged = span_tagger.tag(&text);
            println!("{}", tagged.text);
            if !tagged.entity_ids.is_empty() {
                println!("Entities: {}", tagged.entity_ids.join(", "));
            }
        }

        Commands::Probe => {
            let mut client = OllamaClient::new(config.oracle.clone());
            if !client.probe() {
                return Err(OracleError::Unavailable {
                    url: client.base_url().to_string(),
                }
                .into());
            }
            println!("Ollama is available at {}", client.base_url());
            let models = client.available_models();
            if models.is_empty() {
                println!("No local models.");
            } else {
                println!("Local models ({}):", models.len());
                for model in models {
                    println!("  {model}");
                }
            }
            if !client.has_model() {
                println!(
                    "Configured model \"{}\" is not pulled; it will be pulled on first use.",
                    client.model()
                );
            }
        }

        Commands::InitConfig { path, force } => {
            let path = match path {
                Some(path) => path,
                None => {
                    let paths = LorePaths::resolve()?;
                    paths.ensure_dirs()?;
                    paths.config_file()
                }
            };
            if path.exists() && !force {
                miette::bail!(
                    help = "Pass --force to overwrite it.",
                    "config file already exists: {}",
                    path.display()
                );
            }
            PipelineConfig::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}

/// Resolve the config file, then apply command-line overrides.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => match LorePaths::resolve() {
            Ok(paths) if paths.config_file().is_file() => PipelineConfig::load(&paths.config_file())?,
            _ => PipelineConfig::default(),
        },
    };

    if let Some(model) = &cli.model {
        config.oracle.model = model.clone();
    }
    if let Some(url) = &cli.ollama_url {
        config.oracle.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;
    Ok(config)
}

/// Probe Ollama and make sure the model is present before the first batch.
fn connect(config: &PipelineConfig) -> Result<OllamaOracle> {
    let mut client = OllamaClient::new(config.oracle.clone());
    if !client.probe() {
        return Err(OracleError::Unavailable {
            url: client.base_url().to_string(),
        }
        .into());
    }
    client.ensure_model()?;
    tracing::info!(model = client.model(), url = client.base_url(), "oracle ready");
    Ok(OllamaOracle::new(client))
}

/// Write the book to `output`, or pretty JSON to stdout.
fn emit(book: &Book, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            book.save(path)?;
            tracing::info!(path = %path.display(), "document written");
        }
        None => println!("{}", book.to_json_string()?),
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    tracing::info!(
        mentions = report.mentions,
        batches = report.batches,
        registry = report.registry_size,
        entities_dropped = report.entities_dropped,
        aliases_dropped = report.aliases_dropped,
        paragraphs = report.paragraphs_tagged,
        tags = report.tags_inserted,
        collisions = report.alias_collisions,
        "done"
    );
}
