use async_trait::async_trait;
use clap::{Parser, Subcommand};
use genflow::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Builds generation graphs and loads workflow documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a text-to-image graph from a generation state JSON file
    Build {
        /// Path to the generation state JSON file
        state_path: PathBuf,
        /// Also add an infill node configured from the state's infill settings
        #[arg(long)]
        infill: bool,
    },
    /// Load, migrate and validate a workflow or graph JSON file
    Validate {
        /// Path to the workflow or graph JSON file
        document_path: PathBuf,
        /// Optional node template set; defaults to the built-in catalog
        #[arg(short, long)]
        templates: Option<PathBuf>,
        /// Directory holding the images a workflow may reference
        #[arg(long)]
        images_dir: Option<PathBuf>,
        /// Comma-separated list of installed model keys
        #[arg(long, value_delimiter = ',')]
        models: Option<Vec<String>>,
    },
    /// Convert a bare graph JSON file into a workflow
    Convert {
        /// Path to the graph JSON file
        graph_path: PathBuf,
    },
    /// Build an ad-hoc ESRGAN upscale graph for a single image
    Upscale {
        /// Name of the image to upscale
        #[arg(long)]
        image: String,
        /// ESRGAN model file name
        #[arg(long)]
        model: Option<String>,
    },
}

/// Resolves references against the local filesystem and a fixed model list.
struct LocalChecker {
    images_dir: Option<PathBuf>,
    models: Option<Vec<String>>,
}

#[async_trait]
impl ResourceChecker for LocalChecker {
    async fn check_image_access(&self, image_name: &str) -> std::result::Result<bool, CheckError> {
        match &self.images_dir {
            Some(dir) => Ok(dir.join(image_name).is_file()),
            None => Ok(true),
        }
    }

    async fn check_board_access(&self, _board_id: &str) -> std::result::Result<bool, CheckError> {
        Ok(true)
    }

    async fn check_model_access(&self, model_key: &str) -> std::result::Result<bool, CheckError> {
        match &self.models {
            Some(models) => Ok(models.iter().any(|key| key == model_key)),
            None => Ok(true),
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Build { state_path, infill } => run_build(&state_path, infill),
        Command::Validate {
            document_path,
            templates,
            images_dir,
            models,
        } => run_validate(&document_path, templates.as_deref(), images_dir, models),
        Command::Convert { graph_path } => run_convert(&graph_path),
        Command::Upscale { image, model } => run_upscale(image, model),
    };

    if let Err(e) = outcome {
        exit_with_error(&e.to_string());
    }
}

fn read_file(path: &std::path::Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e).into())
}

fn load_templates(path: Option<&std::path::Path>) -> Result<Templates> {
    match path {
        Some(path) => Ok(Templates::from_json(&read_file(path)?)?),
        None => Ok(Templates::builtin()),
    }
}

fn run_build(state_path: &std::path::Path, infill: bool) -> Result<()> {
    let start = Instant::now();
    let state: GenerationState = serde_json::from_str(&read_file(state_path)?)
        .map_err(|e| format!("Failed to parse generation state: {}", e))?;

    let BuiltGraph { mut graph, output } = build_text_to_image_graph(&state)?;
    if infill {
        add_infill(&mut graph, &state.infill)?;
    }
    graph.validate()?;

    let snapshot = graph.get_graph();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    eprintln!(
        "Built graph '{}' with {} nodes and {} edges in {:?} (output: {})",
        snapshot.id,
        snapshot.nodes.len(),
        snapshot.edges.len(),
        start.elapsed(),
        output.id()
    );
    Ok(())
}

fn run_validate(
    document_path: &std::path::Path,
    templates_path: Option<&std::path::Path>,
    images_dir: Option<PathBuf>,
    models: Option<Vec<String>>,
) -> Result<()> {
    let start = Instant::now();
    let text = read_file(document_path)?;
    let templates = load_templates(templates_path)?;
    let checker = LocalChecker { images_dir, models };
    let validator = WorkflowValidator::builder(&templates)
        .with_checker(&checker)
        .build();

    let loaded = futures::executor::block_on(validator.load(&text))?;

    println!("{}", serde_json::to_string_pretty(&loaded.workflow)?);
    if let Some(version) = &loaded.migrated_from {
        eprintln!("Migrated from schema version {}", version);
    }
    if loaded.warnings.is_empty() {
        eprintln!("No warnings");
    } else {
        eprintln!("{} warning(s):", loaded.warnings.len());
        for warning in &loaded.warnings {
            eprintln!("  -> {}", warning);
        }
    }
    eprintln!("Loaded in {:?}", start.elapsed());
    Ok(())
}

fn run_convert(graph_path: &std::path::Path) -> Result<()> {
    let graph: GraphDocument = serde_json::from_str(&read_file(graph_path)?)
        .map_err(|e| format!("Failed to parse graph: {}", e))?;
    let workflow = graph_to_workflow(&graph, &Templates::builtin())?;
    println!("{}", serde_json::to_string_pretty(&workflow)?);
    Ok(())
}

fn run_upscale(image: String, model: Option<String>) -> Result<()> {
    let mut state = GenerationState::default();
    if let Some(model) = model {
        state.upscale.esrgan_model_name = model;
    }
    let graph = build_adhoc_upscale_graph(&state, &ImageField::new(image))?;
    println!("{}", serde_json::to_string_pretty(&graph.get_graph())?);
    Ok(())
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
