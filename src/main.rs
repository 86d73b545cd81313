use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use emf_graph_explorer::{
    artifacts::ArtifactLoader,
    config::{split_names, Config},
    filter::FilterError,
    graph::{build_object_graph, ObjectGraph},
    metamodel::MetamodelIndex,
    prune::{export_instance, preview_prune, ExportOptions},
    query::SelectionQuery,
    reports::{
        instance_stats, instances_by_class, metamodel_dump, summarize_instances, summarize_metamodel,
        summarize_model, truncate_groups, CsvFormatter, JsonFormatter, PathFormatter, PathIdFormatter, ReportGenerator,
        SelectionFormatter,
    },
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for unreadable inputs and rejected filter expressions
const INPUT_FAILURE_EXIT: i32 = 2;

#[derive(Parser)]
#[command(name = "emf-explorer")]
#[command(about = "Explore, filter, expand and prune EMF-style instance graphs")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Metamodel JSON document
    #[arg(short, long, global = true)]
    metamodel: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the metamodel
    Metamodel {
        /// Dump packages and classes as JSON
        #[arg(long)]
        json: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize the roots and objects of an instance document
    Instances {
        instance: PathBuf,

        /// Dump object records grouped by class as JSON
        #[arg(long)]
        json: bool,

        /// Narrow the JSON dump with a filter expression
        #[arg(long)]
        filter: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export selected objects as JSON records
    ExportJson {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Drop references to objects outside the selection
        #[arg(long)]
        strip_refs: bool,
    },

    /// Export edges between selected objects as CSV
    ExportEdges {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Export containment and expansion paths of selected objects
    ExportPaths {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Export id-keyed expansion paths of selected objects
    ExportPathIds {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Report what a class selection would prune, without an instance
    PreviewPrune {
        #[command(flatten)]
        classes: ClassArgs,

        /// Output format (json, markdown, text)
        #[arg(short, long, default_value = "text")]
        format: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the instance document pruned to a class selection
    ExportInstance {
        instance: PathBuf,

        #[command(flatten)]
        classes: ClassArgs,

        /// Do not keep ancestors of retained objects
        #[arg(long)]
        no_preserve_containment: bool,

        /// Drop references to pruned objects
        #[arg(long)]
        strip_refs: bool,

        /// Write defaults for unset attributes
        #[arg(long)]
        force_defaults: bool,

        /// Record every forced default in the output
        #[arg(long)]
        debug_trace: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize configuration file
    Init {
        /// Configuration file path
        #[arg(short = 'f', long, default_value = "emf-explorer.yml")]
        config_file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct SelectionArgs {
    instance: PathBuf,

    /// Keep only objects matching this expression
    #[arg(long)]
    filter_expr: Option<String>,

    /// Seed expression for a neighborhood expansion
    #[arg(long)]
    expand_from: Option<String>,

    /// Expansion depth, negative for unbounded
    #[arg(long, allow_negative_numbers = true)]
    expand_depth: Option<i64>,

    /// Comma-separated classes the expansion may enter
    #[arg(long)]
    expand_classes: Option<String>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ClassArgs {
    /// Comma-separated classes to keep, all when empty
    #[arg(long, default_value = "")]
    include_classes: String,

    /// Comma-separated classes to prune
    #[arg(long, default_value = "")]
    exclude_classes: String,

    /// Keep the supertypes of included classes
    #[arg(long)]
    include_supertypes: bool,
}

/// Failure to read or parse an input document
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct InputFailure(String);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(&cli.log_level)?;

    info!("Starting EMF graph explorer");

    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(exit_code(&err));
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_layered(cli.config.as_ref()).await?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Metamodel { json, output } => {
            let mut loader = loader_for(cli.metamodel.as_ref())?;
            let metamodel = load_metamodel(&mut loader)?;
            let content = if json {
                to_json(&metamodel_dump(metamodel), &config)?
            } else {
                summarize_metamodel(metamodel)
            };
            write_output(&content, output.as_ref()).await?;
        }

        Commands::Instances {
            instance,
            json,
            filter,
            output,
        } => {
            let mut loader = loader_for(cli.metamodel.as_ref())?;
            let (metamodel, graph) = load_graph(&mut loader, &instance)?;
            let content = if json {
                let mut grouped = instances_by_class(&graph, metamodel, filter.as_deref())?;
                let dropped = truncate_groups(&mut grouped, config.output.preview_limit);
                if dropped > 0 {
                    warn!("{} records hidden by output.preview_limit", dropped);
                }
                to_json(&grouped, &config)?
            } else {
                let stats = instance_stats(&graph);
                info!("Instance has {} roots and {} objects", stats.roots, stats.objects);
                format!("{}\n{}", summarize_instances(&graph), summarize_model(&graph))
            };
            write_output(&content, output.as_ref()).await?;
        }

        Commands::ExportJson { selection, strip_refs } => {
            let formatter = JsonFormatter {
                pretty: config.output.pretty_json,
                strip_refs: strip_refs || config.pruning.strip_refs,
            };
            export_selection(cli.metamodel.as_ref(), &config, &selection, &formatter).await?;
        }

        Commands::ExportEdges { selection } => {
            export_selection(cli.metamodel.as_ref(), &config, &selection, &CsvFormatter).await?;
        }

        Commands::ExportPaths { selection } => {
            export_selection(cli.metamodel.as_ref(), &config, &selection, &PathFormatter).await?;
        }

        Commands::ExportPathIds { selection } => {
            export_selection(cli.metamodel.as_ref(), &config, &selection, &PathIdFormatter).await?;
        }

        Commands::PreviewPrune {
            classes,
            format,
            output,
        } => {
            let mut loader = loader_for(cli.metamodel.as_ref())?;
            let metamodel = load_metamodel(&mut loader)?;
            let report = preview_prune(
                metamodel,
                &name_set(&classes.include_classes),
                &name_set(&classes.exclude_classes),
                classes.include_supertypes || config.pruning.include_supertypes,
            );
            info!(
                "Prune preview keeps {} classes and prunes {}",
                report.selected_classes.len(),
                report.pruned_classes.len()
            );
            let content = ReportGenerator::new().generate(&report, &format)?;
            write_output(&content, output.as_ref()).await?;
        }

        Commands::ExportInstance {
            instance,
            classes,
            no_preserve_containment,
            strip_refs,
            force_defaults,
            debug_trace,
            output,
        } => {
            let mut loader = loader_for(cli.metamodel.as_ref())?;
            let (metamodel, graph) = load_graph(&mut loader, &instance)?;
            let options = ExportOptions {
                preserve_containment_chain: !no_preserve_containment && config.pruning.preserve_containment_chain,
                strip_refs: strip_refs || config.pruning.strip_refs,
                force_defaults: force_defaults || config.pruning.force_defaults,
                debug_trace: debug_trace || config.pruning.debug_trace,
                include_supertypes: classes.include_supertypes || config.pruning.include_supertypes,
            };
            if options.debug_trace && !options.force_defaults {
                warn!("--debug-trace has no effect without --force-defaults");
            }

            let filtered = export_instance(
                &graph,
                metamodel,
                &name_set(&classes.include_classes),
                &name_set(&classes.exclude_classes),
                &options,
            );
            if !filtered.dangling_references.is_empty() {
                warn!("{} references point at pruned objects", filtered.dangling_references.len());
            }
            let content = to_json(&filtered, &config)?;
            write_output(&content, output.as_ref()).await?;
        }

        Commands::Init { config_file, force } => {
            init_config(config_file, force).await?;
        }
    }

    Ok(())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<InputFailure>().is_some() || err.downcast_ref::<FilterError>().is_some() {
        INPUT_FAILURE_EXIT
    } else {
        1
    }
}

fn loader_for(metamodel: Option<&PathBuf>) -> Result<ArtifactLoader> {
    let path = metamodel
        .ok_or_else(|| InputFailure("--metamodel is required for this command".to_string()))?;
    Ok(ArtifactLoader::new(path))
}

fn load_metamodel(loader: &mut ArtifactLoader) -> Result<&MetamodelIndex> {
    let path = loader.metamodel_path().to_path_buf();
    loader
        .load_metamodel()
        .with_context(|| InputFailure(format!("Could not load metamodel {:?}", path)))
}

/// Load an instance document and build its object graph
fn load_graph<'l>(loader: &'l mut ArtifactLoader, instance: &Path) -> Result<(&'l MetamodelIndex, ObjectGraph)> {
    let document = loader
        .load_instance(instance)
        .with_context(|| InputFailure(format!("Could not load instance {:?}", instance)))?;
    let metamodel = load_metamodel(loader)?;

    let graph = build_object_graph(metamodel, &document.roots);
    let stats = graph.stats();
    if stats.unresolved_references > 0 || stats.duplicate_ids > 0 {
        warn!(
            "Graph built with {} unresolved references and {} duplicate ids",
            stats.unresolved_references, stats.duplicate_ids
        );
    }
    Ok((metamodel, graph))
}

/// Run a selection query and hand the result to an exporter
async fn export_selection(
    metamodel: Option<&PathBuf>,
    config: &Config,
    args: &SelectionArgs,
    formatter: &dyn SelectionFormatter,
) -> Result<()> {
    let mut loader = loader_for(metamodel)?;
    let (metamodel, graph) = load_graph(&mut loader, &args.instance)?;

    let mut query = SelectionQuery::new();
    query.filter_expr = args.filter_expr.clone();
    if let Some(seed) = &args.expand_from {
        query = query.with_expansion(seed.clone(), args.expand_depth.unwrap_or(config.expansion.default_depth));

        let classes = match &args.expand_classes {
            Some(raw) => name_set(raw),
            None => config.expansion.allowed_classes.iter().cloned().collect(),
        };
        if !classes.is_empty() {
            query = query.with_expand_classes(classes);
        }
    } else if args.expand_depth.is_some() || args.expand_classes.is_some() {
        warn!("--expand-depth and --expand-classes are ignored without --expand-from");
    }

    let selection = query.run(&graph, metamodel)?;
    info!("Selected {} of {} objects", selection.len(), graph.node_count());

    let content = formatter.format(&graph, &selection)?;
    write_output(&content, args.output.as_ref()).await
}

fn name_set(raw: &str) -> BTreeSet<String> {
    split_names(raw).into_iter().collect()
}

fn to_json<T: serde::Serialize>(value: &T, config: &Config) -> Result<String> {
    let content = if config.output.pretty_json {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(content)
}

/// Write to a file, or to stdout when no path is given
async fn write_output(content: &str, output_file: Option<&PathBuf>) -> Result<()> {
    if let Some(file_path) = output_file {
        tokio::fs::write(file_path, content)
            .await
            .with_context(|| format!("Failed to write output to: {:?}", file_path))?;
        info!("Output written to: {:?}", file_path);
    } else if content.ends_with('\n') {
        print!("{}", content);
    } else {
        println!("{}", content);
    }

    Ok(())
}

/// Initialize configuration file
async fn init_config(config_file: PathBuf, force: bool) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() && !force {
        warn!("Configuration file already exists: {:?}", config_file);
        println!("Configuration file exists: {:?}. Pass --force to overwrite.", config_file);
        return Ok(());
    }

    Config::default()
        .save_to_file(&config_file)
        .await
        .with_context(|| format!("Failed to write configuration file: {:?}", config_file))?;

    info!("Configuration file created successfully: {:?}", config_file);
    println!("Configuration file created: {:?}", config_file);
    println!("Edit this file to change expansion, pruning and output defaults.");

    Ok(())
}
