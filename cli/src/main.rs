//! semsim: command-line front end for the SNOMED CT similarity engine
//!
//! Builds graph snapshots from an RF2 release, then answers pair queries
//! and writes distance/similarity matrices against those snapshots.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use snomed_semsim::algo::Measure;
use snomed_semsim::graph::{ConceptGraph, ConceptId, RelationPolicy};
use snomed_semsim::matrix::{
    read_concept_list, read_delimited, write_matrix_file, CoverageReport, MatrixAssembler,
    MatrixFormat, MatrixSummary,
};
use snomed_semsim::{pipeline, read_snapshot, EngineConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semsim", version, about = "SNOMED CT semantic similarity CLI")]
struct Cli {
    /// Engine configuration (YAML)
    #[arg(long, global = true, env = "SEMSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PolicyArg {
    IsA,
    All,
    Both,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MatrixFormatArg {
    Tsv,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a release and write graph snapshots
    Build {
        /// Directory holding the RF2 snapshot tables
        #[arg(long)]
        release_dir: PathBuf,

        /// Where snapshots are written
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        #[arg(long, value_enum, default_value = "both")]
        policy: PolicyArg,
    },
    /// Show statistics of a snapshot
    Info {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Score one concept pair
    Pair {
        #[arg(long)]
        snapshot: PathBuf,

        /// Measure name, or `all`
        #[arg(long, default_value = "all")]
        measure: String,

        a: String,
        b: String,
    },
    /// Assemble a pairwise matrix over a concept list
    Matrix {
        #[arg(long)]
        snapshot: PathBuf,

        /// One concept id per line
        #[arg(long)]
        concepts: PathBuf,

        #[arg(long, default_value = "ShortestPath")]
        measure: String,

        #[arg(long)]
        out: PathBuf,

        /// Defaults to the output file extension
        #[arg(long, value_enum)]
        matrix_format: Option<MatrixFormatArg>,

        /// Worker threads (overrides config)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Compare a concept list with an existing matrix
    Coverage {
        #[arg(long)]
        concepts: PathBuf,

        #[arg(long)]
        matrix: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Build {
            release_dir,
            out_dir,
            policy,
        } => run_build(&config, &release_dir, &out_dir, policy, &cli.format),
        Commands::Info { snapshot } => run_info(&snapshot, &cli.format),
        Commands::Pair {
            snapshot,
            measure,
            a,
            b,
        } => run_pair(&config, &snapshot, &measure, &a, &b, &cli.format),
        Commands::Matrix {
            snapshot,
            concepts,
            measure,
            out,
            matrix_format,
            workers,
        } => {
            let format = match matrix_format {
                Some(MatrixFormatArg::Tsv) => MatrixFormat::Delimited('\t'),
                Some(MatrixFormatArg::Csv) => MatrixFormat::Delimited(','),
                Some(MatrixFormatArg::Json) => MatrixFormat::Json,
                None => match MatrixFormat::from_path(&out) {
                    MatrixFormat::Delimited('\t') => MatrixFormat::Delimited(config.output.delimiter),
                    other => other,
                },
            };
            run_matrix(
                &config,
                &snapshot,
                &concepts,
                &measure,
                &out,
                format,
                workers.unwrap_or(config.workers),
                &cli.format,
            )
        }
        Commands::Coverage { concepts, matrix } => {
            run_coverage(&config, &concepts, &matrix, &cli.format)
        }
    }
}

fn run_build(
    config: &EngineConfig,
    release_dir: &Path,
    out_dir: &Path,
    policy: PolicyArg,
    format: &OutputFormat,
) -> Result<()> {
    let policies = match policy {
        PolicyArg::IsA => vec![RelationPolicy::HierarchyOnly],
        PolicyArg::All => vec![RelationPolicy::AllRelations],
        PolicyArg::Both => vec![RelationPolicy::HierarchyOnly, RelationPolicy::AllRelations],
    };
    let built = pipeline::build_snapshots(config, release_dir, out_dir, &policies)?;

    match format {
        OutputFormat::Json => {
            let docs: Vec<serde_json::Value> = built
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "policy": b.policy.to_string(),
                        "path": b.path.display().to_string(),
                        "statistics": b.statistics,
                        "snapshot": b.info,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                "Policy", "Concepts", "Edges", "Max depth", "Unrooted", "Bytes", "Snapshot",
            ]);
            for b in &built {
                table.add_row(vec![
                    b.policy.to_string(),
                    b.statistics.concept_count.to_string(),
                    b.statistics.edge_count.to_string(),
                    b.statistics.max_depth.to_string(),
                    b.statistics.unrooted.to_string(),
                    b.info.bytes.to_string(),
                    b.path.display().to_string(),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn load_graph(snapshot: &Path) -> Result<ConceptGraph> {
    read_snapshot(snapshot).with_context(|| format!("reading snapshot {}", snapshot.display()))
}

fn run_info(snapshot: &Path, format: &OutputFormat) -> Result<()> {
    let graph = load_graph(snapshot)?;
    let stats = graph.statistics();

    match format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "graph_id": graph.id().to_string(),
                "policy": graph.policy().to_string(),
                "version": graph.version(),
                "statistics": stats,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => {
            println!("Graph:     {}", graph.id());
            println!("Policy:    {}", graph.policy());
            println!("Release:   {}", graph.version().unwrap_or("unknown"));
            println!("Root:      {}", stats.root);
            println!("Concepts:  {}", stats.concept_count);
            println!("Edges:     {}", stats.edge_count);
            println!("Max depth: {}", stats.max_depth);
            println!("Unrooted:  {}", stats.unrooted);
        }
    }
    Ok(())
}

fn parse_measures(name: &str) -> Result<Vec<Measure>> {
    if name.eq_ignore_ascii_case("all") {
        return Ok(Measure::ALL.to_vec());
    }
    Ok(vec![name.parse::<Measure>()?])
}

fn parse_id(text: &str) -> Result<ConceptId> {
    text.parse::<ConceptId>()
        .with_context(|| format!("invalid concept id '{}'", text))
}

fn describe(graph: &ConceptGraph, id: ConceptId) -> String {
    match graph.concept(id) {
        Some(concept) => concept.display_name(),
        None => id.to_string(),
    }
}

fn run_pair(
    config: &EngineConfig,
    snapshot: &Path,
    measure: &str,
    a: &str,
    b: &str,
    format: &OutputFormat,
) -> Result<()> {
    let measures = parse_measures(measure)?;
    let (a, b) = (parse_id(a)?, parse_id(b)?);
    let graph = load_graph(snapshot)?;
    let engine = pipeline::engine(&graph, config)?;

    let lca = engine.paths().lca_result(a, b)?;
    let length = engine.shortest_path_length(a, b)?;
    let scores: Vec<(Measure, f64)> = measures
        .iter()
        .map(|&m| engine.score(m, a, b).map(|v| (m, v)))
        .collect::<Result<_, _>>()?;

    match format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "a": a,
                "b": b,
                "shortest_path": length,
                "lca": lca.ancestor,
                "lca_depth": lca.depth,
                "scores": scores
                    .iter()
                    .map(|(m, v)| (m.name().to_string(), serde_json::json!(v)))
                    .collect::<serde_json::Map<_, _>>(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => {
            println!("A:             {}", describe(&graph, a));
            println!("B:             {}", describe(&graph, b));
            println!("Shortest path: {}", length);
            println!(
                "LCA:           {} (depth {}, {} + {} hops)",
                describe(&graph, lca.ancestor),
                lca.depth.map_or("n/a".to_string(), |d| d.to_string()),
                lca.dist_a,
                lca.dist_b
            );

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Measure", "Kind", "Value"]);
            for (m, v) in &scores {
                let kind = if m.is_distance() { "distance" } else { "similarity" };
                let value = if v.is_nan() {
                    config.output.missing_label.clone()
                } else {
                    format!("{:.6}", v)
                };
                table.add_row(vec![m.name().to_string(), kind.to_string(), value]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

#[allow(clippy::too_many_arguments)]
fn run_matrix(
    config: &EngineConfig,
    snapshot: &Path,
    concepts: &Path,
    measure: &str,
    out: &Path,
    matrix_format: MatrixFormat,
    workers: usize,
    format: &OutputFormat,
) -> Result<()> {
    let measure: Measure = measure.parse()?;
    let labels = read_concept_list(open(concepts)?)
        .with_context(|| format!("reading concept list {}", concepts.display()))?;
    if labels.is_empty() {
        bail!("concept list {} is empty", concepts.display());
    }

    let graph = load_graph(snapshot)?;
    let engine = pipeline::engine(&graph, config)?;
    let matrix = MatrixAssembler::new(&engine)
        .workers(workers)
        .assemble(&labels, measure)?;
    write_matrix_file(&matrix, out, matrix_format, &config.output.missing_label)?;
    info!("Wrote {}", out.display());

    let summary = matrix.summary();
    match format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "summary": summary,
                "unresolved_ids": matrix.unresolved(),
                "out": out.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => {
            print_summary(&summary);
            for id in matrix.unresolved() {
                println!("unresolved: {}", id);
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &MatrixSummary) {
    let cell = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{:.6}", v));

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Measure", "Size", "Unresolved", "Pairs", "Missing", "Min", "Max", "Mean", "Median"]);
    table.add_row(vec![
        summary.measure.to_string(),
        summary.size.to_string(),
        summary.unresolved.to_string(),
        summary.pairs.to_string(),
        summary.missing_pairs.to_string(),
        cell(summary.min),
        cell(summary.max),
        cell(summary.mean),
        cell(summary.median),
    ]);
    println!("{}", table);
}

fn matrix_labels(config: &EngineConfig, path: &Path) -> Result<Vec<String>> {
    let name = path.display().to_string();
    match MatrixFormat::from_path(path) {
        MatrixFormat::Json => {
            let doc: serde_json::Value = serde_json::from_reader(open(path)?)?;
            let Some(ids) = doc["ids"].as_array() else {
                bail!("{} has no 'ids' array", name);
            };
            Ok(ids
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect())
        }
        MatrixFormat::Delimited(sep) => {
            let sep = if sep == '\t' { config.output.delimiter } else { sep };
            let matrix = read_delimited(&name, open(path)?, sep, &config.output.missing_label)?;
            Ok(matrix.labels)
        }
    }
}

fn run_coverage(
    config: &EngineConfig,
    concepts: &Path,
    matrix: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let list = read_concept_list(open(concepts)?)
        .with_context(|| format!("reading concept list {}", concepts.display()))?;
    let labels = matrix_labels(config, matrix)?;
    let report = CoverageReport::compute(&list, &labels);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            println!("{}", report);
            for id in &report.only_in_list {
                println!("missing from matrix: {}", id);
            }
        }
    }
    Ok(())
}
