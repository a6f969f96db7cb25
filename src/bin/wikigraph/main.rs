//! Binary entry point for the wikigraph CLI.
#![forbid(unsafe_code)]

mod config;

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use wikigraph::{
    admin::{stats, verify, StatsReport, VerifyLevel, VerifyReport},
    cli::{
        import::{open_source, InputFormat},
        logging::init_logging,
    },
    convert, ConvertOptions, ConvertSummary, GraphReader, NodeId, UnresolvedTargets,
};

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(
    name = "wikigraph",
    version,
    about = "Build and query compressed wiki link graphs",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "WIKIGRAPH_CONFIG",
        value_name = "FILE",
        help = "Path to config.toml"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "WIKIGRAPH_LOG",
        value_name = "FILTER",
        help = "Log filter directive (e.g. info, wikigraph=debug)"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct StoreArgs {
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    #[arg(value_name = "MAP")]
    map: PathBuf,
}

#[derive(Args, Debug)]
struct ConvertCmd {
    #[arg(value_name = "INPUT", help = "Link dump (JSON lines or TSV)")]
    input: PathBuf,

    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, value_enum, help = "Input layout (detected from extension by default)")]
    input_format: Option<InputFormatArg>,

    #[arg(long, value_name = "NODES", help = "Nodes per compressed block")]
    block_size: Option<u32>,

    #[arg(
        long,
        conflicts_with = "insert_missing",
        help = "Fail when a link target is not a known page"
    )]
    strict: bool,

    #[arg(long, help = "Add unknown link targets as pages without links")]
    insert_missing: bool,

    #[arg(long, help = "Decode every block after writing and compare")]
    verify_blocks: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a link dump into a graph file and title map
    Convert(ConvertCmd),
    /// List the pages a page links to
    Neighbors {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(
            value_name = "NODE",
            allow_negative_numbers = true,
            required_unless_present = "title"
        )]
        node: Option<i64>,
        #[arg(long, conflicts_with = "node", help = "Look the page up by title")]
        title: Option<String>,
    },
    /// Print the title of a node
    Title {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(value_name = "NODE", allow_negative_numbers = true)]
        node: i64,
    },
    /// Print the node id of a title
    Resolve {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Check the graph file for damage
    Verify {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long, value_enum, default_value_t = VerifyLevelArg::Fast)]
        level: VerifyLevelArg,
    },
    /// Print size and layout statistics
    Stats {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputFormatArg {
    Jsonl,
    Tsv,
}

impl From<InputFormatArg> for InputFormat {
    fn from(format: InputFormatArg) -> Self {
        match format {
            InputFormatArg::Jsonl => InputFormat::Jsonl,
            InputFormatArg::Tsv => InputFormat::Tsv,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VerifyLevelArg {
    Fast,
    Full,
}

impl From<VerifyLevelArg> for VerifyLevel {
    fn from(level: VerifyLevelArg) -> Self {
        match level {
            VerifyLevelArg::Fast => VerifyLevel::Fast,
            VerifyLevelArg::Full => VerifyLevel::Full,
        }
    }
}

#[derive(Serialize)]
struct NodeView<'a> {
    id: NodeId,
    title: &'a str,
}

#[derive(Serialize)]
struct NeighborsView<'a> {
    node: NodeView<'a>,
    neighbors: Vec<NodeView<'a>>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.clone())?;
    let log_level = cli
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or("warn");
    init_logging(log_level)?;

    match cli.command {
        Command::Convert(cmd) => {
            let options = build_convert_options(&cmd, &config);
            let summary = run_convert(&cmd, &options)?;
            emit(&cli.format, &summary, || print_convert_text(&summary))?;
        }
        Command::Neighbors { store, node, title } => {
            let reader = GraphReader::open(&store.graph, &store.map)?;
            let id = match (title, node) {
                (Some(title), _) => reader.resolve_title(&title)?,
                (None, Some(raw)) => reader.node(raw)?,
                (None, None) => return Err("either NODE or --title is required".into()),
            };
            let neighbors = reader
                .get_neighbors(id)?
                .into_iter()
                .map(|n| view(&reader, n))
                .collect::<Result<Vec<_>, _>>()?;
            let result = NeighborsView {
                node: view(&reader, id)?,
                neighbors,
            };
            emit(&cli.format, &result, || {
                for neighbor in &result.neighbors {
                    println!("{}\t{}", neighbor.id, neighbor.title);
                }
            })?;
        }
        Command::Title { store, node } => {
            let reader = GraphReader::open(&store.graph, &store.map)?;
            let result = view(&reader, reader.node(node)?)?;
            emit(&cli.format, &result, || println!("{}", result.title))?;
        }
        Command::Resolve { store, title } => {
            let reader = GraphReader::open(&store.graph, &store.map)?;
            let result = view(&reader, reader.resolve_title(&title)?)?;
            emit(&cli.format, &result, || println!("{}", result.id))?;
        }
        Command::Verify { store, level } => {
            let report = verify(&store.graph, &store.map, level.into())?;
            emit(&cli.format, &report, || print_verify_text(&report))?;
            if !report.success {
                std::process::exit(2);
            }
        }
        Command::Stats { store } => {
            let report = stats(&store.graph, &store.map)?;
            emit(&cli.format, &report, || print_stats_text(&report))?;
        }
    }

    Ok(())
}

fn view(reader: &GraphReader, id: NodeId) -> wikigraph::Result<NodeView<'_>> {
    Ok(NodeView {
        id,
        title: reader.get_title(id)?,
    })
}

fn build_convert_options(cmd: &ConvertCmd, config: &CliConfig) -> ConvertOptions {
    let mut options = ConvertOptions::new();
    if let Some(block_size) = cmd.block_size.or(config.convert.block_size) {
        options = options.block_size(block_size);
    }
    let unresolved = if cmd.strict {
        Some(UnresolvedTargets::Fail)
    } else if cmd.insert_missing {
        Some(UnresolvedTargets::Insert)
    } else {
        config.convert.unresolved
    };
    if let Some(policy) = unresolved {
        options = options.unresolved(policy);
    }
    options.verify_blocks(cmd.verify_blocks || config.convert.verify_blocks.unwrap_or(false))
}

fn run_convert(cmd: &ConvertCmd, options: &ConvertOptions) -> wikigraph::Result<ConvertSummary> {
    let source = open_source(&cmd.input, cmd.input_format.map(Into::into))?;
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} records read {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    let counted = source.inspect(|_| pb.inc(1));
    let result = convert(counted, &cmd.store.graph, &cmd.store.map, options);
    pb.finish_and_clear();
    result
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_convert_text(summary: &ConvertSummary) {
    println!(
        "Converted {} pages and {} links into {} blocks ({} bytes graph, {} bytes map)",
        summary.node_count,
        summary.edge_count,
        summary.block_count,
        summary.graph_bytes,
        summary.map_bytes
    );
    println!(
        "  records={} malformed={} merged={} unresolved={} inserted={} duplicates={} self_loops={}",
        summary.records_read,
        summary.malformed_records,
        summary.merged_records,
        summary.unresolved_links,
        summary.inserted_targets,
        summary.duplicate_links,
        summary.self_loops
    );
}

fn print_verify_text(report: &VerifyReport) {
    println!(
        "Verify ({:?}) => success={} blocks_checked={} corrupt_blocks={} nodes={} edges={} titles={}",
        report.level,
        report.success,
        report.counts.blocks_checked,
        report.counts.corrupt_blocks,
        report.counts.nodes_decoded,
        report.counts.edges_decoded,
        report.counts.titles,
    );
    for finding in &report.findings {
        println!("- {:?}: {}", finding.severity, finding.message);
    }
}

fn print_stats_text(report: &StatsReport) {
    println!("Graph: {} ({} bytes)", report.path, report.file_bytes);
    println!(
        "  nodes={} titles={} blocks={} max_block_nodes={}",
        report.node_count, report.titles, report.block_count, report.max_block_nodes
    );
    println!(
        "  compressed_bytes={} min_block={} max_block={} index_offset={} index_bytes={}",
        report.compressed_bytes,
        report.min_block_bytes,
        report.max_block_bytes,
        report.index_offset,
        report.index_bytes
    );
}
