use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use cfgc_compiler::{
    BackendKind, CompileReport, Compiler, Document, ResolvedValue, StoreReader, StoreSnapshot,
};
use cfgc_store::FileProvider;
use cfgc_types::{AccessRights, StoreLayout};
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Compile(args) => cmd_compile(args, cli.format),
        Command::Count(args) => cmd_count(args, cli.format),
        Command::Dump(args) => cmd_dump(args, cli.format),
    }
}

fn load_layout(path: Option<&Path>) -> anyhow::Result<StoreLayout> {
    let Some(path) = path else {
        return Ok(StoreLayout::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read layout file {}", path.display()))?;
    let layout = StoreLayout::from_toml_str(&text)
        .with_context(|| format!("invalid layout file {}", path.display()))?;
    debug!(?layout, "layout loaded");
    Ok(layout)
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    Document::load(path).with_context(|| format!("cannot load {}", path.display()))
}

fn cmd_compile(args: CompileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let layout = load_layout(args.layout.as_deref())?;
    let doc = load_document(&args.input)?;
    let report = Compiler::new(layout)?
        .compile_to_dir(&doc, &args.output, args.force)
        .with_context(|| format!("compilation of {} failed", args.input.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!(
                "{} Compiled {} into {}",
                "✓".green().bold(),
                args.input.display().to_string().bold(),
                args.output.display().to_string().bold()
            );
            print_backends(&report);
        }
    }
    Ok(())
}

fn cmd_count(args: CountArgs, format: OutputFormat) -> anyhow::Result<()> {
    let layout = load_layout(args.layout.as_deref())?;
    let doc = load_document(&args.input)?;
    let counts = Compiler::new(layout)?
        .count(&doc)
        .with_context(|| format!("counting {} failed", args.input.display()))?;
    let report = CompileReport::new(counts, layout);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{}", args.input.display().to_string().bold());
            print_backends(&report);
        }
    }
    Ok(())
}

fn cmd_dump(args: DumpArgs, format: OutputFormat) -> anyhow::Result<()> {
    if !args.store.is_dir() {
        bail!("store directory {} does not exist", args.store.display());
    }
    let provider = FileProvider::new(&args.store)?;
    let mut reader = StoreReader::open(&provider)
        .with_context(|| format!("cannot open store {}", args.store.display()))?;
    let snapshot = reader
        .snapshot()
        .with_context(|| format!("cannot decode store {}", args.store.display()))?;
    reader.close()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Text => print_snapshot(&snapshot),
    }
    Ok(())
}

fn print_backends(report: &CompileReport) {
    for kind in BackendKind::ALL {
        println!(
            "  {:<11} {:>6} records x {:>5} bytes  {:>9} bytes on disk",
            kind.file_name().cyan(),
            kind.capacity(&report.counts),
            kind.record_size(&report.layout),
            report.file_bytes(kind),
        );
    }
    println!("  {:<11} {:>40} bytes", "total".bold(), report.total_file_bytes());
}

fn print_snapshot(snapshot: &StoreSnapshot) {
    for domain in &snapshot.domains {
        println!(
            "{} {} {}",
            "domain".dimmed(),
            domain.index.to_string().yellow(),
            domain.name.bold()
        );
        for param in &domain.parameters {
            println!(
                "  [{}] {}: {} = {}  (read: {}, write: {})",
                param.index,
                param.name.bold(),
                param.param_type.to_string().cyan(),
                describe_value(&param.value),
                describe_access(param.read),
                describe_access(param.write),
            );
        }
    }
    if snapshot.domains.is_empty() {
        println!("Store is empty.");
    }
}

fn describe_value(value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::Integer32(v) => v.to_string(),
        ResolvedValue::Integer64(v) => v.to_string(),
        ResolvedValue::String(s) => format!("{s:?}"),
        ResolvedValue::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

fn describe_access(rights: AccessRights) -> &'static str {
    if rights.is_granted() {
        "all"
    } else {
        "none"
    }
}
