//! CLI driver for the Quarry subgraph miner: loads a TOML job spec, builds the shared query, and
//! mines each user's triple file in turn.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use itertools::Itertools;
use kgraph::{Schema, SymbolTable, TripleRow};
use log::LevelFilter;
use quarry::{support_threshold, Mined, Miner, Query};
use structopt::StructOpt;

use self::spec::MineSpec;

mod spec;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "quarry",
    about = "Mine frequent subgraph patterns from per-user knowledge graphs."
)]
struct Args {
    /// Path to the TOML spec of the mining job
    #[structopt(parse(from_os_str))]
    spec: PathBuf,
    /// Only process the first N users (sorted by file name)
    #[structopt(long)]
    limit: Option<usize>,
    /// Verbosity: `-v` for debug logs, `-vv` for trace logs
    #[structopt(short, parse(from_occurrences))]
    verbose: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::from_args();
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;
    run(&args)
}

fn run(args: &Args) -> anyhow::Result<()> {
    let spec = MineSpec::read_from_file(&args.spec)?;

    // Seed one symbol table with every schema term, then hand each user a clone of it
    let mut symbols = SymbolTable::new();
    let schema_src = fs::read_to_string(&spec.schema)
        .with_context(|| format!("Can't read schema file {:?}", spec.schema))?;
    let schema = Schema::parse(&schema_src, &mut symbols)?;
    let query = Query::new(schema, &spec.parameters(), &mut symbols);
    log::info!(
        "{} schema paths from {} to {{{}}}",
        query.paths().len(),
        spec.start_class,
        spec.end_classes.iter().join(", ")
    );
    let chunk_types = quarry::classify::classify(&query);
    log::debug!(
        "schema chunking types: {}",
        chunk_types
            .iter()
            .map(|(pid, ty)| {
                let name = symbols.resolve(query.schema()[*pid].name);
                format!("{}: {:?}", name, ty)
            })
            .join(", ")
    );

    fs::create_dir_all(&spec.output_dir)
        .with_context(|| format!("Can't create output directory {:?}", spec.output_dir))?;

    let mut user_files = triple_files(&spec.triples_dir)?;
    user_files.sort();
    if let Some(limit) = args.limit {
        user_files.truncate(limit);
    }
    log::info!("processing {} users", user_files.len());

    for path in &user_files {
        let user = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("user")
            .to_owned();
        // A user failing (or being skipped) only costs that user's output files
        if let Err(e) = process_user(&user, path, &spec, &query, &symbols) {
            log::warn!("user {} failed: {:#}", user, e);
        }
    }
    Ok(())
}

fn triple_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Can't read triples directory {:?}", dir))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "triples") {
            files.push(path);
        }
    }
    Ok(files)
}

fn process_user(
    user: &str,
    path: &Path,
    spec: &MineSpec,
    query: &Query,
    symbols: &SymbolTable,
) -> anyhow::Result<()> {
    let src = fs::read_to_string(path)?;
    let rows = src
        .lines()
        .filter(|line| !line.is_empty())
        .map(TripleRow::parse)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Malformed triple row in {:?}", path))?;

    // One watching event per distinct start-class individual
    let mut events: BTreeSet<&str> = BTreeSet::new();
    for row in &rows {
        if row.subj_class == spec.start_class {
            events.insert(&row.subj_instance);
        }
        if row.obj_class == spec.start_class {
            events.insert(&row.obj_instance);
        }
    }
    let Some(threshold) = support_threshold(events.len()) else {
        log::info!("skipping user {} ({} watching events)", user, events.len());
        return Ok(());
    };

    log::info!(
        "user {}: {} triples, {} watching events, threshold {}",
        user,
        rows.len(),
        events.len(),
        threshold
    );
    let mined = Miner::new(query, symbols.clone()).mine(&rows, threshold)?;
    log::info!(
        "user {}: {} chunked triples, {} top-level patterns",
        user,
        mined.patterns.len(),
        mined.stacks.len()
    );

    write_results(user, &spec.output_dir, &mined)
}

fn write_results(user: &str, output_dir: &Path, mined: &Mined) -> anyhow::Result<()> {
    let patterns: serde_json::Map<String, serde_json::Value> = mined
        .patterns
        .iter()
        .map(|(tid, record)| {
            let fields = serde_json::json!([
                record.depth,
                record.left,
                record.property,
                record.right,
                record.witness,
                record.active,
            ]);
            (tid.clone(), fields)
        })
        .collect();
    let stacks: Vec<serde_json::Value> = mined
        .stacks
        .iter()
        .map(|stack| {
            let mut entry = vec![
                serde_json::json!(stack.freq),
                serde_json::json!(stack.witness),
            ];
            entry.extend(stack.members.iter().map(|member| serde_json::json!(member)));
            serde_json::Value::Array(entry)
        })
        .collect();

    let patterns_path = output_dir.join(format!("{}_patterns.json", user));
    let stacks_path = output_dir.join(format!("{}_subgraphs.json", user));
    fs::write(
        &patterns_path,
        serde_json::to_string_pretty(&serde_json::Value::Object(patterns))?,
    )
    .with_context(|| format!("Can't write {:?}", patterns_path))?;
    fs::write(
        &stacks_path,
        serde_json::to_string_pretty(&serde_json::Value::Array(stacks))?,
    )
    .with_context(|| format!("Can't write {:?}", stacks_path))?;
    Ok(())
}
