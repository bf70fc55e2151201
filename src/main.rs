extern crate structopt;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

use structopt::StructOpt;

use fm_mdd_count::config::{Config, UnresolvedVarPolicy};
use fm_mdd_count::implementation::dd::ReducedForest;
use fm_mdd_count::model::xml;
use fm_mdd_count::pipeline;
use fm_mdd_count::synth;

fn main() {
    let args = Args::from_args();
    env_logger::Builder::new()
        .filter_level(verbosity_to_level_filter(args.verbose))
        .init();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        exit(1);
    }
}

/// Counts the valid configurations of a feature model via a symbolic MDD
/// pipeline and appends one result line to the output file.
#[derive(StructOpt)]
#[structopt(name = "fm-mdd-count")]
struct Args {
    /// Path to the feature model (XML) to count.
    #[structopt(short = "m", long = "model")]
    model: PathBuf,

    /// Path to the output file; the result line is appended.
    #[structopt(short = "o", long = "out")]
    out: PathBuf,

    /// Number of consecutive compiled constraint edges intersected together
    /// before being applied to the running diagram.
    #[structopt(short = "r", long = "reduction", default_value = "1")]
    reduction: usize,

    /// Merge small AND-groups of leaf features into one bitmask variable.
    #[structopt(long = "merge-and")]
    merge_and: bool,

    /// Maximum child count for an AND-group to be eligible for --merge-and.
    #[structopt(long = "merge-and-threshold", default_value = "5")]
    merge_and_threshold: usize,

    /// Enable the backend's dynamic variable reordering under growth thresholds.
    #[structopt(long = "reorder")]
    reorder: bool,

    /// Skip hidden features while synthesizing variables.
    #[structopt(long = "ignore-hidden")]
    ignore_hidden: bool,

    /// Sort cross-tree constraints by node-count before applying them.
    #[structopt(long = "sort-when-applying")]
    sort_when_applying: bool,

    /// Shuffle cross-tree constraints (seeded by --seed) before batching.
    #[structopt(long = "shuffle")]
    shuffle: bool,

    /// PRNG seed for --shuffle; fixed by default so runs reproduce.
    #[structopt(long = "seed", default_value = "6840403706312052749")]
    seed: u64,

    /// Raise log verbosity (repeatable).
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,
}

fn verbosity_to_level_filter(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn run(args: &Args) -> fm_mdd_count::error::Result<()> {
    let config = Config {
        ignore_hidden: args.ignore_hidden,
        sort_when_applying: args.sort_when_applying,
        shuffle_constraints: args.shuffle,
        seed: args.seed,
        reorder_variables: args.reorder,
        compress_and: args.merge_and,
        compress_and_threshold: args.merge_and_threshold,
        reduction_factor: args.reduction.max(1),
        on_unresolved_var: UnresolvedVarPolicy::WarnAndIgnore,
    };

    let start_time = Instant::now();

    log::info!("loading model from {}", args.model.display());
    let model = xml::load(&args.model)?;

    log::info!("synthesizing variables");
    let schema = synth::build(&model.root, &config)?;
    log::debug!("schema has {} variables", schema.nb_vars());

    let domains: Vec<usize> = (0..schema.nb_vars())
        .map(|i| schema.domain_size(fm_mdd_count::common::VarIndex(i)))
        .collect();
    let mut forest = ReducedForest::new(domains);

    log::info!("folding structural and cross-tree constraints");
    let outcome = pipeline::run(&mut forest, &schema, &model.constraints, &config)?;
    for warning in &outcome.warnings {
        log::warn!("{}", warning);
    }

    let seconds = start_time.elapsed().as_secs_f64();
    let line = format!(
        "{};{};{};{};{};{};{};{};{}",
        args.model.display(),
        outcome.cardinality,
        seconds,
        args.reduction,
        args.merge_and,
        args.merge_and_threshold,
        args.reorder,
        outcome.watermarks.max_edges,
        outcome.watermarks.max_nodes,
    );
    log::info!("{}", line);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.out)
        .map_err(|source| fm_mdd_count::error::Error::Io {
            path: args.out.clone(),
            source,
        })?;
    writeln!(file, "{}", line).map_err(|source| fm_mdd_count::error::Error::Io {
        path: args.out.clone(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_escalates_from_warn_to_trace() {
        assert_eq!(verbosity_to_level_filter(0), log::LevelFilter::Warn);
        assert_eq!(verbosity_to_level_filter(1), log::LevelFilter::Info);
        assert_eq!(verbosity_to_level_filter(2), log::LevelFilter::Debug);
        assert_eq!(verbosity_to_level_filter(3), log::LevelFilter::Trace);
    }
}
