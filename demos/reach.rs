//! Reachability analysis of an AIGER circuit.
//!
//! Run with:
//! ```bash
//! cargo run --release --example reach -- circuit.aag [--max-cubes N] [--verbose]
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use era_rs::aiger::read_aag;
use era_rs::config::{EraConfig, Traversal, TreeCheck};
use era_rs::reach::{Explorer, ReachStatus};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum TraversalArg {
    Fast,
    Exact,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum TreeCheckArg {
    Collect,
    Recursive,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Explicit-state reachability over ternary state cubes")]
struct Cli {
    /// Input circuit in ASCII AIGER format
    input: PathBuf,

    /// Stop after this many state cubes
    #[arg(long)]
    max_cubes: Option<usize>,

    /// Enumerator calls allowed per state
    #[arg(long, default_value = "1000000")]
    max_calls: u64,

    /// Bucket size that triggers a compress or split
    #[arg(long, default_value = "63")]
    bucket_limit: u8,

    /// Keep exploring when an output is asserted
    #[arg(long)]
    no_stop: bool,

    #[arg(long, value_enum, default_value = "fast")]
    traversal: TraversalArg,

    #[arg(long, value_enum, default_value = "collect")]
    tree_check: TreeCheckArg,

    /// Print progress and statistics
    #[arg(short, long)]
    verbose: bool,

    /// Write the final cube index in DOT format
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print the retained state cubes
    #[arg(long)]
    print_cubes: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Info
        } else {
            simplelog::LevelFilter::Warn
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let aig = read_aag(&cli.input)?;
    println!(
        "{}: {} inputs, {} registers, {} outputs, {} ANDs",
        cli.input.display(),
        aig.num_pis(),
        aig.num_regs(),
        aig.num_outputs(),
        aig.num_ands()
    );

    let mut config = EraConfig::default()
        .with_max_calls(cli.max_calls)
        .with_bucket_limit(cli.bucket_limit)
        .with_stop_on_bad(!cli.no_stop && aig.num_outputs() > 0)
        .with_verbose(cli.verbose)
        .with_traversal(match cli.traversal {
            TraversalArg::Fast => Traversal::Fast,
            TraversalArg::Exact => Traversal::Exact,
        })
        .with_tree_check(match cli.tree_check {
            TreeCheckArg::Collect => TreeCheck::Collect,
            TreeCheckArg::Recursive => TreeCheck::Recursive,
        });
    if let Some(max_cubes) = cli.max_cubes {
        config = config.with_max_cubes(max_cubes);
    }

    let mut explorer = Explorer::new(&aig, config)?;
    let status = explorer.run();

    match &status {
        ReachStatus::Exhausted => {
            println!("Reachable state space exhausted with {} cubes.", explorer.num_discovered());
            println!("Volume of retained cubes: {}", explorer.volume());
        }
        ReachStatus::BadState { output, trace } => {
            println!("Output {} is asserted.", output);
            match trace {
                Ok(trace) => {
                    println!("Counter-example of {} frames:", trace.len());
                    let bits = |v: &[bool]| v.iter().map(|&b| if b { '1' } else { '0' }).collect::<String>();
                    println!("  init: {}", bits(&trace.init));
                    for (frame, pis) in trace.inputs.iter().enumerate() {
                        println!("  {:>4}: {}", frame, bits(pis));
                    }
                }
                Err(e) => println!("No counter-example: {}", e),
            }
        }
        ReachStatus::Stopped(reason) => println!("Stopped: {}.", reason),
    }

    if cli.print_cubes {
        for cube in explorer.retained_cubes() {
            println!("{}", cube);
        }
    }
    if let Some(path) = &cli.dot {
        std::fs::write(path, explorer.index().to_dot(explorer.arena())?)?;
        println!("Index written to {}", path.display());
    }

    println!("stats = {}", explorer.stats());
    println!("Total time: {:.2?}", time_total.elapsed());
    Ok(())
}
