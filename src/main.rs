use std::{fs, process};

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use cindersat::{Config, Result, Solver};

fn main() {
    let matches = Command::new("cindersat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A CDCL SAT solver")
        .arg(
            Arg::new("verb")
                .long("verb")
                .takes_value(true)
                .possible_values(["0", "1", "2"])
                .help("Verbosity level (0=silent, 1=some, 2=more)"),
        )
        .arg(
            Arg::new("var-decay")
                .long("var-decay")
                .takes_value(true)
                .help("The variable activity decay factor"),
        )
        .arg(
            Arg::new("cla-decay")
                .long("cla-decay")
                .takes_value(true)
                .help("The clause activity decay factor"),
        )
        .arg(
            Arg::new("restart-interval")
                .long("restart-interval")
                .takes_value(true)
                .help("The base restart interval in conflicts"),
        )
        .arg(
            Arg::new("reduce-interval")
                .long("reduce-interval")
                .takes_value(true)
                .help("Conflicts between learned clause database reductions"),
        )
        .arg(
            Arg::new("no-model")
                .long("no-model")
                .help("Do not print the model of a satisfiable formula"),
        )
        .arg(
            Arg::new("input")
                .required(true)
                .help("DIMACS CNF input file"),
        )
        .get_matches();

    let level = match matches.value_of("verb").unwrap_or("1") {
        "0" => LevelFilter::OFF,
        "2" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&matches) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("c error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config = config_from_args(matches);

    let path = matches.value_of("input").expect("input is required");
    let input = fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;

    let mut solver = Solver::from_dimacs_with_config(&input, config)
        .with_context(|| format!("cannot parse {path}"))?;

    info!("parsed {} variables, {} clauses", solver.num_vars(), solver.num_clauses());

    let result = solver.solve();

    let exit_code = match &result {
        Result::Sat(model) => {
            println!("s SATISFIABLE");
            if !matches.is_present("no-model") {
                let lits: Vec<String> = model.as_vec().iter().map(i32::to_string).collect();
                println!("v {} 0", lits.join(" "));
            }
            10
        }
        Result::Unsat(_) => {
            println!("s UNSATISFIABLE");
            20
        }
    };

    let stats = solver.stats();
    info!("restarts       : {}", stats.restarts);
    info!("contradictions : {}", stats.contradictions);
    info!("decisions      : {}", stats.decisions);
    info!("propagations   : {}", stats.propagations);
    info!(
        "learned        : {} ({} deleted in {} reductions)",
        stats.learned_clauses, stats.deleted_clauses, stats.reductions
    );

    Ok(exit_code)
}

fn config_from_args(matches: &ArgMatches) -> Config {
    let mut config = Config::default();

    if let Some(x) = matches.value_of("var-decay").and_then(|s| s.parse().ok()) {
        if 0.0 < x && x < 1.0 {
            config.var_decay = x;
        }
    }
    if let Some(x) = matches.value_of("cla-decay").and_then(|s| s.parse().ok()) {
        if 0.0 < x && x < 1.0 {
            config.clause_decay = x;
        }
    }
    if let Some(x) = matches.value_of("restart-interval").and_then(|s| s.parse().ok()) {
        if x > 0 {
            config.restart_interval = x;
        }
    }
    if let Some(x) = matches.value_of("reduce-interval").and_then(|s| s.parse().ok()) {
        if x > 0 {
            config.reduce_interval = x;
        }
    }

    config
}
