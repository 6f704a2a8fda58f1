use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};

use mealplan_pipeline::tuner::thread_candidates;
use mealplan_pipeline::{
    DEFAULT_CONFIG_FILE, Dataset, LoadMode, MealPlanner, ModelBuilder, PlanObjective,
    SolveRequest, Tuner, default_engine, load_targets,
};
use mealplan_solver::presolve;
use mealplan_solver::{ErrorKind, OptionValue, SolverOptions, preflight};

#[derive(Parser)]
#[command(name = "mealplan")]
#[command(about = "Daily meal plans that hit nutrient targets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve for a meal plan and print it
    Solve {
        /// CSV file with one meal per row
        dataset: PathBuf,
        /// Tuner config holding default solver options
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Re-tune solver options before solving
        #[arg(long)]
        tune: bool,
        /// Presolve the model first
        #[arg(long)]
        presolve: bool,
        /// JSON file with nutrient targets
        #[arg(long)]
        targets: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "feasibility")]
        objective: ObjectiveArg,
        /// Reject unreadable numbers instead of loading them as NaN
        #[arg(long)]
        strict: bool,
        /// Solver option as key=value, overrides the config (repeatable)
        #[arg(short, long = "option", value_parser = parse_option)]
        options: Vec<(String, OptionValue)>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Time solver thread counts and save the fastest
    Tune {
        dataset: PathBuf,
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Thread counts to try
        #[arg(long, value_delimiter = ',', default_value = "1,2,4")]
        threads: Vec<i64>,
    },
    /// Print column counts before and after presolve
    PresolveStats {
        dataset: PathBuf,
    },
    /// Load a dataset and report problems without solving
    Check {
        dataset: PathBuf,
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectiveArg {
    Feasibility,
    MinCost,
}

impl From<ObjectiveArg> for PlanObjective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::Feasibility => PlanObjective::Feasibility,
            ObjectiveArg::MinCost => PlanObjective::MinimizeCost,
        }
    }
}

fn parse_option(s: &str) -> Result<(String, OptionValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in '{}'", s));
    }
    Ok((key.to_string(), OptionValue::parse(value)))
}

fn load_dataset(path: &Path, strict: bool) -> Dataset {
    let mode = if strict { LoadMode::Strict } else { LoadMode::Lenient };
    match Dataset::from_path(path, mode) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Dataset error: {}", e);
            std::process::exit(1);
        }
    }
}

fn check_backend() {
    let mut engine = default_engine();
    if let Err(e) = preflight(&mut engine) {
        eprintln!("Solver backend unusable: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            dataset,
            config,
            tune,
            presolve,
            targets,
            objective,
            strict,
            options,
            json,
        } => {
            check_backend();
            let data = load_dataset(&dataset, strict);

            let mut builder = ModelBuilder::new().with_objective(objective.into());
            if let Some(path) = targets {
                match load_targets(&path) {
                    Ok(t) => builder = builder.with_targets(t),
                    Err(e) => {
                        eprintln!("Targets error: {}", e);
                        std::process::exit(1);
                    }
                }
            }

            let request = SolveRequest {
                config_path: config,
                overrides: options.into_iter().collect::<SolverOptions>(),
                auto_tune: tune,
                presolve,
            };

            let outcome = match MealPlanner::with_default_engine(builder).plan(&data, &request) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("Solve error: {}", e);
                    std::process::exit(1);
                }
            };
            let diagnostic = outcome.solve.diagnostic();

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome)
                        .unwrap_or_else(|e| format!("Error: cannot serialize outcome: {}", e))
                );
            } else {
                match &diagnostic {
                    None => println!("Status: OPTIMAL"),
                    Some(err) => println!("Status: {} ({})", err.code, outcome.solve.status),
                }
                if let Some(report) = &outcome.report {
                    println!();
                    print!("{}", report);
                }
            }

            if let Some(err) = diagnostic {
                eprintln!("{}: {}", err.code, err.message);
                if err.code != ErrorKind::Numerical {
                    std::process::exit(1);
                }
            }
        }
        Commands::Tune {
            dataset,
            config,
            threads,
        } => {
            check_backend();
            let data = load_dataset(&dataset, false);
            let builder = ModelBuilder::new();

            let report = match Tuner::new(default_engine)
                .with_candidates(thread_candidates(&threads))
                .tune(&data, |d: &Dataset| builder.build(d), &config)
            {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Tuning error: {}", e);
                    std::process::exit(1);
                }
            };

            println!("Trials:");
            for trial in &report.trials {
                let params = serde_json::to_string(&trial.params).unwrap_or_default();
                match trial.elapsed {
                    Some(elapsed) => println!("  {:30} {:>10.3} ms", params, elapsed.as_secs_f64() * 1000.0),
                    None => println!("  {:30} {:>10}", params, "failed"),
                }
            }
            println!();
            println!(
                "Best: {} (saved to {})",
                serde_json::to_string(&report.best).unwrap_or_default(),
                config.display()
            );
        }
        Commands::PresolveStats { dataset } => {
            let data = load_dataset(&dataset, false);
            let stats = presolve::stats(&ModelBuilder::new().build(&data));
            println!(
                "{}",
                serde_json::to_string(&stats).unwrap_or_else(|_| format!("{:?}", stats))
            );
        }
        Commands::Check { dataset, strict } => {
            let data = load_dataset(&dataset, strict);
            let model = ModelBuilder::new().build(&data);

            if let Err(e) = model.validate() {
                eprintln!("Model error: {}", e);
                std::process::exit(1);
            }

            let unreadable = data.count_unreadable();
            println!("Meals: {}", data.meal_count());
            println!("Priced: {}", data.prices.iter().filter(|p| p.is_some()).count());
            if unreadable > 0 {
                eprintln!("{} meal(s) have unreadable nutrient values", unreadable);
                std::process::exit(1);
            }
            println!("OK");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("threads=4").unwrap(),
            ("threads".to_string(), OptionValue::Int(4))
        );
        assert_eq!(
            parse_option("solver = simplex").unwrap(),
            ("solver".to_string(), OptionValue::Str("simplex".to_string()))
        );
        assert!(parse_option("threads").is_err());
        assert!(parse_option("=4").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "mealplan", "solve", "meals.csv", "--presolve", "-o", "threads=2", "--objective", "min-cost",
        ])
        .unwrap();
        match cli.command {
            Commands::Solve {
                presolve,
                options,
                objective,
                config,
                ..
            } => {
                assert!(presolve);
                assert_eq!(options, vec![("threads".to_string(), OptionValue::Int(2))]);
                assert!(matches!(objective, ObjectiveArg::MinCost));
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_FILE));
            }
            _ => panic!("expected solve"),
        }
    }
}
