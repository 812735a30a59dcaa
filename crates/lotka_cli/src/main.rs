//! lotka CLI

mod config;
mod display;
mod naming;
#[cfg(feature = "render")]
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{FileConfig, PlotSettings};
use lotka_core::equilibrium::{lotka_volterra_equilibria, EquilibriumReport};
use lotka_core::{
    FailurePolicy, ParameterValidator, RawSweepInput, SweepConfig, SweepOrchestrator,
    SweepSummary,
};
use naming::SaveTarget;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lotka")]
#[command(about = "Lotka-Volterra predator-prey simulation swept over prey birth rates")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Initial populations: prey then predator
    #[arg(long, required = true, num_args = 1.., allow_negative_numbers = true)]
    initial: Vec<f64>,

    /// Prey birth rates to sweep (1 to 5 values)
    #[arg(short, long, required = true, num_args = 1.., allow_negative_numbers = true)]
    alpha: Vec<f64>,

    /// Predation rate
    #[arg(short, long, allow_negative_numbers = true)]
    beta: f64,

    /// Predator growth per prey eaten
    #[arg(short, long, allow_negative_numbers = true)]
    delta: f64,

    /// Predator death rate
    #[arg(short, long, allow_negative_numbers = true)]
    gamma: f64,

    /// End time of the simulation (overrides the config file)
    #[arg(long)]
    t_max: Option<f64>,

    /// Number of evenly spaced output samples, both endpoints included
    #[arg(long)]
    samples: Option<usize>,

    /// Integrate the alpha values on separate threads
    #[arg(long)]
    parallel: bool,

    /// Stop at the first failed alpha instead of continuing with the rest
    #[arg(long)]
    abort_on_failure: bool,

    /// Save figures instead of printing tables. Without a value each alpha gets
    /// `lotka_volterra_alpha=<alpha>.png`.
    #[arg(long, num_args = 0..=1, value_name = "FILE")]
    save: Option<Option<String>>,

    /// Directory for saved figures (overrides the config file)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// TOML file with [sweep], [sweep.integrator] and [plot] tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also report the fixed points and their linear stability for each alpha
    #[arg(long)]
    equilibria: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let sweep_config = merge_sweep_config(file_config.sweep, &cli);
    let mut plot = file_config.plot;
    if let Some(dir) = &cli.out_dir {
        plot.out_dir = dir.clone();
    }

    let raw = RawSweepInput {
        initial_state: cli.initial.clone(),
        alphas: cli.alpha.clone(),
        beta: cli.beta,
        delta: cli.delta,
        gamma: cli.gamma,
    };
    let spec = ParameterValidator::validate(&raw).context("invalid input")?;

    if cli.equilibria {
        for &alpha in spec.alphas() {
            let reports = lotka_volterra_equilibria(&spec.rates_for(alpha))
                .with_context(|| format!("equilibrium analysis failed for alpha={alpha}"))?;
            print_equilibria(alpha, &reports);
        }
    }

    let alphas = spec.alphas().to_vec();
    let alpha_count = alphas.len();
    let orchestrator = SweepOrchestrator::new(spec, sweep_config).context("invalid sweep configuration")?;

    let summary = match cli.save {
        Some(name) => {
            let target = name.map_or(SaveTarget::PerAlpha, SaveTarget::Named);
            run_saving(&orchestrator, target, alphas, plot)?
        }
        None => {
            let mut sink = display::ConsoleDisplay::new(std::io::stdout().lock());
            orchestrator.run(&mut sink)?
        }
    };

    report_failures(&summary, alpha_count)
}

fn merge_sweep_config(mut config: SweepConfig, cli: &Cli) -> SweepConfig {
    if let Some(t_max) = cli.t_max {
        config.t_max = t_max;
    }
    if let Some(samples) = cli.samples {
        config.samples = samples;
    }
    if cli.parallel {
        config.parallel = true;
    }
    if cli.abort_on_failure {
        config.failure_policy = FailurePolicy::Abort;
    }
    config
}

#[cfg(feature = "render")]
fn run_saving(
    orchestrator: &SweepOrchestrator,
    target: SaveTarget,
    alphas: Vec<f64>,
    plot: PlotSettings,
) -> Result<SweepSummary> {
    let mut renderer = render::PngRenderer::new(target, alphas, plot);
    let summary = orchestrator.run(&mut renderer)?;
    for path in renderer.written() {
        println!("saved {}", path.display());
    }
    Ok(summary)
}

#[cfg(not(feature = "render"))]
fn run_saving(
    _orchestrator: &SweepOrchestrator,
    _target: SaveTarget,
    _alphas: Vec<f64>,
    _plot: PlotSettings,
) -> Result<SweepSummary> {
    bail!("saving figures requires the `render` feature; rebuild with `--features render`")
}

fn print_equilibria(alpha: f64, reports: &[EquilibriumReport]) {
    println!("Equilibria for alpha={alpha}");
    for report in reports {
        let eigenvalues: Vec<String> = report
            .eigenvalues
            .iter()
            .map(|lambda| format!("{:.6}{:+.6}i", lambda.re, lambda.im))
            .collect();
        print!(
            "  ({:.6}, {:.6}): {:?}, eigenvalues [{}]",
            report.state[0],
            report.state[1],
            report.kind,
            eigenvalues.join(", ")
        );
        match report.linear_period {
            Some(period) => println!(", linear period {period:.6}"),
            None => println!(),
        }
    }
    println!();
}

fn report_failures(summary: &SweepSummary, alpha_count: usize) -> Result<()> {
    if summary.is_complete() {
        return Ok(());
    }
    for failure in &summary.failures {
        eprintln!("error: {failure}");
    }
    bail!(
        "{} of {} sweep steps failed",
        summary.failures.len(),
        alpha_count
    )
}
