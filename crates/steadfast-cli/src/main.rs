//! Steadfast CLI binary
//!
//! Usage:
//!   steadfast scenarios
//!   steadfast config [--base-url URL]
//!   steadfast run <scenario> [--base-url URL] [--headed] [--output DIR]

use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use steadfast::pages::DeviceForm;
use steadfast_cli::{
    effective_config, logging, CliConfig, CliError, CliResult, Cli, ColorChoice, Commands,
    ConfigArgs, Credentials, Overrides, RunArgs, Scenario, ScenarioInputs, ScenarioReport,
    Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(path) = e.screenshot() {
                eprintln!("Screenshot: {}", path.display());
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(ColorChoice::from(cli.color))
        .with_log_format(cli.log_format.into());
    console::set_colors_enabled(config.color.should_color());
    console::set_colors_enabled_stderr(config.color.should_color());

    match cli.command {
        Commands::Scenarios => {
            list_scenarios();
            Ok(())
        }
        Commands::Config(args) => show_config(cli.config, &args),
        Commands::Run(args) => {
            logging::init(&config)?;
            run_scenario(cli.config, args, &config)
        }
    }
}

fn list_scenarios() {
    for scenario in Scenario::ALL {
        println!("{:<14} {}", style(scenario.name()).bold(), scenario.description());
    }
}

fn show_config(path: Option<PathBuf>, args: &ConfigArgs) -> CliResult<()> {
    let overrides = Overrides {
        base_url: args.base_url.clone(),
        headed: args.headed,
        max_attempts: None,
    };
    let config = effective_config(path.as_deref(), |key| std::env::var(key).ok(), &overrides)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

fn run_scenario(path: Option<PathBuf>, args: RunArgs, cli_config: &CliConfig) -> CliResult<()> {
    let scenario: Scenario = args.scenario.parse()?;
    let overrides = Overrides {
        base_url: args.base_url.clone(),
        headed: args.headed,
        max_attempts: args.max_attempts,
    };
    let config = effective_config(path.as_deref(), |key| std::env::var(key).ok(), &overrides)?;
    if args.username.is_empty() {
        return Err(CliError::invalid_argument(
            "no username given (use --username or STEADFAST_USERNAME)",
        ));
    }

    let device = DeviceForm {
        device_type: args.device_type,
        subtype: args.subtype,
        status: args.status,
        disposition: args.disposition,
        organization: args.organization.clone(),
        ..DeviceForm::default()
    };
    let mut inputs = ScenarioInputs::new(
        config,
        Credentials {
            username: args.username,
            password: args.password,
        },
    )
    .with_device(device)
    .with_output_dir(
        args.output
            .unwrap_or_else(|| PathBuf::from(&cli_config.output_dir)),
    );
    if let Some(organization) = args.organization {
        inputs = inputs.with_organization(organization);
    }

    if !cli_config.verbosity.is_quiet() {
        eprintln!(
            "{} {} against {}",
            style("Running").cyan().bold(),
            scenario,
            inputs.config.session.base_url
        );
    }

    let report = launch(scenario, &inputs)?;
    print_report(&report, cli_config.verbosity);
    Ok(())
}

#[cfg(feature = "browser")]
fn launch(scenario: Scenario, inputs: &ScenarioInputs) -> CliResult<ScenarioReport> {
    use futures::FutureExt;
    use steadfast::{with_session, ChromiumProvider};

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let session = inputs.config.session.clone();
    let inputs = inputs.clone();
    runtime.block_on(async {
        with_session(&ChromiumProvider::new(), &session, move |driver| {
            async move { Ok(steadfast_cli::execute(driver, scenario, &inputs).await) }.boxed()
        })
        .await?
    })
}

#[cfg(not(feature = "browser"))]
fn launch(_scenario: Scenario, _inputs: &ScenarioInputs) -> CliResult<ScenarioReport> {
    Err(CliError::BrowserUnavailable)
}

fn print_report(report: &ScenarioReport, verbosity: Verbosity) {
    if verbosity.is_quiet() {
        return;
    }
    println!("{} {}", style("PASS").green().bold(), report.scenario);
    if verbosity.is_verbose() {
        for note in &report.notes {
            println!("  {note}");
        }
        println!("  final url: {}", report.final_url);
    }
    if !report.fallback_widgets.is_empty() {
        println!(
            "{} scripted-event fallback needed for: {}",
            style("WARN").yellow().bold(),
            report.fallback_widgets.join(", ")
        );
    }
}
