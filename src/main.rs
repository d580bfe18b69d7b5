//! stackdeploy CLI entrypoint.
//!
//! This is the main entrypoint for the stackdeploy command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use stackdeploy::cli::{Cli, Commands, LogFormat, OutputFormatter, Overrides, ProgressStyle};
use stackdeploy::cloudformation::{CloudFormationClient, StackClient};
use stackdeploy::config::{find_config_file, ConfigParser, ConfigValidator, DeployConfig};
use stackdeploy::deploy::{DeployRequest, DeploySettings, Deployer};
use stackdeploy::error::Result;
use stackdeploy::progress::{LogReporter, NoopReporter, ProgressReporter, TableReporter};
use stackdeploy::prompt::default_prompt;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let prefix = if e.is_deployment_error() { "Deployment failed" } else { "Error" };
            eprintln!("{prefix}: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_deref();
    let region = cli.region.as_deref();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Deploy {
            yes,
            progress,
            overrides,
        } => {
            cmd_deploy(
                config_path,
                &overrides,
                region,
                profile,
                yes,
                progress,
                &formatter,
            )
            .await
        }
        Commands::Status { overrides } => {
            cmd_status(config_path, &overrides, region, profile, &formatter).await
        }
        Commands::Validate {
            warnings,
            overrides,
        } => cmd_validate(config_path, &overrides, region, warnings, &formatter),
    }
}

/// Deploy the stack through a reviewed change set.
async fn cmd_deploy(
    config_path: Option<&Path>,
    overrides: &Overrides,
    region: Option<&str>,
    profile: Option<&str>,
    assume_yes: bool,
    progress: ProgressStyle,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (parser, config) = load_config(config_path, overrides, region)?;
    let template_body = parser.load_template(&config)?;

    let validation = ConfigValidator::new().validate(&config, Some(&template_body))?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let client = Arc::new(
        CloudFormationClient::from_env(config.stack.region.as_deref(), profile).await,
    );

    let reporter: Box<dyn ProgressReporter> = match progress {
        ProgressStyle::Table => Box::new(TableReporter::new(Arc::clone(&client))),
        ProgressStyle::Log => Box::new(LogReporter::new(Arc::clone(&client))),
        ProgressStyle::None => Box::new(NoopReporter),
    };

    let settings = DeploySettings {
        change_set_prefix: config.stack.change_set_prefix().to_string(),
        console_region: client.region().map(ToString::to_string),
        ..DeploySettings::default()
    };

    let request = DeployRequest::new(config.stack.name.as_str(), template_body)
        .with_parameters(config.parameters.to_parameters())
        .with_capabilities(config.stack.capabilities.clone())
        .with_tags(config.tags.to_tags());

    let mut deployer = Deployer::new(Arc::clone(&client), reporter, default_prompt(assume_yes))
        .with_settings(settings);
    let outcome = deployer.deploy(&request).await?;

    print_out(&formatter.format_outcome(&config.stack.name, &outcome))
}

/// Show the stack's current status.
async fn cmd_status(
    config_path: Option<&Path>,
    overrides: &Overrides,
    region: Option<&str>,
    profile: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_, config) = load_config(config_path, overrides, region)?;

    let client = CloudFormationClient::from_env(config.stack.region.as_deref(), profile).await;
    let stack = client.describe_stack(&config.stack.name).await?;

    print_out(&formatter.format_status(&config.stack.name, stack.as_ref()))
}

/// Validate configuration and template.
fn cmd_validate(
    config_path: Option<&Path>,
    overrides: &Overrides,
    region: Option<&str>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (parser, config) = load_config(config_path, overrides, region)?;
    info!("Validating configuration for stack: {}", config.stack.name);

    let template_body = parser.load_template(&config)?;
    let result = ConfigValidator::new().validate(&config, Some(&template_body))?;

    print_out(&formatter.format_validation(&config, &result, show_warnings))
}

/// Loads the configuration with `.env`, environment and command-line overrides.
fn load_config(
    config_path: Option<&Path>,
    overrides: &Overrides,
    region: Option<&str>,
) -> Result<(ConfigParser, DeployConfig)> {
    let config_file = resolve_config_path(config_path)?;

    let parser = ConfigParser::for_file(&config_file);
    parser.load_dotenv()?;

    let mut config = parser.load_with_env(&config_file)?;
    overrides.apply(&mut config, region);
    debug!("Effective configuration: {config:?}");

    Ok((parser, config))
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => find_config_file(std::env::current_dir()?),
    }
}

/// Writes command output to stdout.
fn print_out(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
