//! Manifest CLI entrypoint.
//!
//! This is the main entrypoint for the manifest command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use deploy_manifest::cli::{Cli, Commands, EnvironmentSummary, OutputFormatter};
use deploy_manifest::error::Result;
use deploy_manifest::interpolate::ProcessEnv;
use deploy_manifest::manifest::{
    ManifestHasher, ManifestParser, ManifestValidator, find_manifest_file,
};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    let formatter = OutputFormatter::new(cli.output);

    match run(cli, &formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches the selected command.
fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let manifest_file = resolve_manifest_path(cli.file.as_ref())?;
    let parser = parser_for(&manifest_file, &cli.app)?;

    match cli.command {
        Commands::Validate { env, warnings } => {
            cmd_validate(&parser, &manifest_file, &env, warnings, formatter)
        }
        Commands::Render { env } => cmd_render(&parser, &manifest_file, &env, formatter),
        Commands::Envs => cmd_envs(&parser, &manifest_file, formatter),
        Commands::Interpolate { env } => cmd_interpolate(&parser, &manifest_file, &env, formatter),
    }
}

/// Validate the effective manifest of an environment.
fn cmd_validate(
    parser: &ManifestParser,
    manifest_file: &Path,
    env: &str,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    info!("Validating manifest for environment: {env}");

    let manifest = parser.load(manifest_file, env, ProcessEnv)?;
    let result = ManifestValidator::new().validate(&manifest)?;
    let digest = ManifestHasher::new().hash_manifest(&manifest)?;

    emit(&formatter.format_validation(&manifest, env, &digest, &result, show_warnings))
}

/// Print the effective manifest of an environment.
fn cmd_render(
    parser: &ManifestParser,
    manifest_file: &Path,
    env: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let manifest = parser.load(manifest_file, env, ProcessEnv)?;
    emit(&formatter.format_manifest(&manifest)?)
}

/// List the environments with their effective digests.
fn cmd_envs(
    parser: &ManifestParser,
    manifest_file: &Path,
    formatter: &OutputFormatter,
) -> Result<()> {
    let content = parser.read_file(manifest_file)?;
    let hasher = ManifestHasher::new();
    let mut workload = String::new();
    let mut summaries = Vec::new();

    // Each environment interpolates differently, so its base is recomputed
    for env in parser.environment_names(&content)? {
        let interpolated = parser.interpolate(&content, &env, ProcessEnv)?;
        let manifest = parser.parse_yaml(&interpolated, Some(manifest_file))?;
        let effective = manifest.apply_env(&env)?;

        let base_digest = hasher.hash_config(&manifest.config)?;
        let digest = hasher.hash_config(&effective.config)?;
        debug!("Environment {env}: base {base_digest}, effective {digest}");

        workload.clone_from(&manifest.name);
        summaries.push(EnvironmentSummary {
            overrides: digest != base_digest,
            count: effective.config.desired_count(),
            name: env,
            digest,
        });
    }

    emit(&formatter.format_environments(&workload, &summaries))
}

/// Print the manifest text with variables substituted.
fn cmd_interpolate(
    parser: &ManifestParser,
    manifest_file: &Path,
    env: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let content = parser.read_file(manifest_file)?;
    let interpolated = parser.interpolate(&content, env, ProcessEnv)?;
    emit(&formatter.format_interpolated(env, &interpolated))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Resolves the manifest file path.
fn resolve_manifest_path(manifest_path: Option<&PathBuf>) -> Result<PathBuf> {
    manifest_path.map_or_else(|| find_manifest_file("."), |path| Ok(path.clone()))
}

/// Creates a parser and loads the `.env` file next to the manifest.
fn parser_for(manifest_file: &Path, app: &str) -> Result<ManifestParser> {
    debug!("Using manifest: {}", manifest_file.display());

    let parser = ManifestParser::new(app).with_base_path(
        manifest_file
            .parent()
            .unwrap_or_else(|| Path::new(".")),
    );
    parser.load_dotenv()?;

    Ok(parser)
}

/// Writes command output to stdout.
fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
