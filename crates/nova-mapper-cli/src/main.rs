use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use nova_mapper::{resolve_mappers, MapperReport, MethodDiagnostic, ResolvedMapper};
use nova_mapper_cli::{Workspace, CLI_TARGET};
use nova_mapper_config::{ConfigDiagnostics, NovaMapperConfig};
use nova_mapper_types::Severity;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "nova-mapper",
    version,
    about = "Resolve object mapper declarations into mapping plans"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every mapper and print the generated methods and diagnostics
    Plan(ResolveArgs),
    /// Resolve every mapper and print diagnostics only
    Check(ResolveArgs),
    /// Print the JSON schema of `nova-mapper.toml`
    Schema,
}

#[derive(Args)]
struct ResolveArgs {
    /// Workspace file describing types and mappers
    workspace: PathBuf,
    /// Configuration file (defaults to `nova-mapper.toml` next to the workspace file)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Plan(args) => {
            let resolved = resolve(&args)?;
            let exit = exit_code(&resolved);
            if args.json {
                let reports: Vec<MapperReport> = resolved.iter().map(|r| r.report()).collect();
                print_json(&PlanEnvelope {
                    summary: Summary::of(&resolved),
                    mappers: reports,
                })?;
            } else {
                for mapper in &resolved {
                    print!("{}", mapper.render());
                    println!();
                }
                print_diagnostics(&resolved);
            }
            Ok(exit)
        }
        Command::Check(args) => {
            let resolved = resolve(&args)?;
            let exit = exit_code(&resolved);
            if args.json {
                print_json(&CheckEnvelope {
                    summary: Summary::of(&resolved),
                    diagnostics: resolved.iter().flat_map(|r| &r.diagnostics).collect(),
                })?;
            } else {
                print_diagnostics(&resolved);
            }
            Ok(exit)
        }
        Command::Schema => {
            print_json(&nova_mapper_config::json_schema())?;
            Ok(0)
        }
    }
}

fn resolve(args: &ResolveArgs) -> Result<Vec<ResolvedMapper>> {
    let config = load_config(args)?;
    nova_mapper_config::init_tracing(&config.logging);

    let workspace = Workspace::load(&args.workspace)?;
    let results = resolve_mappers(&workspace.store, &config.options, &workspace.mappers);
    let resolved = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        target: CLI_TARGET,
        mappers = resolved.len(),
        plans = resolved.iter().map(|r| r.plans.len()).sum::<usize>(),
        "workspace resolved"
    );
    Ok(resolved)
}

fn load_config(args: &ResolveArgs) -> Result<NovaMapperConfig> {
    let (config, path, diagnostics) = match &args.config {
        Some(path) => {
            let (config, diagnostics) = NovaMapperConfig::load_from_path_with_diagnostics(path)?;
            (config, Some(path.clone()), diagnostics)
        }
        None => {
            let root = args
                .workspace
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            nova_mapper_config::load_for_root(root)?
        }
    };
    report_config_diagnostics(path.as_deref(), &diagnostics)?;
    Ok(config)
}

fn report_config_diagnostics(path: Option<&Path>, diagnostics: &ConfigDiagnostics) -> Result<()> {
    let origin = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| NovaMapperConfig::FILE_NAME.to_string());
    for key in &diagnostics.unknown_keys {
        eprintln!("{origin}: warning: unknown key `{key}`");
    }
    for warning in &diagnostics.warnings {
        eprintln!("{origin}: warning: {warning}");
    }
    for error in &diagnostics.errors {
        eprintln!("{origin}: error: {error}");
    }
    if !diagnostics.is_ok() {
        bail!("{origin}: invalid configuration");
    }
    Ok(())
}

fn exit_code(resolved: &[ResolvedMapper]) -> i32 {
    if resolved.iter().any(ResolvedMapper::has_errors) {
        1
    } else {
        0
    }
}

#[derive(Serialize)]
struct Summary {
    errors: usize,
    warnings: usize,
    infos: usize,
}

impl Summary {
    fn of(resolved: &[ResolvedMapper]) -> Self {
        let count = |severity: Severity| {
            resolved
                .iter()
                .flat_map(|r| &r.diagnostics)
                .filter(|d| d.diagnostic.severity == severity)
                .count()
        };
        Self {
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            infos: count(Severity::Info),
        }
    }
}

#[derive(Serialize)]
struct PlanEnvelope {
    summary: Summary,
    mappers: Vec<MapperReport>,
}

#[derive(Serialize)]
struct CheckEnvelope<'a> {
    summary: Summary,
    diagnostics: Vec<&'a MethodDiagnostic>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_diagnostics(resolved: &[ResolvedMapper]) {
    for d in resolved.iter().flat_map(|r| &r.diagnostics) {
        println!(
            "{}.{}: {}[{}] {}",
            d.mapper,
            d.method,
            d.diagnostic.severity.as_str(),
            d.diagnostic.code,
            d.diagnostic.message
        );
    }
    let summary = Summary::of(resolved);
    println!(
        "summary: {} errors, {} warnings, {} infos",
        summary.errors, summary.warnings, summary.infos
    );
}
