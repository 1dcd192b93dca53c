use std::{
    env,
    error::Error,
    path::{Path, PathBuf},
    process::ExitCode,
};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use funnelg::{
    cli::{ArtifactKind, Cli, Commands, TargetArgs, parse_args},
    config::{Config, load_config},
    constants::{BINARY_NAME, PARTIAL_FAILURE_EXIT_CODE, STATE_DIR_RELATIVE},
    env::EnvironmentContext,
    generate::render_program,
    layout::Layout,
    operator::Operator,
    reconciler::Reconciler,
    system::HostSystem,
};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);

    match run(args.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Commands::Deploy {
            target,
            service,
            allow_partial,
        } => {
            let context = RunContext::load(&target)?;
            let config = context.config.select(service.as_deref())?;
            let mut reconciler = Reconciler::new(
                HostSystem::new(BINARY_NAME),
                context.layout,
                context.env,
                context.operator,
            );

            let summary = reconciler.reconcile_all(&config.services);
            println!("{summary}");

            if summary.all_converged() {
                info!("All services checked and deployed");
            } else if allow_partial {
                warn!("Some services did not converge; exiting successfully as requested");
            } else {
                return Ok(ExitCode::from(PARTIAL_FAILURE_EXIT_CODE));
            }
        }
        Commands::Plan { target } => {
            let context = RunContext::load(&target)?;
            let reconciler = Reconciler::new(
                HostSystem::new(BINARY_NAME),
                context.layout,
                context.env,
                context.operator,
            );

            for spec in &context.config.services {
                let state = reconciler.probe(spec);
                println!(
                    "{:<24} binary: {:<8} unit: {:<8} {}",
                    spec.name,
                    presence(state.binary_exists),
                    presence(state.unit_exists),
                    if state.is_converged() {
                        "converged"
                    } else {
                        "pending"
                    }
                );
            }
        }
        Commands::Render {
            target,
            kind,
            service,
        } => {
            let context = RunContext::load(&target)?;
            let spec = context.config.service(&service)?.clone();
            let rendered = match kind {
                ArtifactKind::Program => render_program(&spec, STATE_DIR_RELATIVE),
                ArtifactKind::Unit => Reconciler::new(
                    HostSystem::new(BINARY_NAME),
                    context.layout,
                    context.env,
                    context.operator,
                )
                .render_unit(&spec),
            };
            print!("{rendered}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything loaded once before any service is touched.
struct RunContext {
    config: Config,
    env: EnvironmentContext,
    operator: Operator,
    layout: Layout,
}

impl RunContext {
    fn load(target: &TargetArgs) -> Result<Self, Box<dyn Error>> {
        let config_path = resolve_path(&target.config)?;
        let config = load_config(&config_path)?;
        info!(
            "Loaded {} service(s) from {}",
            config.services.len(),
            config_path.display()
        );

        let environment = EnvironmentContext::load(&resolve_path(&target.env_file)?)?;
        let operator = Operator::resolve(env::var("SUDO_USER").ok(), env::var("USER").ok())?;
        let layout = Layout::new(resolve_path(&target.root)?, resolve_path(&target.unit_dir)?);

        Ok(Self {
            config,
            env: environment,
            operator,
            layout,
        })
    }
}

/// Anchors relative paths at the working directory. Symlinks are left in
/// place since the env file path ends up in installed units.
fn resolve_path(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(env::current_dir()?.join(path))
}

fn presence(exists: bool) -> &'static str {
    if exists { "present" } else { "missing" }
}
