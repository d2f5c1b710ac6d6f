//! zinstall - Main entry point

use anyhow::{Context as _, Result};
use std::cell::RefCell;
use std::io::{self, BufReader};
use std::path::Path;
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zinstall::cli::{Cli, Commands};
use zinstall::context::{keys, Context};
use zinstall::hooks::{default_modules, HookEvent, LifecycleHookRunner};
use zinstall::installer::Installer;
use zinstall::partition::{str_to_size, validate_mountpoint, SizeUnit};
use zinstall::sentinel::Sentinels;
use zinstall::wizard::screens::{default_screens, LinePrompt, SharedPrompt};
use zinstall::wizard::{WizardController, WizardOutcome};
use zinstall::InstallationConfig;

/// Initialize the logger. Logs go to stderr so prompts on stdout stay readable.
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logger();
    info!("zinstall starting up");

    let cli = Cli::parse_args();
    if let Err(e) = run(cli) {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let sentinels = Sentinels::new(&cli.sentinel_dir);

    match cli.command {
        Some(Commands::Install {
            config,
            save_config,
            mount_dir,
        }) => {
            let ctx = match config {
                Some(path) => {
                    info!("Running unattended installation with answer file {:?}", path);
                    load_context(&path)?
                }
                None => match run_wizard(&mount_dir)? {
                    Some(ctx) => ctx,
                    None => return Ok(()),
                },
            };

            if let Some(path) = save_config {
                InstallationConfig::from_context(&ctx).save_to_file(&path)?;
                info!("Saved answers to {:?}", path);
            }

            install(ctx, sentinels)
        }
        Some(Commands::Upgrade { config }) => {
            let mut ctx = load_context(&config)?;
            let mut installer = Installer::new(LifecycleHookRunner::new(default_modules()), sentinels);
            installer.upgrade(&mut ctx, package_transaction)?;
            println!("✓ Upgrade complete");
            Ok(())
        }
        Some(Commands::Hook { event, config }) => {
            let mut ctx = load_context(&config)?;
            fire_single(event, &mut ctx)?;
            println!("✓ {} completed", event);
            Ok(())
        }
        Some(Commands::Validate { config }) => {
            let config = InstallationConfig::load_from_file(&config)?;
            config.validate().context("Configuration validation failed")?;
            println!("✓ Configuration file is valid");
            Ok(())
        }
        Some(Commands::Size { value }) => {
            let size = str_to_size(&value, SizeUnit::Mib)
                .with_context(|| format!("'{}' is not a valid size", value))?;
            println!("{} MiB ({})", size.mib(), size);
            Ok(())
        }
        Some(Commands::Mountpoint { mountpoint, used }) => {
            let normalized = validate_mountpoint(&mountpoint, &used)?;
            println!("✓ {} is available", normalized);
            Ok(())
        }
        None => {
            info!("No command specified, launching interactive installer");
            match run_wizard("/mnt/sysimage")? {
                Some(ctx) => install(ctx, sentinels),
                None => Ok(()),
            }
        }
    }
}

fn load_context(path: &Path) -> Result<Context> {
    let config = InstallationConfig::load_from_file(path)?;
    config.validate().context("Configuration validation failed")?;
    config.to_context()
}

/// Run the interactive screens. `None` when the user backed out or quit.
fn run_wizard(mount_dir: &str) -> Result<Option<Context>> {
    let mut ctx = Context::new();
    ctx.insert(keys::MOUNT_DIR, mount_dir);
    ctx.insert(keys::IS_KICKSTART, false);

    let prompt: SharedPrompt = Rc::new(RefCell::new(LinePrompt::new(
        BufReader::new(io::stdin()),
        io::stdout(),
    )));
    let mut wizard = WizardController::new(default_screens(prompt));

    match wizard.run(&mut ctx)? {
        WizardOutcome::Completed => Ok(Some(ctx)),
        outcome => {
            warn!("Installation cancelled ({})", outcome);
            println!("Installation cancelled, nothing was changed.");
            Ok(None)
        }
    }
}

fn install(mut ctx: Context, sentinels: Sentinels) -> Result<()> {
    let mut installer = Installer::new(LifecycleHookRunner::new(default_modules()), sentinels);
    installer.install(&mut ctx, package_transaction)?;
    println!("✓ Installation complete");
    Ok(())
}

fn fire_single(event: HookEvent, ctx: &mut Context) -> Result<()> {
    let mut runner = LifecycleHookRunner::new(default_modules());
    runner.fire(event, ctx)?;
    Ok(())
}

/// The package transaction is owned by the package manager tooling on the
/// install image; by the time hooks run, packages are already in the target.
fn package_transaction(ctx: &mut Context) -> Result<()> {
    info!(
        "Package payload handled by the image package manager (target: {})",
        ctx.mount_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unset".to_string())
    );
    Ok(())
}
