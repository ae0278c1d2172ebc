use anyhow::Result;
use clap::Parser;
use prebuilt::config::{ConfigOverrides, LauncherConfig};
use prebuilt::error::{INTERRUPTED_EXIT_CODE, exit_code};
use prebuilt::launcher::Launcher;
use prebuilt::platform::{DefaultPlatformDetector, resolve_host};
use prebuilt::runtime::RealRuntime;
use std::path::PathBuf;

/// prebuilt-install - install the release binary a package launcher fronts
///
/// Meant to run as a package-manager install hook so the first launch does not
/// have to download anything.
///
/// Examples:
///   prebuilt-install                    # Install if not already present
///   prebuilt-install --force            # Download again and replace
///   prebuilt-install --print-url        # Show the release URL for this machine
#[derive(Parser, Debug)]
#[command(author, version = env!("PREBUILT_VERSION"), about)]
struct Cli {
    /// Reinstall even if the binary is already present
    #[arg(long, short = 'f')]
    force: bool,

    /// Package manifest (defaults to prebuilt.json next to the executable)
    #[arg(long, value_name = "PATH", env = "PREBUILT_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Directory to install the binary into
    #[arg(long = "install-dir", value_name = "PATH", env = "PREBUILT_INSTALL_DIR")]
    install_dir: Option<PathBuf>,

    /// Print the release URL for this machine and exit
    #[arg(long = "print-url")]
    print_url: bool,

    /// Print the install path of the binary and exit
    #[arg(long = "print-path")]
    print_path: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = install(cli).await {
        let code = exit_code(&e);
        if code != INTERRUPTED_EXIT_CODE {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(code);
    }
}

async fn install(cli: Cli) -> Result<()> {
    let runtime = RealRuntime;

    let config = LauncherConfig::load(
        &runtime,
        ConfigOverrides {
            manifest: cli.manifest,
            install_dir: cli.install_dir,
        },
    )?;
    let platform = resolve_host(&DefaultPlatformDetector, &config.binary)?;
    let launcher = Launcher::from_config(config, runtime)?;

    if cli.print_url || cli.print_path {
        if cli.print_url {
            println!("{}", launcher.download_url(&platform));
        }
        if cli.print_path {
            println!("{}", launcher.install_path(&platform).display());
        }
        return Ok(());
    }

    let installed = launcher.install(&platform, cli.force).await?;
    println!(
        "   installed {} v{} ({}) -> {}",
        launcher.config().name,
        installed.version,
        installed.target_triple,
        installed.path.display()
    );
    Ok(())
}
