//! prebuilt - launcher for a prebuilt release binary
//!
//! Installs the release binary for this machine on first use, then runs it
//! with every argument forwarded and exits with its exit code. The launcher
//! has no options of its own.

use anyhow::Result;
use prebuilt::config::{ConfigOverrides, LauncherConfig};
use prebuilt::error::{INTERRUPTED_EXIT_CODE, exit_code};
use prebuilt::launcher::Launcher;
use prebuilt::platform::{DefaultPlatformDetector, resolve_host};
use prebuilt::runtime::RealRuntime;
use std::ffi::OsString;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    match launch(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = exit_code(&e);
            if code != INTERRUPTED_EXIT_CODE {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(code);
        }
    }
}

async fn launch(args: Vec<OsString>) -> Result<i32> {
    let runtime = RealRuntime;
    let config = LauncherConfig::load(&runtime, ConfigOverrides::default())?;
    let platform = resolve_host(&DefaultPlatformDetector, &config.binary)?;
    let launcher = Launcher::from_config(config, runtime)?;
    Ok(launcher.run(&platform, &args).await?)
}
