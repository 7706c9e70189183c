//! Entry point: CLI dispatch onto the BMC controller.

mod app;
mod bmc;
mod config;
mod lpar;
mod system;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use app::cli::{Args, Command};
use app::logging::init_tracing;
use bmc::BmcController;
use config::persistence::{load_config, save_config};
use system::ShellRunner;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args
        .log_level
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "info".to_string());
    let filter = match log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => log_level.as_str(),
        _ => {
            eprintln!(
                "Invalid log level '{}'. Using INFO. Valid levels: TRACE, DEBUG, INFO, WARN, ERROR",
                log_level
            );
            "info"
        }
    };
    init_tracing(filter);

    info!("bmc-boot-test v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref())
        .await
        .context("loading configuration")?;

    if let Command::Config { save } = &args.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        if let Some(path) = save {
            save_config(&config, path).await?;
        }
        return Ok(());
    }

    let controller = BmcController::new(config, Arc::new(ShellRunner));

    match args.command {
        Command::PowerOn => controller.power_on().await?,
        Command::PowerOff => controller.power_off().await?,
        Command::ColdReset => controller.cold_reset().await?,
        Command::SdrClear => controller.sdr_clear().await?,
        Command::SelCheck { marker } => controller.sel_check(&marker).await?,
        Command::IplWait { timeout_mins } => {
            controller.ipl_wait_for_working_state(timeout_mins).await?
        }
        Command::CodeUpdate { image, component } => {
            controller.code_update(&image, &component).await?
        }
        Command::InbandCodeUpdate { image, component } => {
            controller.inband_code_update(&image, &component).await?
        }
        Command::PreserveLan => controller.preserve_network_setting().await?,
        Command::ActiveSide => {
            let side = controller.get_side_activated().await?;
            println!("{}", side);
        }
        Command::PnorLevel => {
            print!("{}", controller.get_pnor_level().await?);
        }
        Command::OsLevel => {
            print!("{}", controller.inband_get_os_level().await?);
        }
        Command::ValidateLpar => controller.validate_lpar().await?,
        Command::Config { .. } => unreachable!("handled before controller construction"),
    }

    Ok(())
}
