use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use blackbox::{
    boot, config::DeviceConfig, server, storage::FileStore, BlackBox, RegisterMapGateway,
};

/// Exit status asking the supervisor to start the process again
const RESTART_EXIT_CODE: i32 = 3;

fn command() -> Command {
    Command::new("blackbox")
        .about("Expose a device's configuration as a Modbus register map")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Device description file (TOML)"),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .short('l')
                .value_name("ADDR")
                .value_parser(clap::value_parser!(SocketAddr))
                .help("Modbus TCP listen address"),
        )
        .arg(
            Arg::new("unit-id")
                .long("unit-id")
                .short('u')
                .value_name("ID")
                .value_parser(clap::value_parser!(u8))
                .help("Modbus unit id to answer to"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .value_parser(clap::value_parser!(LevelFilter))
                .help("Default log level, overridden by RUST_LOG"),
        )
        .arg(
            Arg::new("erase")
                .long("erase")
                .help("Erase all persisted configuration and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Print the effective device description and exit")
                .action(ArgAction::SetTrue),
        )
}

fn device_config(matches: &ArgMatches) -> Result<DeviceConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DeviceConfig::load(path)?,
        None => DeviceConfig::default(),
    };
    if let Some(listen) = matches.get_one::<SocketAddr>("listen") {
        config.listen = *listen;
    }
    if let Some(unit_id) = matches.get_one::<u8>("unit-id") {
        config.unit_id = *unit_id;
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> Result<bool> {
    let config = device_config(matches)?;
    if matches.get_flag("dump-config") {
        print!("{}", config.to_toml()?);
        return Ok(false);
    }

    let store = Arc::new(FileStore::open(&config.storage).with_context(|| {
        format!("Failed to open configuration store {}", config.storage.display())
    })?);
    let black_box = Arc::new(BlackBox::new(store, config.firmware_info()?));
    config.register(&black_box)?;

    if matches.get_flag("erase") {
        black_box.erase_all_configurations()?;
        log::info!("Erased persisted configuration in {}", config.storage.display());
        return Ok(false);
    }

    black_box.load_all_configurations()?;
    if let Err(err) = black_box.apply_hardware_interface_configurations() {
        log::warn!("Some hardware interfaces could not be configured: {err}");
    }
    if let Err(err) = black_box.apply_server_configurations() {
        log::warn!("Some servers could not be configured: {err}");
    }

    let (restart_tx, restart_rx) = flume::bounded::<()>(1);
    black_box.set_restart_handler(move || {
        let _ = restart_tx.try_send(());
    });

    let gateway = RegisterMapGateway::new(black_box.clone());
    log::info!(
        "Serving '{}' as unit {} ({} hardware interface(s), {} server(s))",
        black_box.device_name(),
        config.unit_id,
        black_box.hardware_interface_count(),
        black_box.server_count()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;
    runtime.block_on(async {
        let listener = server::bind(config.listen).await?;
        server::serve(
            listener,
            gateway.memory_map().clone(),
            config.unit_id,
            restart_rx,
        )
        .await
    })?;
    Ok(true)
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    let level = matches
        .get_one::<LevelFilter>("log-level")
        .copied()
        .unwrap_or(LevelFilter::Info);
    boot::init_logger(level);

    if run(&matches)? {
        log::warn!("Restart requested, exiting with status {RESTART_EXIT_CODE}");
        std::process::exit(RESTART_EXIT_CODE);
    }
    Ok(())
}
