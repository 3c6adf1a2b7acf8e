use std::process::ExitCode;

use clap::Parser;
use tg_core::{list_sensors, Sysfs, ThermgovError};
use tracing::error;

use thermgov::app;
use thermgov::cli::{self, Cli};
use thermgov::logging;

fn print_available_sensors(sysfs: &Sysfs) {
    eprintln!("Available sensors : {}", app::format_sensor_listing(&list_sensors(sysfs)));
}

fn fail(err: anyhow::Error, sysfs: &Sysfs, daemon: bool) -> ExitCode {
    // stderr is gone once detached
    if daemon {
        error!("{:#}", err);
    }
    eprintln!("Error: {:#}", err);
    if let Some(ThermgovError::SensorNotFound(_)) = err.downcast_ref::<ThermgovError>() {
        eprintln!();
        print_available_sensors(sysfs);
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let sysfs = Sysfs::new(&cli.sysfs_root);

    if cli.is_bare() {
        eprintln!("{}", cli::usage());
        print_available_sensors(&sysfs);
        return ExitCode::FAILURE;
    }

    if cli.list_sensors {
        return match app::print_sensors(&sysfs, cli.json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e, &sysfs, false),
        };
    }

    if let Some(pid_file) = &cli.kill_daemon {
        logging::init_logging(false);
        return match app::kill_daemon(pid_file) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e, &sysfs, false),
        };
    }

    let settings = match app::load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(settings.is_daemon());

    match app::run(&settings, &sysfs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e, &sysfs, settings.is_daemon()),
    }
}
