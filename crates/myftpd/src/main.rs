//! Binary entrypoint for the myftp server.

use std::io::{self, Write};
use std::process::ExitCode;

use myftp_config::{Config, ConfigError};
use myftpd::process::{self, LaunchError, SystemShutdownSignal};

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(ConfigError::Cli(error)) => error.exit(),
    };
    match process::run_server(&config, &SystemShutdownSignal::new()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

fn report(error: &LaunchError) {
    tracing::error!(target: "myftpd::process", error = %error, "myftp server failed");
    // Telemetry may be the thing that failed, so stderr always gets a copy.
    writeln!(io::stderr().lock(), "myftpserver: {error}").ok();
}
