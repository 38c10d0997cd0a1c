//! Integration tests for the `myftp` binary entry point.
//!
//! Covers usage errors and the failure path when no server is listening.

use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_lists_cancel_port_flag() {
    let mut command = cargo_bin_cmd!("myftp");
    command.arg("--help");
    command.assert().success().stdout(contains("--cancel-port"));
}

#[test]
fn missing_port_exits_with_failure() {
    let mut command = cargo_bin_cmd!("myftp");
    command.arg("127.0.0.1");
    command.assert().failure().stderr(contains("Usage"));
}

#[test]
fn invalid_port_exits_with_failure() {
    let mut command = cargo_bin_cmd!("myftp");
    command.args(["127.0.0.1", "not-a-port"]);
    command.assert().failure().stderr(contains("invalid value"));
}

#[test]
fn unreachable_server_exits_with_failure() {
    let port = {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe");
        listener.local_addr().expect("probe address").port()
    };
    let mut command = cargo_bin_cmd!("myftp");
    command.args(["127.0.0.1", &port.to_string()]);
    command.write_stdin("pwd\n");
    command
        .assert()
        .failure()
        .stderr(contains("failed to connect to server"));
}
