//! Loopback harness shared by the server integration tests.

use std::fs;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use myftp_config::Config;
use myftp_protocol::{END_MARKER, GREETING};
use myftpd::{Server, ServerHandle};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server on ephemeral loopback ports serving a temp directory.
pub struct TestServer {
    pub root: TempDir,
    pub handle: ServerHandle,
}

impl TestServer {
    pub fn start(workers: usize) -> Self {
        let root = TempDir::new().expect("temp dir");
        let config = Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            cancel_port: 0,
            workers,
            root: root.path().to_path_buf(),
            ..Config::default()
        };
        let handle = Server::bind(&config)
            .expect("bind server")
            .start()
            .expect("start server");
        Self { root, handle }
    }

    /// Canonical served directory, as `pwd` reports it.
    pub fn root_path(&self) -> PathBuf {
        fs::canonicalize(self.root.path()).expect("canonical root")
    }

    pub fn connect(&self) -> Client {
        Client::connect(self.handle.local_addr())
    }
}

/// Minimal protocol client.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    /// Connects and consumes the greeting.
    pub fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::connect_silently(addr);
        assert_eq!(client.read_line(), GREETING);
        client
    }

    /// Connects without waiting for the greeting.
    pub fn connect_silently(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to server");
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .expect("set read timeout");
        let writer = stream.try_clone().expect("clone stream");
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    pub fn set_read_timeout(&self, timeout: Duration) {
        self.writer
            .set_read_timeout(Some(timeout))
            .expect("set read timeout");
    }

    pub fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes());
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("write to server");
        self.writer.flush().expect("flush to server");
    }

    /// Reads one line including its newline.
    pub fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        line
    }

    /// Sends a command and returns its single response line.
    pub fn command(&mut self, line: &str) -> String {
        self.send(line);
        self.read_line()
    }

    /// Reads raw bytes up to and excluding the end marker.
    pub fn read_until_marker(&mut self) -> Vec<u8> {
        let mut received = Vec::new();
        let mut byte = [0_u8; 1];
        while !received.ends_with(END_MARKER) {
            self.reader.read_exact(&mut byte).expect("read payload");
            received.push(byte[0]);
        }
        received.truncate(received.len() - END_MARKER.len());
        received
    }

    /// `true` when the server has closed the connection.
    pub fn is_closed(&mut self) -> bool {
        let mut byte = [0_u8; 1];
        match self.reader.read(&mut byte) {
            Ok(0) => true,
            Ok(_) => false,
            Err(error) => matches!(
                error.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
            ),
        }
    }

    /// `true` when nothing arrives within `window`.
    pub fn stays_silent(&mut self, window: Duration) -> bool {
        self.set_read_timeout(window);
        let mut byte = [0_u8; 1];
        let silent = match self.reader.read(&mut byte) {
            Ok(_) => false,
            Err(error) => matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
        };
        self.set_read_timeout(IO_TIMEOUT);
        silent
    }
}

/// Polls `condition` for up to five seconds.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + IO_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Deterministic binary content of `len` bytes.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len)
        .map(|index| u8::try_from((index * 31 + index / 7) % 251).expect("fits in u8"))
        .collect()
}
