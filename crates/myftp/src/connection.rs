//! Line and payload exchange with the server over one command connection.

use std::io::{self, ErrorKind, Read, Write};

use myftp_protocol::{
    CHUNK_SIZE, END_MARKER, MarkerScanner, READY_TO_RECEIVE, Response, Scan, TRANSFER_START,
};

use crate::AppError;

/// Outcome of a `get` or `put` request line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Transfer {
    /// The server accepted; payload bytes follow.
    Started,
    /// The server answered with a final response instead.
    Refused(Response),
}

/// A command connection. Bytes read past a line or payload boundary are
/// kept in `pending` and served before the socket is read again.
pub(crate) struct ServerConnection<S> {
    stream: S,
    pending: Vec<u8>,
}

impl<S: Read + Write> ServerConnection<S> {
    pub(crate) const fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    /// Reads one line without its terminator.
    pub(crate) fn read_line(&mut self) -> Result<String, AppError> {
        loop {
            if let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
                let rest = self.pending.split_off(end + 1);
                let line = std::mem::replace(&mut self.pending, rest);
                let text = String::from_utf8_lossy(&line);
                return Ok(text.trim_end_matches(['\r', '\n']).to_owned());
            }
            let mut buffer = [0_u8; CHUNK_SIZE];
            let read = self.read_socket(&mut buffer)?;
            self.pending.extend_from_slice(&buffer[..read]);
        }
    }

    /// Sends `line` with a trailing newline.
    pub(crate) fn send_line(&mut self, line: &str) -> Result<(), AppError> {
        self.write_all(format!("{line}\n").as_bytes())
    }

    /// Sends a command and reads its single response line.
    pub(crate) fn command(&mut self, line: &str) -> Result<Response, AppError> {
        self.send_line(line)?;
        self.read_line().map(|text| Response::parse(&text))
    }

    /// Sends `get name` and reports whether a payload follows.
    pub(crate) fn request_download(&mut self, name: &str) -> Result<Transfer, AppError> {
        self.request_transfer(&format!("get {name}"), TRANSFER_START)
    }

    /// Sends `put name` and reports whether the server is ready for bytes.
    pub(crate) fn request_upload(&mut self, name: &str) -> Result<Transfer, AppError> {
        self.request_transfer(&format!("put {name}"), READY_TO_RECEIVE)
    }

    fn request_transfer(&mut self, line: &str, accepted: &str) -> Result<Transfer, AppError> {
        let response = self.command(line)?;
        if response.is_success() && response.message() == accepted {
            Ok(Transfer::Started)
        } else {
            Ok(Transfer::Refused(response))
        }
    }

    /// Copies payload bytes into `sink` until the end marker.
    ///
    /// The whole payload is consumed even when `sink` fails, so the
    /// connection stays in step with the server. Returns the number of
    /// payload bytes and the first sink error, if any.
    pub(crate) fn receive_payload(
        &mut self,
        sink: &mut dyn Write,
    ) -> Result<(u64, Option<io::Error>), AppError> {
        let mut scanner = MarkerScanner::new();
        let mut received = 0_u64;
        let mut sink_error = None;
        let mut chunk = std::mem::take(&mut self.pending);
        loop {
            let (payload, trailing) = match scanner.feed(&chunk) {
                Scan::Pending { payload } => (payload, None),
                Scan::Complete { payload, trailing } => (payload, Some(trailing)),
            };
            received += payload.len() as u64;
            if sink_error.is_none()
                && let Err(error) = sink.write_all(&payload)
            {
                sink_error = Some(error);
            }
            if let Some(trailing) = trailing {
                self.pending = trailing;
                if sink_error.is_none()
                    && let Err(error) = sink.flush()
                {
                    sink_error = Some(error);
                }
                return Ok((received, sink_error));
            }
            let mut buffer = [0_u8; CHUNK_SIZE];
            let read = self.read_socket(&mut buffer)?;
            chunk = buffer[..read].to_vec();
        }
    }

    /// Streams `source` followed by the end marker. The caller reads the
    /// server's verdict afterwards.
    pub(crate) fn send_payload(&mut self, source: &mut dyn Read) -> Result<u64, SendFailure> {
        let mut buffer = [0_u8; CHUNK_SIZE];
        let mut sent = 0_u64;
        loop {
            let read = match source.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    // Close the transfer so the server keeps what it has and
                    // the connection remains usable.
                    self.write_all(END_MARKER)?;
                    return Err(SendFailure::Local(error));
                }
            };
            self.write_all(&buffer[..read])?;
            sent += read as u64;
        }
        self.write_all(END_MARKER)?;
        Ok(sent)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        self.stream
            .write_all(bytes)
            .and_then(|()| self.stream.flush())
            .map_err(AppError::SendRequest)
    }

    fn read_socket(&mut self, buffer: &mut [u8]) -> Result<usize, AppError> {
        loop {
            match self.stream.read(buffer) {
                Ok(0) => return Err(AppError::Disconnected),
                Ok(read) => return Ok(read),
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(AppError::ReadResponse(error)),
            }
        }
    }

    #[cfg(test)]
    pub(crate) const fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// Why an upload stopped early.
#[derive(Debug)]
pub(crate) enum SendFailure {
    /// The local file could not be read; the marker was still sent.
    Local(io::Error),
    /// The server connection failed.
    Connection(AppError),
}

impl From<AppError> for SendFailure {
    fn from(error: AppError) -> Self {
        Self::Connection(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use rstest::rstest;

    /// Scripted server: reads come from `incoming`, writes land in `sent`.
    struct Scripted {
        incoming: Cursor<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl Scripted {
        fn new(incoming: &[u8]) -> Self {
            Self {
                incoming: Cursor::new(incoming.to_vec()),
                sent: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            // Trickle a few bytes at a time so boundaries fall mid-marker.
            let limit = buffer.len().min(5);
            self.incoming.read(&mut buffer[..limit])
        }
    }

    impl Write for Scripted {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.sent.write(bytes)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _bytes: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lines_are_split_and_stripped() {
        let mut connection = ServerConnection::new(Scripted::new(b"first\r\nsecond\n"));
        assert_eq!(connection.read_line().expect("first line"), "first");
        assert_eq!(connection.read_line().expect("second line"), "second");
        assert!(matches!(
            connection.read_line(),
            Err(AppError::Disconnected)
        ));
    }

    #[rstest]
    #[case(b"SUCCESS: FILE_TRANSFER_START\n".as_slice(), true)]
    #[case(b"ERROR: 404 - File not found.\n".as_slice(), false)]
    fn download_request_reports_acceptance(#[case] reply: &[u8], #[case] started: bool) {
        let mut connection = ServerConnection::new(Scripted::new(reply));
        let transfer = connection.request_download("a.txt").expect("request");
        assert_eq!(transfer == Transfer::Started, started);
        assert_eq!(connection.get_ref().sent, b"get a.txt\n");
    }

    #[test]
    fn payload_stops_at_marker_and_keeps_next_line() {
        let mut wire = b"SUCCESS: FILE_TRANSFER_START\n".to_vec();
        wire.extend_from_slice(b"binary\nFILE_TRANSFER_EN\xff");
        wire.extend_from_slice(END_MARKER);
        wire.extend_from_slice(b"/srv/ftp\n");
        let mut connection = ServerConnection::new(Scripted::new(&wire));

        assert_eq!(
            connection.request_download("a.bin").expect("request"),
            Transfer::Started
        );
        let mut file = Vec::new();
        let (received, error) = connection.receive_payload(&mut file).expect("payload");
        assert!(error.is_none());
        assert_eq!(file, b"binary\nFILE_TRANSFER_EN\xff");
        assert_eq!(received, file.len() as u64);
        assert_eq!(connection.read_line().expect("next line"), "/srv/ftp");
    }

    #[test]
    fn sink_failure_still_drains_payload() {
        let mut wire = vec![b'x'; 100];
        wire.extend_from_slice(END_MARKER);
        wire.extend_from_slice(b"next\n");
        let mut connection = ServerConnection::new(Scripted::new(&wire));

        let (received, error) = connection
            .receive_payload(&mut FailingSink)
            .expect("payload");
        assert_eq!(received, 100);
        assert!(error.is_some());
        assert_eq!(connection.read_line().expect("next line"), "next");
    }

    #[test]
    fn disconnect_mid_payload_is_reported() {
        let mut connection = ServerConnection::new(Scripted::new(b"partial"));
        let outcome = connection.receive_payload(&mut Vec::new());
        assert!(matches!(outcome, Err(AppError::Disconnected)));
    }

    #[test]
    fn upload_appends_marker() {
        let mut connection = ServerConnection::new(Scripted::new(b""));
        let sent = connection
            .send_payload(&mut Cursor::new(b"abc".to_vec()))
            .expect("send payload");
        assert_eq!(sent, 3);
        let mut expected = b"abc".to_vec();
        expected.extend_from_slice(END_MARKER);
        assert_eq!(connection.get_ref().sent, expected);
    }
}
