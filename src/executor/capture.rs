//! Line-oriented capture of child process output.
//!
//! Each stream is drained by its own thread so a child filling one pipe
//! never blocks on the other.

use std::io::{BufRead, BufReader, Read};
use std::thread::JoinHandle;

/// Accumulates output lines for post-run inspection.
#[derive(Debug, Default)]
pub(crate) struct CaptureHandler {
    buffer: String,
    lines: usize,
}

impl CaptureHandler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record one line; the terminator is normalized to `\n`.
    pub(crate) fn on_line(&mut self, line: &str) {
        self.buffer.push_str(line.trim_end_matches(['\r', '\n']));
        self.buffer.push('\n');
        self.lines += 1;
    }

    pub(crate) fn finish(self) -> String {
        self.buffer
    }
}

/// Drain `reader` line by line on a new thread.
///
/// `label` names the stream in trace logs. Invalid UTF-8 is replaced rather
/// than aborting the capture.
pub(crate) fn spawn_reader<R>(reader: R, label: String) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut capture = CaptureHandler::new();
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&raw);
                    log::trace!("{label}: {}", line.trim_end());
                    capture.on_line(&line);
                }
                Err(e) => {
                    log::debug!("{label}: read error: {e}");
                    break;
                }
            }
        }
        log::trace!("{label}: {} line(s) captured", capture.lines);
        capture.finish()
    })
}
