use tracing::warn;

/// Longest unterminated line kept in memory.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reassembles text lines from arbitrarily chunked bytes.
///
/// Lines end at `\n`; a trailing `\r` is dropped. Invalid UTF-8 is replaced
/// rather than rejected so one bad byte never costs the connection. An
/// unterminated line that outgrows [`MAX_LINE_BYTES`] is thrown away up to
/// its next `\n`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    /// Bytes already known to hold no `\n`.
    scanned: usize,
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pops the next complete line, if one has been buffered.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n')
            else {
                self.scanned = self.buffer.len();
                if self.scanned > MAX_LINE_BYTES {
                    warn!(bytes = self.scanned, "Discarding oversized stream line");
                    self.clear();
                    self.discarding = true;
                }
                return None;
            };

            let end = self.scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            return Some(decode(&line[..line.len() - 1]));
        }
    }

    /// Takes whatever is left once the peer has closed the stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() || self.discarding {
            self.clear();
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        Some(decode(&rest))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.discarding = false;
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
