use serde_json::Value;

/// One decoded line of the server's incremental query response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Request accepted, no tokens produced yet (`status: "processing"`).
    /// Never delivered to consumers; the quiet period between submission and
    /// the first `Generating` is expected behavior, not a protocol violation.
    Queued,
    Generating(String),
    Complete(String),
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error(_))
    }

    /// Whether this event is forwarded to consumers.
    pub fn is_emitted(&self) -> bool {
        !matches!(self, StreamEvent::Queued)
    }
}

/// Decode one line of the stream.
///
/// Returns `None` for empty lines, lines that are not JSON objects, and
/// unrecognized `status` values. The silent skip is deliberate: the wire
/// format may grow new statuses and old clients must keep reading.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    if line.is_empty() {
        return None;
    }
    let json: Value = serde_json::from_str(line).ok()?;
    let status = json.get("status").and_then(Value::as_str)?;

    match status {
        "processing" => Some(StreamEvent::Queued),
        "generating" => {
            let partial = json.get("partial").and_then(Value::as_str).unwrap_or("");
            Some(StreamEvent::Generating(partial.to_string()))
        }
        "complete" => {
            let response = json.get("response").and_then(Value::as_str).unwrap_or("");
            Some(StreamEvent::Complete(response.to_string()))
        }
        "error" => {
            let error = json
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            Some(StreamEvent::Error(error.to_string()))
        }
        _ => None,
    }
}

/// Reassembles newline-terminated lines from arbitrarily sized body chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Drain a trailing unterminated line at end of stream.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Incremental decoder over response body chunks. Stops producing once a
/// terminal event has been seen; the caller is expected to stop reading.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: LineBuffer,
    finished: bool,
    saw_input: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the body carried any bytes at all. Distinguishes a truly
    /// empty response (an error) from one whose lines were all skipped,
    /// which ends silently.
    pub fn saw_input(&self) -> bool {
        self.saw_input
    }

    /// Feed a body chunk, returning the events to deliver, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if !chunk.is_empty() {
            self.saw_input = true;
        }
        let mut events = Vec::new();
        for line in self.buffer.push(chunk) {
            if self.finished {
                break;
            }
            self.take(&line, &mut events);
        }
        events
    }

    /// Signal end of body, decoding any trailing unterminated line.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.finished {
            if let Some(line) = self.buffer.flush() {
                self.take(&line, &mut events);
            }
        }
        events
    }

    fn take(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        if let Some(event) = decode_line(line) {
            if event.is_terminal() {
                self.finished = true;
            }
            if event.is_emitted() {
                events.push(event);
            }
        }
    }
}
