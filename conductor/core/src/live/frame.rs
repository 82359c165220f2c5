//! Event Stream Framing
//!
//! Incremental decoder for `text/event-stream` bodies. Bytes arrive in
//! arbitrary chunks; complete events come out.
//!
//! # Frame Format
//!
//! ```text
//! : comment line, ignored
//! event: message
//! data: {"type":"ms.MessagingEventNotification",
//! data:  "body":{...}}
//! <blank line dispatches the event>
//! ```
//!
//! Multiple `data` lines are joined with `\n`. A single space after the
//! colon is stripped. Lines may end in LF or CRLF. Fields other than `data`
//! are ignored.
//!
//! # Security
//!
//! - Pending bytes are capped at [`MAX_EVENT_SIZE`] to prevent memory
//!   exhaustion from a stream that never dispatches

use thiserror::Error;

/// Maximum size of one pending event (1 MB)
pub const MAX_EVENT_SIZE: usize = 1024 * 1024;

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Errors from the event stream decoder
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// An event grew past [`MAX_EVENT_SIZE`] without being dispatched
    #[error("Event exceeds maximum size: {size} bytes (max: {max})")]
    TooLarge {
        /// Bytes pending
        size: usize,
        /// Limit
        max: usize,
    },
}

/// Decoder state machine for streaming event parsing
#[derive(Debug)]
pub struct EventStreamDecoder {
    /// Bytes of the current, unterminated line
    line: Vec<u8>,
    /// Data lines of the event being assembled
    data: String,
    /// Whether the current event has any `data` field
    has_data: bool,
}

impl Default for EventStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStreamDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self {
            line: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            data: String::new(),
            has_data: false,
        }
    }

    /// Feed bytes and collect every event they complete
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when pending data exceeds
    /// [`MAX_EVENT_SIZE`]. The decoder is reset in that case.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FrameError> {
        let mut events = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.line);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if let Some(event) = self.process_line(&line) {
                    events.push(event);
                }
                line.clear();
                self.line = line;
            } else {
                self.line.push(byte);
            }
        }

        let pending = self.line.len() + self.data.len();
        if pending > MAX_EVENT_SIZE {
            self.clear();
            return Err(FrameError::TooLarge {
                size: pending,
                max: MAX_EVENT_SIZE,
            });
        }

        Ok(events)
    }

    /// Handle one complete line, returning an event when it dispatches one
    fn process_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            if !self.has_data {
                return None;
            }
            self.has_data = false;
            let mut event = std::mem::take(&mut self.data);
            if event.ends_with('\n') {
                event.pop();
            }
            return Some(event);
        }

        if line[0] == b':' {
            return None;
        }

        let line = String::from_utf8_lossy(line);
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };

        if field == "data" {
            self.data.push_str(value);
            self.data.push('\n');
            self.has_data = true;
        }
        None
    }

    /// Drop any partially received event
    pub fn clear(&mut self) {
        self.line.clear();
        self.data.clear();
        self.has_data = false;
    }
}
