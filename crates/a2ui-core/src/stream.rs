//! Incremental reconstruction of protocol messages from a live text stream.
//!
//! The assembler scans each chunk once, byte by byte, tracking whether it is
//! inside the top-level array, the brace depth of the current message object,
//! and string/escape state. String and escape tracking take precedence over
//! every structural character, so braces and brackets inside string values
//! never affect nesting. As soon as a top-level object's closing brace is seen
//! the object is decoded and delivered to the [`MessageSink`].
//!
//! Only the current in-flight object is retained between chunks, so memory is
//! bounded by the largest single message rather than the whole response.
//!
//! Structural characters are ASCII, so scanning raw bytes is safe even when a
//! chunk boundary splits a multi-byte UTF-8 sequence.

use crate::config::{AssemblerConfig, FinishMode};
use crate::error::StreamError;
use crate::message::{Message, parse_message_value};
use crate::parser::parse_messages;
use serde_json::Value;

/// Receiver for assembler events. Every method defaults to a no-op.
pub trait MessageSink {
    fn on_message(&mut self, _message: &Message) {}
    fn on_error(&mut self, _error: &StreamError) {}
    fn on_complete(&mut self, _messages: &[Message]) {}
}

impl MessageSink for () {}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn on_message(&mut self, message: &Message) {
        (**self).on_message(message);
    }

    fn on_error(&mut self, error: &StreamError) {
        (**self).on_error(error);
    }

    fn on_complete(&mut self, messages: &[Message]) {
        (**self).on_complete(messages);
    }
}

/// Owned record of one sink callback.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message(Message),
    Error { code: &'static str, message: String },
    Complete(usize),
}

impl MessageSink for Vec<StreamEvent> {
    fn on_message(&mut self, message: &Message) {
        self.push(StreamEvent::Message(message.clone()));
    }

    fn on_error(&mut self, error: &StreamError) {
        self.push(StreamEvent::Error {
            code: error.code(),
            message: error.to_string(),
        });
    }

    fn on_complete(&mut self, messages: &[Message]) {
        self.push(StreamEvent::Complete(messages.len()));
    }
}

/// Streaming message assembler for one response.
///
/// `on_complete` fires exactly once: when the top-level array closes, or from
/// [`finish`](Self::finish) if it never did. Input after the closing `]` is
/// ignored.
#[derive(Debug)]
pub struct StreamingAssembler<S: MessageSink = ()> {
    sink: S,
    config: AssemblerConfig,
    buffer: Vec<u8>,
    /// Buffer offset up to which bytes have been scanned.
    scanned: usize,
    in_array: bool,
    depth: usize,
    in_string: bool,
    escape_next: bool,
    object_start: Option<usize>,
    /// Objects started inside the current top-level array.
    objects_in_array: usize,
    closed: bool,
    finished: bool,
    completed: bool,
    messages: Vec<Message>,
    errors: usize,
}

impl StreamingAssembler<()> {
    /// Assembler without callbacks; read results from `messages()`.
    pub fn detached() -> Self {
        Self::new(())
    }
}

impl<S: MessageSink> StreamingAssembler<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, AssemblerConfig::default())
    }

    pub fn with_config(sink: S, config: AssemblerConfig) -> Self {
        Self {
            sink,
            config,
            buffer: Vec::new(),
            scanned: 0,
            in_array: false,
            depth: 0,
            in_string: false,
            escape_next: false,
            object_start: None,
            objects_in_array: 0,
            closed: false,
            finished: false,
            completed: false,
            messages: Vec::new(),
            errors: 0,
        }
    }

    /// Feed one text chunk. Returns how many messages it completed.
    pub fn feed(&mut self, chunk: &str) -> usize {
        self.feed_bytes(chunk.as_bytes())
    }

    /// Feed one raw chunk of UTF-8 bytes. Returns how many messages it completed.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> usize {
        if self.closed || self.finished {
            if !chunk.is_empty() {
                tracing::trace!(len = chunk.len(), "ignoring input after stream end");
            }
            return 0;
        }
        let before = self.messages.len();
        self.buffer.extend_from_slice(chunk);
        self.scan();
        self.compact();
        self.messages.len() - before
    }

    fn scan(&mut self) {
        let mut i = self.scanned;
        while i < self.buffer.len() {
            let b = self.buffer[i];
            i += 1;

            if self.escape_next {
                self.escape_next = false;
                continue;
            }
            if self.in_string {
                match b {
                    b'\\' => self.escape_next = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            let at = i - 1;
            match b {
                b'"' => self.in_string = true,
                b'[' if !self.in_array => {
                    self.in_array = true;
                    self.objects_in_array = 0;
                }
                b']' if self.in_array && self.depth == 0 => {
                    if self.close_array(at) {
                        self.scanned = self.buffer.len();
                        return;
                    }
                }
                b'{' if self.in_array => {
                    if self.depth == 0 {
                        self.object_start = Some(at);
                        self.objects_in_array += 1;
                    }
                    self.depth += 1;
                }
                b'}' if self.in_array && self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        if let Some(start) = self.object_start.take() {
                            self.emit_object(start, at);
                        }
                    }
                }
                _ => {}
            }
        }
        self.scanned = i;
    }

    /// Handle a top-level `]`. Returns `true` when the stream is now closed.
    ///
    /// An array that never held an object (e.g. `[x]` in leading prose) does
    /// not end the stream; scanning resumes looking for the next `[`.
    fn close_array(&mut self, at: usize) -> bool {
        self.in_array = false;
        if self.objects_in_array == 0 {
            tracing::debug!(offset = at, "skipping top-level array without objects");
            return false;
        }
        self.closed = true;
        self.buffer.clear();
        self.complete();
        true
    }

    fn emit_object(&mut self, start: usize, end: usize) {
        let parsed = serde_json::from_slice::<Value>(&self.buffer[start..=end]);
        match parsed {
            Ok(value) => match parse_message_value(value) {
                Ok(message) => {
                    tracing::debug!(kind = message.kind(), "stream message assembled");
                    self.sink.on_message(&message);
                    self.messages.push(message);
                }
                Err(source) => {
                    let preview = self.preview(&self.buffer[start..=end]);
                    self.report(StreamError::InvalidMessage { preview, source });
                }
            },
            Err(source) => {
                let preview = self.preview(&self.buffer[start..=end]);
                self.report(StreamError::MalformedObject { preview, source });
            }
        }
    }

    /// Drop everything that can no longer contribute to a message.
    fn compact(&mut self) {
        let keep_from = match self.object_start {
            Some(start) => start,
            None if self.in_array => self.scanned,
            None => match self.buffer.iter().rposition(|b| *b == b'[') {
                Some(pos) => pos,
                None => 0,
            },
        };
        if keep_from == 0 {
            return;
        }
        self.buffer.drain(..keep_from);
        self.scanned -= keep_from;
        if let Some(start) = self.object_start.as_mut() {
            *start -= keep_from;
        }
    }

    /// End of input: run the last-resort recovery parse (unless the array
    /// closed cleanly), fire `on_complete` if it has not fired, and return
    /// every message assembled.
    pub fn finish(&mut self) -> &[Message] {
        if !self.finished {
            self.finished = true;
            if !self.closed {
                self.recover();
            }
            self.complete();
        }
        &self.messages
    }

    fn recover(&mut self) {
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match parse_messages(text) {
            Ok(recovered) => self.absorb_recovered(recovered),
            Err(source) => match self.config.finish_mode {
                FinishMode::Lenient => {
                    tracing::debug!(error = %source, "final recovery parse failed; ignoring");
                }
                FinishMode::Strict => {
                    let preview = self.preview(text.as_bytes());
                    self.report(StreamError::Recovery { preview, source });
                }
            },
        }
        self.buffer.clear();
        self.scanned = 0;
        self.object_start = None;
    }

    /// Append recovered messages not already delivered.
    fn absorb_recovered(&mut self, recovered: Vec<Message>) {
        for message in recovered {
            if self.messages.contains(&message) {
                continue;
            }
            tracing::debug!(kind = message.kind(), "message recovered at stream end");
            self.sink.on_message(&message);
            self.messages.push(message);
        }
    }

    fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        tracing::debug!(
            messages = self.messages.len(),
            errors = self.errors,
            "stream complete"
        );
        self.sink.on_complete(&self.messages);
    }

    fn report(&mut self, error: StreamError) {
        self.errors += 1;
        tracing::warn!(code = error.code(), "{error}");
        self.sink.on_error(&error);
    }

    fn preview(&self, bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        let limit = self.config.error_preview_chars;
        match text.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.into_owned(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of `on_error` reports so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
