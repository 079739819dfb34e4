//! Newline framing for chunked HTTP bodies.

use crate::error::Result;
use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Splits incoming chunks into complete lines, keeping a partial tail until
/// its newline arrives.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos);
            self.buf.advance(1);
            lines.push(decode(&line));
        }
        lines
    }

    /// Whatever is left once the body ends.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(decode(&rest))
    }
}

fn decode(raw: &[u8]) -> String {
    let line = String::from_utf8_lossy(raw);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}

/// Adapts a stream of body chunks into a stream of lines.
pub fn lines<S, E>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<crate::Error>,
{
    struct State<S> {
        chunks: Pin<Box<S>>,
        decoder: LineDecoder,
        ready: VecDeque<String>,
        done: bool,
    }

    let state = State {
        chunks: Box::pin(chunks),
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.push(&chunk);
                    state.ready.extend(lines);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.done = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
}
