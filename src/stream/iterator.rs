//! Stream Iterator
//!
//! Adapts any open stream into a Rust iterator.

use crate::engine::Engine;
use crate::error::Result;
use crate::header::StoreKind;
use crate::registry::StreamHandle;

/// Iterator over the remaining records of a stream.
///
/// Index streams yield raw record images, string streams yield the string
/// bytes without the terminator, vlrecord streams yield payloads. The
/// iterator stops after the first error.
pub struct StreamRecords<'a> {
    engine: &'a mut Engine,
    stream: StreamHandle,
    done: bool,
}

impl<'a> StreamRecords<'a> {
    pub(super) fn new(engine: &'a mut Engine, stream: StreamHandle) -> Self {
        Self {
            engine,
            stream,
            done: false,
        }
    }

    fn advance(&mut self) -> Result<Option<Vec<u8>>> {
        let kind = self.engine.stream(self.stream)?.kind;
        match kind {
            StoreKind::Index => self.engine.next_record(self.stream),
            StoreKind::String => Ok(self
                .engine
                .next_string(self.stream, usize::MAX)?
                .map(String::into_bytes)),
            StoreKind::VLRecord => self.engine.next_vlrecord(self.stream, usize::MAX),
        }
    }
}

impl<'a> Iterator for StreamRecords<'a> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
