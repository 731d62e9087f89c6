//! JSON parser building value trees in a caller-chosen resource
//!
//! Input may arrive in chunks through [`Parser::write`]; the document is
//! read once [`Parser::finish`] is called. Every string, array and object of
//! the result is allocated through the parser's storage handle, and that
//! handle is what each node reports from `storage()`.

mod reader;

use tracing::debug;

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::storage::StorageHandle;
use crate::value::Value;

use reader::Reader;

/// Incremental JSON parser.
///
/// ```
/// # use pjson_rs_storage::{MonotonicResource, Parser, StorageHandle};
/// let arena = MonotonicResource::new();
/// let mut parser = Parser::new(StorageHandle::borrowed(&arena));
/// parser.write(br#"{"id": 7, "#)?;
/// parser.write(br#""tags": ["a", "b"]}"#)?;
/// parser.finish()?;
/// let value = parser.release()?;
/// assert_eq!(value.as_object().unwrap().get("id").and_then(|v| v.as_i64()), Some(7));
/// # Ok::<(), pjson_rs_storage::Error>(())
/// ```
pub struct Parser<'r> {
    storage: StorageHandle<'r>,
    config: ParserConfig,
    buffer: Vec<u8>,
    result: Option<Value<'r>>,
    finished: bool,
}

impl<'r> Parser<'r> {
    /// Parser with default options building into `storage`
    pub fn new(storage: StorageHandle<'r>) -> Self {
        Self::with_config(storage, ParserConfig::default())
    }

    /// Parser with explicit options
    pub fn with_config(storage: StorageHandle<'r>, config: ParserConfig) -> Self {
        Self {
            storage,
            config,
            buffer: Vec::new(),
            result: None,
            finished: false,
        }
    }

    /// Handle the next document will be built with
    pub fn storage(&self) -> &StorageHandle<'r> {
        &self.storage
    }

    /// Active options
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Append a chunk of input, returning the number of bytes consumed
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] if the current document was already
    /// finished and not yet released or reset.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.finished {
            return Err(Error::syntax(self.buffer.len(), "document already finished"));
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    /// Read the buffered input as one complete document.
    ///
    /// Calling it again before [`release`](Self::release) is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Incomplete`] for empty or truncated input,
    /// [`Error::Syntax`] for malformed input, [`Error::DepthLimitExceeded`]
    /// past the configured nesting and [`Error::Allocation`] when the
    /// resource refuses a block. The buffered input is kept.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let input = std::str::from_utf8(&self.buffer)
            .map_err(|e| Error::syntax(e.valid_up_to(), "invalid UTF-8"))?;
        let value = Reader::new(input, &self.storage, self.config).read_document()?;
        debug!(
            bytes = self.buffer.len(),
            kind = ?value.kind(),
            trivial = self.storage.is_trivially_deallocatable(),
            "parsed JSON document"
        );
        self.result = Some(value);
        self.finished = true;
        Ok(())
    }

    /// Whether a finished document is waiting to be released
    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// Take the finished document; the parser is ready for the next one
    ///
    /// # Errors
    ///
    /// Returns [`Error::Incomplete`] if [`finish`](Self::finish) has not
    /// succeeded.
    pub fn release(&mut self) -> Result<Value<'r>> {
        let value = self.result.take().ok_or(Error::Incomplete)?;
        self.buffer.clear();
        self.finished = false;
        Ok(value)
    }

    /// Discard buffered input and any unreleased document
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.result = None;
        self.finished = false;
    }

    /// Like [`reset`](Self::reset), switching to another storage handle
    pub fn reset_in(&mut self, storage: StorageHandle<'r>) {
        self.reset();
        self.storage = storage;
    }
}

/// Parse one complete document into `storage`.
///
/// ```
/// # use pjson_rs_storage::{StaticResource, StorageHandle, parse};
/// let mut buffer = [0u8; 1024];
/// let resource = StaticResource::new(&mut buffer);
/// let value = parse(r#"[1, "two", {"three": 3.0}]"#, StorageHandle::borrowed(&resource))?;
/// assert_eq!(value.as_array().unwrap().len(), 3);
/// assert!(resource.used() > 0);
/// # Ok::<(), pjson_rs_storage::Error>(())
/// ```
///
/// # Errors
///
/// Same as [`Parser::finish`].
pub fn parse<'r>(input: &str, storage: StorageHandle<'r>) -> Result<Value<'r>> {
    parse_with_config(input, storage, ParserConfig::default())
}

/// [`parse`] with explicit options
///
/// # Errors
///
/// Same as [`Parser::finish`].
pub fn parse_with_config<'r>(
    input: &str,
    storage: StorageHandle<'r>,
    config: ParserConfig,
) -> Result<Value<'r>> {
    Reader::new(input, &storage, config).read_document()
}
