//! Reader for ordered event logs in JSON-lines form.
//!
//! Each non-empty line is one [`SequencedEvent`]:
//!
//! ```text
//! {"at":1710032400000,"type":"viewer_joined","viewer_id":"v1"}
//! ```
//!
//! Lines starting with `#` are comments.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use lobby_types::SequencedEvent;

use crate::error::EngineError;

/// Iterator over the events of a log, yielding each with its line number.
#[derive(Debug)]
pub struct EventLog<R> {
    reader: R,
    path: PathBuf,
    line: usize,
}

impl<R: BufRead> EventLog<R> {
    /// Wrap a reader. `path` is only used in error messages.
    pub fn new(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventLog<R> {
    type Item = Result<(usize, SequencedEvent), EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            self.line = self.line.saturating_add(1);
            match self.reader.read_line(&mut buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(EngineError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
            let text = buffer.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let parsed = serde_json::from_str(text)
                .map(|event| (self.line, event))
                .map_err(|source| EngineError::Json {
                    path: self.path.clone(),
                    line: self.line,
                    source,
                });
            return Some(parsed);
        }
    }
}
