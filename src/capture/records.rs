use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::analysis::packet::{AnalysisError, PacketRecord, RawPacketRecord};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record file not found: {0}")]
    FileNotFound(String),

    #[error("Cannot open record file '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Line {line}: cannot read record: {source}")]
    Read {
        line: usize,
        source: std::io::Error,
    },

    #[error("Line {line}: malformed record: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Line {line}: {source}")]
    Invalid { line: usize, source: AnalysisError },
}

/// Reads already-decoded packets from a JSON-lines file, one object per line:
/// `{"src": "10.0.0.1", "dst": "10.0.0.2", "protocol": 6, "size": 60, "dst_port": 443}`
pub struct RecordReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl RecordReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecordError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RecordError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path).map_err(|source| RecordError::Open {
            path: path.display().to_string(),
            source,
        })?;
        info!("Reading packet records from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<PacketRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.next()?;
            self.line += 1;
            let line = self.line;

            let text = match next {
                Ok(text) => text,
                Err(source) => return Some(Err(RecordError::Read { line, source })),
            };
            if text.trim().is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<RawPacketRecord>(&text)
                .map_err(|source| RecordError::Malformed { line, source })
                .and_then(|raw| {
                    PacketRecord::try_from(raw).map_err(|source| RecordError::Invalid { line, source })
                });
            return Some(parsed);
        }
    }
}
