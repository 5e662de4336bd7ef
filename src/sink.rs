use std::{
    collections::{btree_map::Entry, BTreeMap},
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug)]
#[error("cannot write trace for node {node} to {}: {source}", path.display())]
pub struct SinkError {
    pub node: NodeId,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Destination for routed records.
pub trait RecordSink {
    /// Appends `line` (without its newline) to the stream of `node`.
    fn append(&mut self, node: NodeId, line: &str) -> Result<(), SinkError>;
}

/// Name of the outfile for a node, zero-padded to at least 2 digits.
pub fn outfile_name(node: NodeId) -> String {
    format!("outfile_{node:02}")
}

/// Pool of per-node outfile writers, created lazily on first record.
///
/// Outfiles are opened in append mode, so a second run over the same
/// directory extends them. Every writer stays open for the whole run and
/// is flushed exactly once by [`FileSinkPool::finish`].
pub struct FileSinkPool {
    dir: PathBuf,
    truncate: bool,
    writers: BTreeMap<NodeId, BufWriter<File>>,
}

impl FileSinkPool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            truncate: false,
            writers: BTreeMap::new(),
        }
    }

    /// Truncate existing outfiles on first open instead of appending.
    pub fn truncate_existing(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    fn writer_for(&mut self, node: NodeId) -> Result<&mut BufWriter<File>, SinkError> {
        match self.writers.entry(node) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.dir.join(outfile_name(node));
                let mut opts = OpenOptions::new();
                opts.create(true).write(true);
                if self.truncate {
                    opts.truncate(true);
                } else {
                    opts.append(true);
                }
                let file = opts.open(&path).map_err(|source| SinkError {
                    node,
                    path: path.clone(),
                    source,
                })?;
                Ok(entry.insert(BufWriter::new(file)))
            }
        }
    }

    /// Flushes and closes every outfile.
    pub fn finish(self) -> Result<(), SinkError> {
        let dir = self.dir;
        for (node, mut writer) in self.writers {
            writer.flush().map_err(|source| SinkError {
                node,
                path: dir.join(outfile_name(node)),
                source,
            })?;
        }
        Ok(())
    }
}

impl RecordSink for FileSinkPool {
    fn append(&mut self, node: NodeId, line: &str) -> Result<(), SinkError> {
        if let Err(source) = writeln!(self.writer_for(node)?, "{line}") {
            return Err(SinkError {
                node,
                path: self.dir.join(outfile_name(node)),
                source,
            });
        }
        Ok(())
    }
}
