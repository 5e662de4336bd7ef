use std::{collections::BTreeSet, io::BufRead};

use log::warn;
use thiserror::Error;

use crate::{
    record::{self, MalformedRecord},
    sink::{RecordSink, SinkError},
    tokenizer, NodeId,
};

/// Tuning knobs for a demux run.
#[derive(Debug, Clone)]
pub struct DemuxOptions {
    /// Characters separating record fields.
    pub delimiters: Vec<char>,
    /// When set, node ids at or above this bound abort the run.
    pub max_nodes: Option<u64>,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            delimiters: vec![' '],
            max_nodes: None,
        }
    }
}

/// Counters for a completed demux run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DemuxStats {
    /// Records routed to an outfile.
    pub records: u64,
    /// Lines skipped because they carry no node id.
    pub skipped: u64,
    /// Distinct nodes seen.
    pub nodes: u64,
}

#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("cannot read trace line {line_no}: {source}")]
    Read {
        line_no: u64,
        source: std::io::Error,
    },
    #[error("node id {node} on line {line_no} is outside the node limit {limit}")]
    NodeOutOfRange {
        node: NodeId,
        line_no: u64,
        limit: u64,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Routes every line of `reader` to the sink of its originating node.
///
/// Lines are processed strictly in order and reproduced verbatim. A line
/// with fewer than two tokens has no routing key; it is skipped with a
/// warning and counted in [`DemuxStats::skipped`]. A second token without
/// a leading digit routes to node 0.
pub fn demux<R: BufRead, S: RecordSink>(
    reader: R,
    sink: &mut S,
    options: &DemuxOptions,
) -> Result<DemuxStats, DemuxError> {
    let mut stats = DemuxStats::default();
    let mut nodes = BTreeSet::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line.map_err(|source| DemuxError::Read { line_no, source })?;
        let tokens = tokenizer::tokenize(&line, &options.delimiters);
        let node = match record::node_id(&tokens) {
            Ok(node) => node,
            Err(MalformedRecord { found }) => {
                warn!("skipping line {line_no}: {found} token(s), no node id");
                stats.skipped += 1;
                continue;
            }
        };
        if let Some(limit) = options.max_nodes {
            if node >= limit {
                return Err(DemuxError::NodeOutOfRange {
                    node,
                    line_no,
                    limit,
                });
            }
        }
        sink.append(node, &line)?;
        nodes.insert(node);
        stats.records += 1;
    }
    stats.nodes = nodes.len() as u64;
    Ok(stats)
}

#[cfg(test)]
mod test {
    use std::{collections::BTreeMap, io::Cursor};

    use crate::sink::{RecordSink, SinkError};

    use super::*;

    #[derive(Default)]
    struct MemorySink {
        routed: BTreeMap<u64, String>,
    }

    impl RecordSink for MemorySink {
        fn append(&mut self, node: u64, line: &str) -> Result<(), SinkError> {
            let buf = self.routed.entry(node).or_default();
            buf.push_str(line);
            buf.push('\n');
            Ok(())
        }
    }

    fn run(
        input: &str,
        options: &DemuxOptions,
    ) -> (MemorySink, Result<DemuxStats, DemuxError>) {
        let mut sink = MemorySink::default();
        let result = demux(Cursor::new(input), &mut sink, options);
        (sink, result)
    }

    #[test]
    fn routes_lines_by_second_token() {
        let (sink, result) = run("A 3 foo\nB 12 bar\nC 3 baz\n", &DemuxOptions::default());
        let stats = result.unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(sink.routed[&3], "A 3 foo\nC 3 baz\n");
        assert_eq!(sink.routed[&12], "B 12 bar\n");
    }

    #[test]
    fn preserves_original_spacing() {
        let (sink, result) = run("A   3  foo\n", &DemuxOptions::default());
        result.unwrap();
        assert_eq!(sink.routed[&3], "A   3  foo\n");
    }

    #[test]
    fn skips_lines_without_a_node_id() {
        let (sink, result) = run("HELLO\n\nA 1 ok\n", &DemuxOptions::default());
        let stats = result.unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(sink.routed.len(), 1);
        assert_eq!(sink.routed[&1], "A 1 ok\n");
    }

    #[test]
    fn non_numeric_ids_route_to_node_zero() {
        let (sink, result) = run("A xyz payload\n", &DemuxOptions::default());
        result.unwrap();
        assert_eq!(sink.routed[&0], "A xyz payload\n");
    }

    #[test]
    fn rejects_ids_at_or_above_the_bound() {
        let options = DemuxOptions {
            max_nodes: Some(64),
            ..DemuxOptions::default()
        };
        let (sink, result) = run("A 63 ok\nB 64 over\n", &options);
        match result {
            Err(DemuxError::NodeOutOfRange {
                node: 64,
                line_no: 2,
                limit: 64,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        // the line before the violation is already routed
        assert_eq!(sink.routed[&63], "A 63 ok\n");
    }

    #[test]
    fn unbounded_runs_accept_any_id() {
        let (sink, result) = run("A 4096 far\n", &DemuxOptions::default());
        assert_eq!(result.unwrap().records, 1);
        assert_eq!(sink.routed[&4096], "A 4096 far\n");
    }
}
