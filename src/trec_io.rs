//! Reading and writing the whitespace-delimited TREC formats.
//!
//! Qrels lines are `query_id iteration doc_id relevance`; run lines are
//! `query_id iteration doc_id rank score tag`. Blank lines are skipped.
//! Readers are lazy: each call to `next` reads one line.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;

use crate::constants::{TREC_QRELS_FIELDS, TREC_RUN_FIELDS, TREC_RUN_TAG};
use crate::error::FormatError;
use crate::types::{Qrel, ScoredDoc};

/// Lazy reader of TREC qrels lines.
#[derive(Debug)]
pub struct TrecQrels<R> {
    lines: Lines<R>,
    line: usize,
}

/// Lazy reader of TREC run lines.
#[derive(Debug)]
pub struct TrecRun<R> {
    lines: Lines<R>,
    line: usize,
}

/// Parses TREC qrels from any buffered reader.
///
/// # Examples
///
/// ```
/// use ir_eval::parse_trec_qrels;
///
/// let text = "0 0 D0 0\n0 0 D1 1\n\n1 0 D0 2\n";
/// let qrels: Vec<_> = parse_trec_qrels(text.as_bytes()).collect::<Result<_, _>>().unwrap();
/// assert_eq!(qrels.len(), 3);
/// assert_eq!(qrels[2].relevance, 2);
/// ```
#[must_use]
pub fn parse_trec_qrels<R: BufRead>(reader: R) -> TrecQrels<R> {
    TrecQrels {
        lines: reader.lines(),
        line: 0,
    }
}

/// Parses a TREC run from any buffered reader.
#[must_use]
pub fn parse_trec_run<R: BufRead>(reader: R) -> TrecRun<R> {
    TrecRun {
        lines: reader.lines(),
        line: 0,
    }
}

/// Opens a TREC qrels file.
///
/// # Errors
///
/// Returns `FormatError::Io` if the file cannot be opened.
pub fn read_trec_qrels(path: impl AsRef<Path>) -> Result<TrecQrels<BufReader<File>>, FormatError> {
    let file = File::open(path).map_err(|e| FormatError::io("open qrels", &e))?;
    Ok(parse_trec_qrels(BufReader::new(file)))
}

/// Opens a TREC run file.
///
/// # Errors
///
/// Returns `FormatError::Io` if the file cannot be opened.
pub fn read_trec_run(path: impl AsRef<Path>) -> Result<TrecRun<BufReader<File>>, FormatError> {
    let file = File::open(path).map_err(|e| FormatError::io("open run", &e))?;
    Ok(parse_trec_run(BufReader::new(file)))
}

fn next_fields<R: BufRead>(
    lines: &mut Lines<R>,
    line: &mut usize,
    kind: &'static str,
    expected: usize,
) -> Option<Result<Vec<String>, FormatError>> {
    loop {
        let text = match lines.next()? {
            Ok(text) => text,
            Err(e) => return Some(Err(FormatError::io("read", &e))),
        };
        *line += 1;
        if text.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if fields.len() != expected {
            return Some(Err(FormatError::MalformedLine {
                kind,
                line: *line,
                reason: format!("expected {expected} columns, found {}", fields.len()),
            }));
        }
        return Some(Ok(fields));
    }
}

impl<R: BufRead> Iterator for TrecQrels<R> {
    type Item = Result<Qrel, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let fields = match next_fields(&mut self.lines, &mut self.line, "qrels", TREC_QRELS_FIELDS)? {
            Ok(fields) => fields,
            Err(e) => return Some(Err(e)),
        };
        let mut fields = fields.into_iter();
        let (Some(query_id), Some(iteration), Some(doc_id), Some(relevance)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return None;
        };
        let Ok(relevance) = relevance.parse::<i32>() else {
            return Some(Err(FormatError::MalformedLine {
                kind: "qrels",
                line: self.line,
                reason: format!("relevance '{relevance}' is not an integer"),
            }));
        };
        Some(Ok(Qrel {
            query_id,
            doc_id,
            relevance,
            iteration: Some(iteration),
        }))
    }
}

impl<R: BufRead> Iterator for TrecRun<R> {
    type Item = Result<ScoredDoc, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let fields = match next_fields(&mut self.lines, &mut self.line, "run", TREC_RUN_FIELDS)? {
            Ok(fields) => fields,
            Err(e) => return Some(Err(e)),
        };
        let query_id = fields[0].clone();
        let doc_id = fields[2].clone();
        let Ok(score) = fields[4].parse::<f64>() else {
            return Some(Err(FormatError::MalformedLine {
                kind: "run",
                line: self.line,
                reason: format!("score '{}' is not a number", fields[4]),
            }));
        };
        Some(Ok(ScoredDoc {
            query_id,
            doc_id,
            score,
        }))
    }
}

/// Writes qrels as TREC lines. Judgments without an iteration tag get `0`.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_trec_qrels<W, I>(mut out: W, qrels: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = Qrel>,
{
    for qrel in qrels {
        writeln!(
            out,
            "{} {} {} {}",
            qrel.query_id,
            qrel.iteration.as_deref().unwrap_or("0"),
            qrel.doc_id,
            qrel.relevance
        )?;
    }
    out.flush()
}

/// Writes a run as TREC lines.
///
/// Ranks count from 0 per query in input order; consumers such as
/// trec_eval re-rank by score.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_trec_run<W, I>(mut out: W, run: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = ScoredDoc>,
{
    let mut ranks: HashMap<String, usize> = HashMap::new();
    for doc in run {
        let rank = ranks.entry(doc.query_id.clone()).or_insert(0);
        writeln!(
            out,
            "{} Q0 {} {} {:?} {TREC_RUN_TAG}",
            doc.query_id, doc.doc_id, rank, doc.score
        )?;
        *rank += 1;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let text = "0 Q0 D0 1 0.8 run\n0 Q0 D2 2 0.7 run\n1 Q0 D1 1 8e-1 run\n";
        let run: Vec<ScoredDoc> = parse_trec_run(text.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(run.len(), 3);
        assert_eq!(run[1], ScoredDoc::new("0", "D2", 0.7));
        assert_eq!(run[2].score, 0.8);
    }

    #[test]
    fn qrels_keep_iteration() {
        let qrels: Vec<Qrel> = parse_trec_qrels("q1 Q0 d1 1\n".as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(qrels[0], Qrel::new("q1", "d1", 1).with_iteration("Q0"));
    }

    #[test]
    fn wrong_column_count_names_line() {
        let err = parse_trec_qrels("q1 0 d1 1\n\nq1 0 d2\n".as_bytes())
            .nth(1)
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err,
            FormatError::MalformedLine {
                kind: "qrels",
                line: 3,
                reason: "expected 4 columns, found 3".to_string(),
            }
        );
    }

    #[test]
    fn bad_cells() {
        let err = parse_trec_qrels("q1 0 d1 high\n".as_bytes()).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("not an integer"));
        let err = parse_trec_run("q1 Q0 d1 1 x run\n".as_bytes()).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn write_assigns_ranks_per_query() {
        let mut out = Vec::new();
        write_trec_run(
            &mut out,
            [
                ScoredDoc::new("0", "D0", 0.8),
                ScoredDoc::new("1", "D1", 0.5),
                ScoredDoc::new("0", "D2", 1.0),
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0 Q0 D0 0 0.8 run\n1 Q0 D1 0 0.5 run\n0 Q0 D2 1 1.0 run\n"
        );
    }

    #[test]
    fn write_then_read_qrels() {
        let mut out = Vec::new();
        write_trec_qrels(&mut out, [Qrel::new("0", "D3", 2)]).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "0 0 D3 2\n");
        let back: Vec<Qrel> = parse_trec_qrels(out.as_slice()).collect::<Result<_, _>>().unwrap();
        assert_eq!(back[0].relevance, 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_trec_run("/nonexistent/run.txt").unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
    }
}
