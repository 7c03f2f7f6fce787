//! Input normalization for qrels and runs.
//!
//! A [`Converter`] wraps data in one of three shapes (a mapping of
//! mappings, a [`Frame`], or a one-pass record stream) and serves it in
//! whichever shape a consumer asks for. One-pass streams can be split with
//! [`Converter::tee`] into independent readers backed by a shared spool
//! that only keeps the records some reader has not yet seen.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::io::{BufWriter, Write};
use std::ops::Bound;
use std::rc::Rc;

use tempfile::NamedTempFile;

use crate::constants::{QREL_COLUMNS, QREL_ITERATION_COLUMN, RUN_COLUMNS};
use crate::error::FormatError;
use crate::frame::Frame;
use crate::trec_io::{write_trec_qrels, write_trec_run};
use crate::types::{Qrel, ScoredDoc};
use crate::value::Value;

/// Query id -> document id -> grade.
pub type Mapping<G> = BTreeMap<String, BTreeMap<String, G>>;

/// Qrels as query id -> document id -> relevance.
pub type QrelsMap = Mapping<i32>;

/// A run as query id -> document id -> score.
pub type RunMap = Mapping<f64>;

/// A record type a [`Converter`] can normalize.
pub trait Record: Clone + fmt::Debug + Sized + 'static {
    /// The per-document value stored in the mapping shape.
    type Grade: Copy + fmt::Debug + 'static;

    /// Noun used in error messages (`"qrels"` or `"run"`).
    const KIND: &'static str;

    /// Columns a table must have.
    const COLUMNS: &'static [&'static str];

    /// Columns a table may have.
    const OPTIONAL_COLUMNS: &'static [&'static str];

    /// Returns the query id.
    fn query_id(&self) -> &str;

    /// Returns the document id.
    fn doc_id(&self) -> &str;

    /// Returns the grade.
    fn grade(&self) -> Self::Grade;

    /// Builds a record from mapping entries.
    fn from_parts(query_id: String, doc_id: String, grade: Self::Grade) -> Self;

    /// Builds a record from cells ordered as `COLUMNS` then `OPTIONAL_COLUMNS`.
    ///
    /// # Errors
    ///
    /// Returns `FormatError::InvalidCell` if a cell is empty or has the wrong type.
    fn from_cells(cells: &[Option<&Value>], row: usize) -> Result<Self, FormatError>;

    /// Returns cells ordered as `COLUMNS` then `OPTIONAL_COLUMNS`.
    fn to_cells(&self) -> Vec<Option<Value>>;

    /// Writes records in the TREC text format.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    fn write_trec<W: Write>(out: W, records: impl Iterator<Item = Self>) -> std::io::Result<()>;
}

fn id_cell(
    kind: &'static str,
    cell: Option<&Value>,
    row: usize,
    column: &str,
) -> Result<String, FormatError> {
    match cell {
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(Value::Int(i)) => Ok(i.to_string()),
        _ => Err(FormatError::InvalidCell {
            kind,
            row,
            column: column.to_string(),
            reason: "expected a string or integer identifier",
        }),
    }
}

impl Record for Qrel {
    type Grade = i32;

    const KIND: &'static str = "qrels";
    const COLUMNS: &'static [&'static str] = QREL_COLUMNS;
    const OPTIONAL_COLUMNS: &'static [&'static str] = &[QREL_ITERATION_COLUMN];

    fn query_id(&self) -> &str {
        &self.query_id
    }

    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn grade(&self) -> i32 {
        self.relevance
    }

    fn from_parts(query_id: String, doc_id: String, relevance: i32) -> Self {
        Self {
            query_id,
            doc_id,
            relevance,
            iteration: None,
        }
    }

    fn from_cells(cells: &[Option<&Value>], row: usize) -> Result<Self, FormatError> {
        let query_id = id_cell(Self::KIND, cells[0], row, QREL_COLUMNS[0])?;
        let doc_id = id_cell(Self::KIND, cells[1], row, QREL_COLUMNS[1])?;
        let relevance = cells[2]
            .and_then(Value::as_int)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| FormatError::InvalidCell {
                kind: Self::KIND,
                row,
                column: QREL_COLUMNS[2].to_string(),
                reason: "expected an integer relevance grade",
            })?;
        let iteration = cells.get(3).copied().flatten().map(Value::to_plain_string);
        Ok(Self {
            query_id,
            doc_id,
            relevance,
            iteration,
        })
    }

    fn to_cells(&self) -> Vec<Option<Value>> {
        vec![
            Some(Value::from(self.query_id.as_str())),
            Some(Value::from(self.doc_id.as_str())),
            Some(Value::from(self.relevance)),
            self.iteration.as_deref().map(Value::from),
        ]
    }

    fn write_trec<W: Write>(out: W, records: impl Iterator<Item = Self>) -> std::io::Result<()> {
        write_trec_qrels(out, records)
    }
}

impl Record for ScoredDoc {
    type Grade = f64;

    const KIND: &'static str = "run";
    const COLUMNS: &'static [&'static str] = RUN_COLUMNS;
    const OPTIONAL_COLUMNS: &'static [&'static str] = &[];

    fn query_id(&self) -> &str {
        &self.query_id
    }

    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn grade(&self) -> f64 {
        self.score
    }

    fn from_parts(query_id: String, doc_id: String, score: f64) -> Self {
        Self {
            query_id,
            doc_id,
            score,
        }
    }

    fn from_cells(cells: &[Option<&Value>], row: usize) -> Result<Self, FormatError> {
        let query_id = id_cell(Self::KIND, cells[0], row, RUN_COLUMNS[0])?;
        let doc_id = id_cell(Self::KIND, cells[1], row, RUN_COLUMNS[1])?;
        let score = cells[2]
            .and_then(Value::as_float)
            .ok_or_else(|| FormatError::InvalidCell {
                kind: Self::KIND,
                row,
                column: RUN_COLUMNS[2].to_string(),
                reason: "expected a numeric score",
            })?;
        Ok(Self {
            query_id,
            doc_id,
            score,
        })
    }

    fn to_cells(&self) -> Vec<Option<Value>> {
        vec![
            Some(Value::from(self.query_id.as_str())),
            Some(Value::from(self.doc_id.as_str())),
            Some(Value::Float(self.score)),
        ]
    }

    fn write_trec<W: Write>(out: W, records: impl Iterator<Item = Self>) -> std::io::Result<()> {
        write_trec_run(out, records)
    }
}

type Stream<R> = Box<dyn Iterator<Item = Result<R, FormatError>>>;

struct Spool<R> {
    source: Stream<R>,
    buffer: VecDeque<Result<R, FormatError>>,
    // Absolute index of buffer[0]
    offset: usize,
    cursors: Vec<Option<usize>>,
    exhausted: bool,
}

impl<R: Clone> Spool<R> {
    fn next_for(&mut self, reader: usize) -> Option<Result<R, FormatError>> {
        let pos = self.cursors[reader]?;
        let idx = pos - self.offset;
        if idx == self.buffer.len() {
            if self.exhausted {
                return None;
            }
            match self.source.next() {
                Some(item) => self.buffer.push_back(item),
                None => {
                    self.exhausted = true;
                    return None;
                }
            }
        }
        let item = self.buffer[idx].clone();
        self.cursors[reader] = Some(pos + 1);
        self.trim();
        Some(item)
    }

    fn add_reader_at(&mut self, pos: usize) -> usize {
        self.cursors.push(Some(pos));
        self.cursors.len() - 1
    }

    fn release(&mut self, reader: usize) {
        self.cursors[reader] = None;
        self.trim();
    }

    fn trim(&mut self) {
        let lowest = self.cursors.iter().flatten().min().copied();
        let keep_from = lowest.unwrap_or(self.offset + self.buffer.len());
        while self.offset < keep_from && self.buffer.pop_front().is_some() {
            self.offset += 1;
        }
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// One reader of a shared one-pass stream.
///
/// Every reader created from the same stream yields the same records in the
/// same order. Records are buffered only until the slowest live reader has
/// consumed them; dropping a reader releases its position.
pub struct TeeReader<R: Clone> {
    spool: Rc<RefCell<Spool<R>>>,
    id: usize,
}

impl<R: Clone> TeeReader<R> {
    fn new(source: Stream<R>) -> Self {
        let spool = Spool {
            source,
            buffer: VecDeque::new(),
            offset: 0,
            cursors: vec![Some(0)],
            exhausted: false,
        };
        Self {
            spool: Rc::new(RefCell::new(spool)),
            id: 0,
        }
    }

    fn empty() -> Self
    where
        R: 'static,
    {
        Self::new(Box::new(std::iter::empty()))
    }

    /// Creates `n` readers positioned where this one is, consuming it.
    fn split(self, n: usize) -> Vec<Self> {
        let readers = {
            let mut spool = self.spool.borrow_mut();
            let pos = spool.cursors[self.id].unwrap_or(spool.offset);
            (0..n)
                .map(|_| Self {
                    spool: Rc::clone(&self.spool),
                    id: spool.add_reader_at(pos),
                })
                .collect()
        };
        drop(self);
        readers
    }

    /// Returns how many records are held for slower readers.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.spool.borrow().buffered()
    }
}

impl<R: Clone> Iterator for TeeReader<R> {
    type Item = Result<R, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.spool.borrow_mut().next_for(self.id)
    }
}

impl<R: Clone> Drop for TeeReader<R> {
    fn drop(&mut self) {
        if let Ok(mut spool) = self.spool.try_borrow_mut() {
            spool.release(self.id);
        }
    }
}

impl<R: Clone> fmt::Debug for TeeReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeeReader")
            .field("id", &self.id)
            .field("buffered", &self.buffered())
            .finish()
    }
}

/// The shape a [`Converter`] holds its data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Query id -> document id -> grade
    Mapping,
    /// A [`Frame`] with named columns
    Table,
    /// A one-pass sequence of records
    Records,
}

enum Source<R: Record> {
    Mapping(Rc<Mapping<R::Grade>>),
    Table(Rc<Frame>),
    Records(TeeReader<R>),
}

/// Accepts qrels or a run in any supported shape and serves it in any other.
///
/// Converting out of the `Records` shape consumes the stream: later
/// conversions of the same converter see only what remains. Use
/// [`tee`](Self::tee) first when several consumers need the data.
///
/// # Examples
///
/// ```
/// use ir_eval::{Qrel, QrelsConverter};
///
/// let stream = vec![Qrel::new("q1", "d1", 1), Qrel::new("q1", "d2", 0), Qrel::new("q2", "d1", 2)];
/// let mut views = QrelsConverter::from_records(stream).tee(2);
///
/// let mapping = views[0].as_mapping().unwrap();
/// assert_eq!(mapping["q1"]["d1"], 1);
///
/// let table = views[1].as_table().unwrap();
/// assert_eq!(table.len(), 3);
/// ```
pub struct Converter<R: Record> {
    source: Source<R>,
}

/// Converter for judgments.
pub type QrelsConverter = Converter<Qrel>;

/// Converter for scored documents.
pub type RunConverter = Converter<ScoredDoc>;

impl<R: Record> Converter<R> {
    /// Wraps a mapping of mappings.
    #[must_use]
    pub fn from_mapping(mapping: Mapping<R::Grade>) -> Self {
        Self::from_shared_mapping(Rc::new(mapping))
    }

    /// Wraps a shared mapping of mappings.
    #[must_use]
    pub fn from_shared_mapping(mapping: Rc<Mapping<R::Grade>>) -> Self {
        Self {
            source: Source::Mapping(mapping),
        }
    }

    /// Wraps a table. Columns are checked when the data is first converted.
    #[must_use]
    pub fn from_table(frame: Frame) -> Self {
        Self {
            source: Source::Table(Rc::new(frame)),
        }
    }

    /// Wraps a one-pass sequence of records.
    #[must_use]
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        I::IntoIter: 'static,
    {
        Self::from_results(records.into_iter().map(Ok))
    }

    /// Wraps a one-pass sequence of fallibly parsed records, such as a TREC file reader.
    #[must_use]
    pub fn from_results<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Result<R, FormatError>>,
        I::IntoIter: 'static,
    {
        Self {
            source: Source::Records(TeeReader::new(Box::new(records.into_iter()))),
        }
    }

    /// Returns the shape the data is held in.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self.source {
            Source::Mapping(_) => Shape::Mapping,
            Source::Table(_) => Shape::Table,
            Source::Records(_) => Shape::Records,
        }
    }

    /// Splits into `n` independent converters over the same data.
    ///
    /// Mapping and table shapes share their data; a record stream is
    /// split into `n` readers that each yield every record once.
    #[must_use]
    pub fn tee(self, n: usize) -> Vec<Self> {
        match self.source {
            Source::Mapping(m) => (0..n)
                .map(|_| Self::from_shared_mapping(Rc::clone(&m)))
                .collect(),
            Source::Table(t) => (0..n)
                .map(|_| Self {
                    source: Source::Table(Rc::clone(&t)),
                })
                .collect(),
            Source::Records(reader) => reader
                .split(n)
                .into_iter()
                .map(|r| Self {
                    source: Source::Records(r),
                })
                .collect(),
        }
    }

    /// Serves the data as a record stream.
    ///
    /// Mapping entries come out ordered by query id then document id; table
    /// rows and streamed records keep their order.
    pub fn as_records(&mut self) -> Records<R> {
        let inner = match &mut self.source {
            Source::Mapping(m) => RecordsInner::Mapping {
                mapping: Rc::clone(m),
                position: None,
            },
            Source::Table(t) => match table_indices::<R>(t) {
                Ok(indices) => RecordsInner::Table {
                    frame: Rc::clone(t),
                    indices,
                    next: 0,
                },
                Err(e) => RecordsInner::Failed(Some(e)),
            },
            Source::Records(reader) => {
                RecordsInner::Stream(std::mem::replace(reader, TeeReader::empty()))
            }
        };
        Records { inner }
    }

    /// Serves the data as a mapping of mappings.
    ///
    /// A later record for the same (query, document) pair replaces an earlier one.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if a table lacks required columns or a record
    /// cannot be read.
    pub fn as_mapping(&mut self) -> Result<Rc<Mapping<R::Grade>>, FormatError> {
        if let Source::Mapping(m) = &self.source {
            return Ok(Rc::clone(m));
        }
        let mut mapping: Mapping<R::Grade> = BTreeMap::new();
        for record in self.as_records() {
            let record = record?;
            mapping
                .entry(record.query_id().to_string())
                .or_default()
                .insert(record.doc_id().to_string(), record.grade());
        }
        Ok(Rc::new(mapping))
    }

    /// Serves the data as a table.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if a table lacks required columns or a record
    /// cannot be read.
    pub fn as_table(&mut self) -> Result<Rc<Frame>, FormatError> {
        if let Source::Table(t) = &self.source {
            t.require_columns(R::KIND, R::COLUMNS)?;
            return Ok(Rc::clone(t));
        }
        let mut frame = Frame::new(R::COLUMNS.iter().chain(R::OPTIONAL_COLUMNS).copied());
        for record in self.as_records() {
            frame.push_row(record?.to_cells());
        }
        Ok(Rc::new(frame))
    }

    /// Returns the distinct query ids.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if the data cannot be read.
    pub fn query_ids(&mut self) -> Result<BTreeSet<String>, FormatError> {
        if let Source::Mapping(m) = &self.source {
            return Ok(m.keys().cloned().collect());
        }
        self.as_records()
            .map(|r| r.map(|r| r.query_id().to_string()))
            .collect()
    }

    /// Writes the data to a fresh temporary file in TREC format.
    ///
    /// The file is deleted when the returned handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if the data cannot be read or the file cannot
    /// be written.
    pub fn as_temp_file(&mut self) -> Result<NamedTempFile, FormatError> {
        let mut file = NamedTempFile::new().map_err(|e| FormatError::io("create temp file", &e))?;
        let mut error = None;
        let records = self.as_records().map_while(|r| match r {
            Ok(record) => Some(record),
            Err(e) => {
                error = Some(e);
                None
            }
        });
        R::write_trec(BufWriter::new(file.as_file_mut()), records)
            .map_err(|e| FormatError::io("write temp file", &e))?;
        match error {
            Some(e) => Err(e),
            None => Ok(file),
        }
    }
}

impl<R: Record> fmt::Debug for Converter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("kind", &R::KIND)
            .field("shape", &self.shape())
            .finish()
    }
}

impl<R: Record> From<Frame> for Converter<R> {
    fn from(frame: Frame) -> Self {
        Self::from_table(frame)
    }
}

impl<R: Record> From<Vec<R>> for Converter<R> {
    fn from(records: Vec<R>) -> Self {
        Self::from_records(records)
    }
}

impl From<QrelsMap> for QrelsConverter {
    fn from(mapping: QrelsMap) -> Self {
        Self::from_mapping(mapping)
    }
}

impl From<RunMap> for RunConverter {
    fn from(mapping: RunMap) -> Self {
        Self::from_mapping(mapping)
    }
}

fn table_indices<R: Record>(frame: &Frame) -> Result<Vec<Option<usize>>, FormatError> {
    frame.require_columns(R::KIND, R::COLUMNS)?;
    Ok(R::COLUMNS
        .iter()
        .chain(R::OPTIONAL_COLUMNS)
        .map(|c| frame.column_index(c))
        .collect())
}

enum RecordsInner<R: Record> {
    Mapping {
        mapping: Rc<Mapping<R::Grade>>,
        position: Option<(String, String)>,
    },
    Table {
        frame: Rc<Frame>,
        indices: Vec<Option<usize>>,
        next: usize,
    },
    Stream(TeeReader<R>),
    Failed(Option<FormatError>),
}

/// Record stream produced by [`Converter::as_records`].
pub struct Records<R: Record> {
    inner: RecordsInner<R>,
}

fn mapping_next<G: Copy>(
    mapping: &Mapping<G>,
    position: Option<&(String, String)>,
) -> Option<(String, String, G)> {
    let first_doc = |query_id: &String, docs: &BTreeMap<String, G>| {
        docs.iter()
            .next()
            .map(|(doc_id, grade)| (query_id.clone(), doc_id.clone(), *grade))
    };
    match position {
        None => mapping.iter().find_map(|(q, docs)| first_doc(q, docs)),
        Some((query_id, doc_id)) => {
            let same_query = mapping.get(query_id).and_then(|docs| {
                docs.range::<String, _>((Bound::Excluded(doc_id), Bound::Unbounded))
                    .next()
                    .map(|(d, grade)| (query_id.clone(), d.clone(), *grade))
            });
            same_query.or_else(|| {
                mapping
                    .range::<String, _>((Bound::Excluded(query_id), Bound::Unbounded))
                    .find_map(|(q, docs)| first_doc(q, docs))
            })
        }
    }
}

impl<R: Record> Iterator for Records<R> {
    type Item = Result<R, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RecordsInner::Mapping { mapping, position } => {
                let (query_id, doc_id, grade) = mapping_next(mapping, position.as_ref())?;
                *position = Some((query_id.clone(), doc_id.clone()));
                Some(Ok(R::from_parts(query_id, doc_id, grade)))
            }
            RecordsInner::Table {
                frame,
                indices,
                next,
            } => {
                let row = frame.row(*next)?;
                let cells: Vec<Option<&Value>> = indices
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i].as_ref()))
                    .collect();
                let record = R::from_cells(&cells, *next);
                *next += 1;
                Some(record)
            }
            RecordsInner::Stream(reader) => reader.next(),
            RecordsInner::Failed(error) => error.take().map(Err),
        }
    }
}

impl<R: Record> fmt::Debug for Records<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records").field("kind", &R::KIND).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qrels() -> Vec<Qrel> {
        vec![
            Qrel::new("0", "D0", 0),
            Qrel::new("0", "D1", 1),
            Qrel::new("1", "D0", 1),
            Qrel::new("1", "D3", 2),
        ]
    }

    #[test]
    fn mapping_to_records_is_sorted() {
        let mut mapping = QrelsMap::new();
        mapping.entry("1".into()).or_default().insert("D3".into(), 2);
        mapping.entry("0".into()).or_default().insert("D1".into(), 1);
        mapping.entry("1".into()).or_default().insert("D0".into(), 1);
        mapping.entry("0".into()).or_default().insert("D0".into(), 0);
        mapping.entry("2".into()).or_default();

        let records: Vec<Qrel> = QrelsConverter::from(mapping)
            .as_records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records, qrels());
    }

    #[test]
    fn records_to_mapping_last_write_wins() {
        let mut stream = qrels();
        stream.push(Qrel::new("0", "D0", 3));
        let mapping = QrelsConverter::from(stream).as_mapping().unwrap();
        assert_eq!(mapping["0"]["D0"], 3);
        assert_eq!(mapping["1"].len(), 2);
    }

    #[test]
    fn table_round_trip() {
        let mut converter = QrelsConverter::from(qrels());
        let table = converter.as_table().unwrap();
        assert_eq!(table.columns(), ["query_id", "doc_id", "relevance", "iteration"]);

        let back: Vec<Qrel> = QrelsConverter::from_table((*table).clone())
            .as_records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(back, qrels());
    }

    #[test]
    fn table_with_integer_ids_and_scores() {
        let frame = Frame::new(["query_id", "doc_id", "score", "extra"])
            .with_row([Some(Value::Int(7)), Some("d".into()), Some(Value::Int(3)), None]);
        let run: Vec<ScoredDoc> = RunConverter::from(frame)
            .as_records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(run, vec![ScoredDoc::new("7", "d", 3.0)]);
    }

    #[test]
    fn table_missing_columns_fails_once() {
        let frame = Frame::new(["query_id", "docno", "relevance"]);
        let mut converter = QrelsConverter::from(frame);
        let mut records = converter.as_records();
        assert!(matches!(records.next(), Some(Err(FormatError::MissingColumns { .. }))));
        assert!(records.next().is_none());
        assert!(converter.as_mapping().is_err());
    }

    #[test]
    fn stream_drains_after_first_conversion() {
        let mut converter = QrelsConverter::from(qrels());
        assert_eq!(converter.query_ids().unwrap().len(), 2);
        assert!(converter.as_mapping().unwrap().is_empty());
    }

    #[test]
    fn tee_of_random_access_shares_data() {
        let views = QrelsConverter::from(QrelsMap::new()).tee(3);
        assert_eq!(views.len(), 3);
        assert!(views.iter().all(|v| v.shape() == Shape::Mapping));
    }

    #[test]
    fn tee_readers_are_independent() {
        let mut views = QrelsConverter::from(qrels()).tee(3);
        let first: Vec<Qrel> = views[0].as_records().collect::<Result<_, _>>().unwrap();
        let second: Vec<Qrel> = views[1].as_records().take(2).collect::<Result<_, _>>().unwrap();
        let third: Vec<Qrel> = views[2].as_records().collect::<Result<_, _>>().unwrap();
        assert_eq!(first, qrels());
        assert_eq!(second, qrels()[..2].to_vec());
        assert_eq!(third, qrels());
    }

    #[test]
    fn spool_releases_consumed_records() {
        let mut readers = TeeReader::new(Box::new(qrels().into_iter().map(Ok))).split(2);
        let mut slow = readers.pop().unwrap();
        let mut fast = readers.pop().unwrap();
        assert!(fast.next().is_some());
        assert!(fast.next().is_some());
        assert_eq!(fast.buffered(), 2);
        assert!(slow.next().is_some());
        assert_eq!(fast.buffered(), 1);
        drop(slow);
        assert_eq!(fast.buffered(), 0);
        assert_eq!(fast.count(), 2);
    }

    #[test]
    fn errors_are_replayed_to_every_reader() {
        let stream = vec![
            Ok(Qrel::new("0", "D0", 1)),
            Err(FormatError::MalformedLine {
                kind: "qrels",
                line: 2,
                reason: "bad".to_string(),
            }),
        ];
        let mut views = QrelsConverter::from_results(stream).tee(2);
        assert!(views[0].as_mapping().is_err());
        assert!(views[1].as_mapping().is_err());
    }

    #[test]
    fn temp_file_contents() {
        let mut converter = RunConverter::from(vec![
            ScoredDoc::new("0", "D0", 0.8),
            ScoredDoc::new("0", "D2", 0.7),
        ]);
        let file = converter.as_temp_file().unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text, "0 Q0 D0 0 0.8 run\n0 Q0 D2 1 0.7 run\n");
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
    }
}
