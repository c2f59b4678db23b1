use anyhow::{Context, Result};
use csv::{ByteRecord, ByteRecordsIntoIter, ReaderBuilder};
use indexmap::IndexMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One data line keyed by header name, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: IndexMap<String, String>,
}

impl RawRow {
    fn from_byte_record(headers: &[String], record: &ByteRecord) -> Self {
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect();
        Self { fields }
    }

    /// Raw value for `column`; absent columns read as "".
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Trimmed value for `column`.
    pub fn trimmed(&self, column: &str) -> &str {
        self.get(column).trim()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Single-pass iterator over the data lines of a CSV file with a header row.
///
/// Records are decoded lossily so a stray invalid byte degrades one field
/// instead of aborting the import. Short records leave trailing columns absent.
pub struct RowReader {
    path: PathBuf,
    headers: Vec<String>,
    records: ByteRecordsIntoIter<BufReader<File>>,
}

impl RowReader {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for RowReader {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.records.next()?;
        Some(
            next.map(|rec| RawRow::from_byte_record(&self.headers, &rec))
                .with_context(|| format!("reading CSV record from {}", self.path.display())),
        )
    }
}

/// Open `path` and read its header row. The file handle lives as long as the reader.
pub fn open_rows(path: &Path, delimiter: u8) -> Result<RowReader> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(BufReader::with_capacity(1 << 20, file));

    let headers: Vec<String> = rdr
        .byte_headers()
        .with_context(|| format!("reading CSV header from {}", path.display()))?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string()
        })
        .collect();

    Ok(RowReader {
        path: path.to_path_buf(),
        headers,
        records: rdr.into_byte_records(),
    })
}
