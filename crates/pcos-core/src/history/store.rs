//! CSV-backed prediction log
//!
//! Records are only ever appended. The header is written when the file is
//! created and every later record must produce the same header.

use crate::error::{PcosError, Result};
use crate::models::{Label, PredictionRecord};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default history file name, also used as the download name
pub const HISTORY_FILE_NAME: &str = "riwayat_prediksi_pcos.csv";

/// MIME type of the exported history
pub const HISTORY_MIME: &str = "text/csv";

pub const LABEL_COLUMN: &str = "Prediksi";
pub const PROBABILITY_POSITIVE_COLUMN: &str = "Probabilitas_PCOS";
pub const PROBABILITY_NEGATIVE_COLUMN: &str = "Probabilitas_Tidak_PCOS";

const FIXED_COLUMNS: [&str; 3] = [
    LABEL_COLUMN,
    PROBABILITY_POSITIVE_COLUMN,
    PROBABILITY_NEGATIVE_COLUMN,
];

/// Persisted history: header plus records in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    pub header: Vec<String>,
    pub records: Vec<PredictionRecord>,
}

impl HistoryLog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature columns, i.e. the header without the outcome columns
    pub fn feature_columns(&self) -> Vec<&str> {
        self.header
            .iter()
            .map(String::as_str)
            .filter(|c| !FIXED_COLUMNS.contains(c))
            .collect()
    }
}

/// Owner of the durable history file
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column header produced by a record
    pub fn header_for(record: &PredictionRecord) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(record.features.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    fn row_for(record: &PredictionRecord) -> Vec<String> {
        [
            record.label.as_str().to_string(),
            record.probability_positive.to_string(),
            record.probability_negative.to_string(),
        ]
        .into_iter()
        .chain(record.features.iter().map(|(_, value)| value.to_string()))
        .collect()
    }

    /// Header of the existing file, `None` when the file is absent or empty
    pub fn read_header(&self) -> Result<Option<Vec<String>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        Ok(if header.is_empty() { None } else { Some(header) })
    }

    /// Append one record, creating the file with a header if needed
    pub fn append(&self, record: &PredictionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let expected = Self::header_for(record);
        let existing = self.read_header()?;
        if let Some(found) = &existing {
            if *found != expected {
                return Err(PcosError::HistorySchemaMismatch {
                    expected,
                    found: found.clone(),
                });
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        // An edited file may have lost its final line break
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if existing.is_none() {
            writer.write_record(&expected)?;
            info!(path = %self.path.display(), columns = expected.len(), "Created history file");
        }
        writer.write_record(Self::row_for(record))?;
        writer.flush()?;

        debug!(path = %self.path.display(), label = %record.label, "Appended history record");
        Ok(())
    }

    /// Read the whole file; an absent file is an empty log
    pub fn load_all(&self) -> Result<HistoryLog> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HistoryLog::default()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if header.is_empty() {
            return Ok(HistoryLog::default());
        }

        let column = |name: &str| header.iter().position(|c| c == name);
        let (label_idx, pos_idx, neg_idx) = match (
            column(LABEL_COLUMN),
            column(PROBABILITY_POSITIVE_COLUMN),
            column(PROBABILITY_NEGATIVE_COLUMN),
        ) {
            (Some(l), Some(p), Some(n)) => (l, p, n),
            _ => {
                return Err(PcosError::MalformedHistory {
                    row: 0,
                    reason: format!("header {:?} lacks the outcome columns", header),
                })
            }
        };

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let row_no = i + 1;
            let malformed = |reason: String| PcosError::MalformedHistory { row: row_no, reason };
            let field = |idx: usize| row.get(idx).unwrap_or("");
            let number = |idx: usize| {
                field(idx)
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("{:?} in column {} is not a number", field(idx), header[idx])))
            };

            let label = Label::parse(field(label_idx))
                .ok_or_else(|| malformed(format!("unknown label {:?}", field(label_idx))))?;

            let mut features = Vec::with_capacity(header.len().saturating_sub(FIXED_COLUMNS.len()));
            for (idx, name) in header.iter().enumerate() {
                if idx == label_idx || idx == pos_idx || idx == neg_idx {
                    continue;
                }
                features.push((name.clone(), number(idx)?));
            }

            records.push(PredictionRecord {
                label,
                probability_positive: number(pos_idx)?,
                probability_negative: number(neg_idx)?,
                features,
            });
        }

        Ok(HistoryLog { header, records })
    }

    /// Raw file bytes for download, `None` when no history exists yet
    pub fn export(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check that the history directory accepts writes
    pub fn check_writable(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let marker = dir.join(".pcos-write-check");
        let mut file = File::create(&marker)?;
        file.write_all(b"ok")?;
        drop(file);
        fs::remove_file(&marker)?;
        Ok(())
    }
}

/// True for an empty file or one whose last byte is `\n`
fn ends_with_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
