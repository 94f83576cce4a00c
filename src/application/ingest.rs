//! Bulk CSV ingestion for catalog uploads.
//!
//! Uploads are headerless CSV with a fixed column order per entity type. The
//! whole document is parsed before anything is written, so one bad record
//! rejects the upload.

use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::domain::entities::{Chair, Estate};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: column `{column}` has invalid value `{value}`")]
    Field {
        line: u64,
        column: &'static str,
        value: String,
    },
}

/// A row type that can be read from an upload.
pub trait CsvRecord: Sized {
    const COLUMNS: &'static [&'static str];

    fn from_fields(fields: &mut Fields<'_>) -> Result<Self, IngestError>;
}

/// Cursor over one record's columns in declaration order.
pub struct Fields<'r> {
    record: &'r StringRecord,
    columns: &'static [&'static str],
    line: u64,
    next: usize,
}

impl<'r> Fields<'r> {
    pub fn string(&mut self) -> String {
        let (_, raw) = self.advance();
        raw.to_string()
    }

    pub fn parse<T: FromStr>(&mut self) -> Result<T, IngestError> {
        let (column, raw) = self.advance();
        raw.trim().parse().map_err(|_| IngestError::Field {
            line: self.line,
            column,
            value: raw.to_string(),
        })
    }

    fn advance(&mut self) -> (&'static str, &'r str) {
        let index = self.next;
        self.next += 1;
        let record: &'r StringRecord = self.record;
        let column = self.columns.get(index).copied().unwrap_or("?");
        (column, record.get(index).unwrap_or_default())
    }
}

pub fn parse_csv<R: CsvRecord>(data: &[u8]) -> Result<Vec<R>, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |position| position.line());
        if row.len() != R::COLUMNS.len() {
            return Err(IngestError::ColumnCount {
                line,
                expected: R::COLUMNS.len(),
                found: row.len(),
            });
        }
        let mut fields = Fields {
            record: &row,
            columns: R::COLUMNS,
            line,
            next: 0,
        };
        records.push(R::from_fields(&mut fields)?);
    }

    Ok(records)
}

impl CsvRecord for Chair {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "thumbnail",
        "price",
        "height",
        "width",
        "depth",
        "color",
        "features",
        "kind",
        "popularity",
        "stock",
    ];

    fn from_fields(fields: &mut Fields<'_>) -> Result<Self, IngestError> {
        Ok(Chair {
            id: fields.parse()?,
            name: fields.string(),
            description: fields.string(),
            thumbnail: fields.string(),
            price: fields.parse()?,
            height: fields.parse()?,
            width: fields.parse()?,
            depth: fields.parse()?,
            color: fields.string(),
            features: fields.string(),
            kind: fields.string(),
            popularity: fields.parse()?,
            stock: fields.parse()?,
        })
    }
}

impl CsvRecord for Estate {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "thumbnail",
        "address",
        "latitude",
        "longitude",
        "rent",
        "door_height",
        "door_width",
        "features",
        "popularity",
    ];

    fn from_fields(fields: &mut Fields<'_>) -> Result<Self, IngestError> {
        Ok(Estate {
            id: fields.parse()?,
            name: fields.string(),
            description: fields.string(),
            thumbnail: fields.string(),
            address: fields.string(),
            latitude: fields.parse()?,
            longitude: fields.parse()?,
            rent: fields.parse()?,
            door_height: fields.parse()?,
            door_width: fields.parse()?,
            features: fields.string(),
            popularity: fields.parse()?,
        })
    }
}
