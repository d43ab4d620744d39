//! Relative-coordinate reports over stored export geometry.
//!
//! Stored offsets are absolute positions inside each source document. A
//! report subtracts a chosen origin from every row so that exported pieces
//! can be laid out relative to one another.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::StoreError;
use crate::ExportRecord;

/// Reference point subtracted from stored offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum Origin {
    /// `(0, 0)`: offsets are reported as stored.
    #[default]
    Zero,
    /// The minimum `x_offset` and `y_offset` across the reported rows.
    Auto,
    /// A caller-supplied pair.
    Explicit { x: i64, y: i64 },
}

impl Origin {
    /// Resolve to a concrete `(x, y)` for the given rows.
    pub fn resolve(&self, rows: &[ExportRecord]) -> Result<(i64, i64), StoreError> {
        match *self {
            Self::Zero => Ok((0, 0)),
            Self::Explicit { x, y } => Ok((x, y)),
            Self::Auto => {
                let x = rows.iter().map(|r| r.x_offset).min();
                let y = rows.iter().map(|r| r.y_offset).min();
                x.zip(y).ok_or(StoreError::EmptyReport)
            }
        }
    }
}

/// Parses `auto`, or `X`, `X,Y`, `,Y` where each ordinate is an optional
/// `-` or `n` sign followed by digits. A missing ordinate is 0.
impl FromStr for Origin {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "auto" {
            return Ok(Self::Auto);
        }

        let invalid = || StoreError::InvalidOrigin(s.to_string());
        let (x, y) = match s.split_once(',') {
            Some((x, y)) => (x, y),
            None => (s, ""),
        };
        let x = parse_ordinate(x).ok_or_else(invalid)?;
        let y = parse_ordinate(y).ok_or_else(invalid)?;
        Ok(Self::Explicit { x, y })
    }
}

fn parse_ordinate(text: &str) -> Option<i64> {
    if text.is_empty() {
        return Some(0);
    }
    let (negative, digits) = match text.strip_prefix(['-', 'n']) {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("0,0"),
            Self::Auto => f.write_str("auto"),
            Self::Explicit { x, y } => write!(f, "{x},{y}"),
        }
    }
}

/// One row expressed relative to the report origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelativeRow {
    pub record: ExportRecord,
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// Union rectangle of every reported row, in relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Bounds {
    pub fn width(&self) -> i64 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i64 {
        self.bottom.saturating_sub(self.top)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginReport {
    /// The concrete origin that was subtracted.
    pub origin: (i64, i64),
    pub rows: Vec<RelativeRow>,
    /// `None` when there are no rows.
    pub bounds: Option<Bounds>,
}

/// Express `rows` relative to `origin` and compute their union bounds.
///
/// # Errors
///
/// [`StoreError::EmptyReport`] when `origin` is [`Origin::Auto`] and `rows`
/// is empty. [`StoreError::CoordinateOverflow`] when a relative edge does
/// not fit in an `i64`.
pub fn origin_report(rows: Vec<ExportRecord>, origin: Origin) -> Result<OriginReport, StoreError> {
    let (x_origin, y_origin) = origin.resolve(&rows)?;

    let rows = rows
        .into_iter()
        .map(|record| relative_row(record, (x_origin, y_origin)))
        .collect::<Result<Vec<_>, _>>()?;

    let bounds = rows.iter().fold(None, |acc: Option<Bounds>, row| {
        Some(match acc {
            None => Bounds {
                left: row.left,
                top: row.top,
                right: row.right,
                bottom: row.bottom,
            },
            Some(b) => Bounds {
                left: b.left.min(row.left),
                top: b.top.min(row.top),
                right: b.right.max(row.right),
                bottom: b.bottom.max(row.bottom),
            },
        })
    });

    Ok(OriginReport {
        origin: (x_origin, y_origin),
        rows,
        bounds,
    })
}

fn relative_row(record: ExportRecord, (x_origin, y_origin): (i64, i64)) -> Result<RelativeRow, StoreError> {
    let edges = (|| {
        let left = record.x_offset.checked_sub(x_origin)?;
        let top = record.y_offset.checked_sub(y_origin)?;
        let right = left.checked_add(record.width)?;
        let bottom = top.checked_add(record.height)?;
        Some((left, top, right, bottom))
    })();
    let Some((left, top, right, bottom)) = edges else {
        return Err(StoreError::CoordinateOverflow(record.path));
    };
    Ok(RelativeRow {
        record,
        left,
        top,
        right,
        bottom,
    })
}

/// Keep rows whose file stem contains any of `substrings`; all rows when
/// `substrings` is empty.
pub fn filter_by_stem<S: AsRef<str>>(rows: Vec<ExportRecord>, substrings: &[S]) -> Vec<ExportRecord> {
    if substrings.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|record| {
            let stem = record
                .path
                .file_stem()
                .map(|s| s.to_string_lossy())
                .unwrap_or_default();
            substrings.iter().any(|s| stem.contains(s.as_ref()))
        })
        .collect()
}
