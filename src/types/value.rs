use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    MAX_TEXT_LENGTH,
    error::{Result, StorageError},
};

// Days from 0001-01-01 (CE day 1) to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

// YEAR is stored as a signed byte offset from 2000
const YEAR_BASE: i32 = 2000;
pub const MIN_YEAR: i32 = YEAR_BASE + i8::MIN as i32;
pub const MAX_YEAR: i32 = YEAR_BASE + i8::MAX as i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Year,
    Time,
    DateTime,
    Date,
    Text,
}

impl DataType {
    pub fn from_u8(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(DataType::Null),
            0x01 => Ok(DataType::TinyInt),
            0x02 => Ok(DataType::SmallInt),
            0x03 => Ok(DataType::Int),
            0x04 => Ok(DataType::BigInt),
            0x05 => Ok(DataType::Float),
            0x06 => Ok(DataType::Double),
            0x08 => Ok(DataType::Year),
            0x09 => Ok(DataType::Time),
            0x0A => Ok(DataType::DateTime),
            0x0B => Ok(DataType::Date),
            0x0C => Ok(DataType::Text),
            _ => Err(StorageError::InvalidValue {
                reason: format!("unknown data type code {:#04x}", code),
            }),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            DataType::Null => 0x00,
            DataType::TinyInt => 0x01,
            DataType::SmallInt => 0x02,
            DataType::Int => 0x03,
            DataType::BigInt => 0x04,
            DataType::Float => 0x05,
            DataType::Double => 0x06,
            DataType::Year => 0x08,
            DataType::Time => 0x09,
            DataType::DateTime => 0x0A,
            DataType::Date => 0x0B,
            DataType::Text => 0x0C,
        }
    }

    /// Encoded width in bytes, or `None` for TEXT whose width is its length.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            DataType::Null => Some(0),
            DataType::TinyInt | DataType::Year => Some(1),
            DataType::SmallInt => Some(2),
            DataType::Int | DataType::Float | DataType::Time => Some(4),
            DataType::BigInt | DataType::Double | DataType::DateTime | DataType::Date => Some(8),
            DataType::Text => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Null => "NULL",
            DataType::TinyInt => "TINYINT",
            DataType::SmallInt => "SMALLINT",
            DataType::Int => "INT",
            DataType::BigInt => "BIGINT",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Year => "YEAR",
            DataType::Time => "TIME",
            DataType::DateTime => "DATETIME",
            DataType::Date => "DATE",
            DataType::Text => "TEXT",
        };
        f.write_str(name)
    }
}

/// A typed column value.
///
/// `Year` holds the calendar year. `Time` and `DateTime` are stored with
/// whole-second precision, so sub-second parts are dropped on encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Year(i32),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::TinyInt(_) => DataType::TinyInt,
            Value::SmallInt(_) => DataType::SmallInt,
            Value::Int(_) => DataType::Int,
            Value::BigInt(_) => DataType::BigInt,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Year(_) => DataType::Year,
            Value::Time(_) => DataType::Time,
            Value::DateTime(_) => DataType::DateTime,
            Value::Date(_) => DataType::Date,
            Value::Text(_) => DataType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Encode the value into its column bytes. The byte length is what gets
    /// recorded as the column size, so NULL encodes to nothing.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Value::Null => Vec::new(),
            Value::TinyInt(v) => v.to_be_bytes().to_vec(),
            Value::SmallInt(v) => v.to_be_bytes().to_vec(),
            Value::Int(v) => v.to_be_bytes().to_vec(),
            Value::BigInt(v) => v.to_be_bytes().to_vec(),
            Value::Float(v) => v.to_bits().to_be_bytes().to_vec(),
            Value::Double(v) => v.to_bits().to_be_bytes().to_vec(),
            Value::Year(year) => {
                if !(MIN_YEAR..=MAX_YEAR).contains(year) {
                    return Err(StorageError::ValueOutOfRange {
                        value: year.to_string(),
                        data_type: DataType::Year.to_string(),
                    });
                }
                vec![((year - YEAR_BASE) as i8) as u8]
            }
            Value::Time(time) => (time.num_seconds_from_midnight() as i32)
                .to_be_bytes()
                .to_vec(),
            Value::DateTime(datetime) => datetime.timestamp().to_be_bytes().to_vec(),
            Value::Date(date) => {
                let days = date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE;
                days.to_be_bytes().to_vec()
            }
            Value::Text(text) => {
                if text.is_empty() {
                    return Err(StorageError::InvalidValue {
                        reason: "empty TEXT is reserved for NULL".to_string(),
                    });
                }
                if !text.is_ascii() {
                    return Err(StorageError::InvalidValue {
                        reason: format!("TEXT must be ASCII: {:?}", text),
                    });
                }
                if text.len() > MAX_TEXT_LENGTH {
                    return Err(StorageError::ValueTooLarge {
                        size: text.len(),
                        max: MAX_TEXT_LENGTH,
                    });
                }
                text.as_bytes().to_vec()
            }
        };
        Ok(bytes)
    }

    /// Decode column bytes of the given type. A zero-length column is NULL
    /// whatever its declared type.
    pub fn decode(data_type: DataType, bytes: &[u8]) -> Result<Value> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        let value = match data_type {
            DataType::Null => {
                return Err(mismatch(data_type, bytes.len()));
            }
            DataType::TinyInt => Value::TinyInt(i8::from_be_bytes(fixed(data_type, bytes)?)),
            DataType::SmallInt => Value::SmallInt(i16::from_be_bytes(fixed(data_type, bytes)?)),
            DataType::Int => Value::Int(i32::from_be_bytes(fixed(data_type, bytes)?)),
            DataType::BigInt => Value::BigInt(i64::from_be_bytes(fixed(data_type, bytes)?)),
            DataType::Float => {
                Value::Float(f32::from_bits(u32::from_be_bytes(fixed(data_type, bytes)?)))
            }
            DataType::Double => {
                Value::Double(f64::from_bits(u64::from_be_bytes(fixed(data_type, bytes)?)))
            }
            DataType::Year => {
                let offset = i8::from_be_bytes(fixed(data_type, bytes)?);
                Value::Year(YEAR_BASE + offset as i32)
            }
            DataType::Time => {
                let seconds = i32::from_be_bytes(fixed(data_type, bytes)?);
                let time = u32::try_from(seconds)
                    .ok()
                    .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
                    .ok_or_else(|| StorageError::InvalidValue {
                        reason: format!("{} is not a valid second of the day", seconds),
                    })?;
                Value::Time(time)
            }
            DataType::DateTime => {
                let seconds = i64::from_be_bytes(fixed(data_type, bytes)?);
                let datetime = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
                    StorageError::InvalidValue {
                        reason: format!("{} is not a valid epoch timestamp", seconds),
                    }
                })?;
                Value::DateTime(datetime)
            }
            DataType::Date => {
                let days = i64::from_be_bytes(fixed(data_type, bytes)?);
                let date = days
                    .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                    .and_then(|ce| i32::try_from(ce).ok())
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(|| StorageError::InvalidValue {
                        reason: format!("{} is not a valid epoch day", days),
                    })?;
                Value::Date(date)
            }
            DataType::Text => {
                if bytes.len() > MAX_TEXT_LENGTH || !bytes.is_ascii() {
                    return Err(StorageError::InvalidValue {
                        reason: "stored TEXT is not 1-127 ASCII bytes".to_string(),
                    });
                }
                let text =
                    String::from_utf8(bytes.to_vec()).map_err(|e| StorageError::InvalidValue {
                        reason: e.to_string(),
                    })?;
                Value::Text(text)
            }
        };
        Ok(value)
    }

    /// Total order used for index keys: NULL sorts first, TEXT compares
    /// ASCII case-insensitively, integers compare numerically across widths.
    pub fn index_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a
                .bytes()
                .map(|c| c.to_ascii_lowercase())
                .cmp(b.bytes().map(|c| c.to_ascii_lowercase())),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => self.data_type().as_u8().cmp(&other.data_type().as_u8()),
            },
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(*v as i64),
            Value::SmallInt(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            Value::Year(v) => Some(*v as i64),
            _ => None,
        }
    }
}

fn fixed<const N: usize>(data_type: DataType, bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| mismatch(data_type, bytes.len()))
}

fn mismatch(data_type: DataType, actual: usize) -> StorageError {
    StorageError::TypeMismatch {
        expected: match data_type.fixed_width() {
            Some(width) => format!("{} ({} bytes)", data_type, width),
            None => data_type.to_string(),
        },
        actual: format!("{} bytes", actual),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Year(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v.format("%H:%M:%S")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
