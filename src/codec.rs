//! Binary record streams for members, books and open loans.
//!
//! A stream is a bare concatenation of records: no header, no count, no
//! checksum. Integers are big-endian; strings carry a 2-byte big-endian byte
//! length followed by UTF-8 bytes. The end of the stream ends the sequence.

use std::{
    io::{self, BufRead, ErrorKind, Read, Write},
    string::FromUtf8Error,
};

use chrono::{DateTime, NaiveDate, NaiveTime};
use thiserror::Error;

use crate::member::{Classification, Role};

/// Errors raised while encoding or decoding records
#[derive(Debug, Error)]
pub enum CodecError {
    /// The underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stream ended in the middle of a record
    #[error("stream ends in the middle of a record")]
    Truncated,
    /// A string does not fit the 16-bit length prefix
    #[error("string of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),
    /// A string field holds invalid UTF-8
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    /// A checkout timestamp does not map to a calendar date
    #[error("timestamp {0} ms is out of range")]
    InvalidTimestamp(i64),
}

/// A fixed-shape record of one of the three streams
pub trait Record: Sized {
    /// Append the record to `writer`
    ///
    /// # Errors
    ///
    /// Returns a `CodecError` if a string is too long or the writer fails.
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError>;

    /// Read one record from `reader`
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Truncated` if the stream ends inside the record,
    /// or another `CodecError` if a field cannot be decoded.
    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError>;
}

/// Member record: tag, id, name, major or department
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    /// `Estudiante` or `Docente`
    pub tag: String,
    /// Identity number
    pub id: i32,
    /// Display name
    pub name: String,
    /// Major for students, department for teachers
    pub payload: String,
}

impl MemberRecord {
    /// Build the record for a member
    #[must_use]
    pub fn new(id: i32, name: &str, role: &Role) -> Self {
        Self {
            tag: role.classification().stream_tag().to_string(),
            id,
            name: name.to_string(),
            payload: role.payload().to_string(),
        }
    }

    /// Role described by the record, if the tag is known
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        Classification::from_stream_tag(&self.tag).map(|classification| match classification {
            Classification::Student => Role::Student { major: self.payload.clone() },
            Classification::Teacher => Role::Teacher { department: self.payload.clone() },
        })
    }
}

impl Record for MemberRecord {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_string(writer, &self.tag)?;
        writer.write_all(&self.id.to_be_bytes())?;
        write_string(writer, &self.name)?;
        write_string(writer, &self.payload)
    }

    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let tag = read_string(reader)?;
        let id = i32::from_be_bytes(read_array(reader)?);
        let name = read_string(reader)?;
        let payload = read_string(reader)?;
        Ok(Self { tag, id, name, payload })
    }
}

/// Book record: title, edition, publisher, year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    /// Title
    pub title: String,
    /// Edition number
    pub edition: i32,
    /// Publisher name
    pub publisher: String,
    /// Publication year
    pub year: i32,
}

impl Record for BookRecord {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_string(writer, &self.title)?;
        writer.write_all(&self.edition.to_be_bytes())?;
        write_string(writer, &self.publisher)?;
        writer.write_all(&self.year.to_be_bytes())?;
        Ok(())
    }

    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let title = read_string(reader)?;
        let edition = i32::from_be_bytes(read_array(reader)?);
        let publisher = read_string(reader)?;
        let year = i32::from_be_bytes(read_array(reader)?);
        Ok(Self { title, edition, publisher, year })
    }
}

/// Open loan record: member id, book title, checkout date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    /// Identity number of the borrower
    pub member_id: i32,
    /// Title of the borrowed book
    pub title: String,
    /// Checkout date
    pub checkout_date: NaiveDate,
}

impl Record for LoanRecord {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(&self.member_id.to_be_bytes())?;
        write_string(writer, &self.title)?;
        writer.write_all(&date_to_epoch_millis(self.checkout_date).to_be_bytes())?;
        Ok(())
    }

    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let member_id = i32::from_be_bytes(read_array(reader)?);
        let title = read_string(reader)?;
        let millis = i64::from_be_bytes(read_array(reader)?);
        Ok(Self { member_id, title, checkout_date: date_from_epoch_millis(millis)? })
    }
}

/// Records read from a stream, and what stopped the read early, if anything
#[derive(Debug)]
pub struct Decoded<T> {
    /// Every complete record, in stream order
    pub records: Vec<T>,
    /// The error that ended decoding before the end of the stream
    pub stopped_by: Option<CodecError>,
}

/// Read records until the stream ends. Decoding stops at the first broken
/// record; the records before it are kept.
pub fn decode_stream<T: Record, R: BufRead>(mut reader: R) -> Decoded<T> {
    let mut records = Vec::new();
    loop {
        match reader.fill_buf() {
            Ok([]) => return Decoded { records, stopped_by: None },
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Decoded { records, stopped_by: Some(e.into()) },
        }

        match T::decode(&mut reader) {
            Ok(record) => records.push(record),
            Err(e) => return Decoded { records, stopped_by: Some(e) },
        }
    }
}

/// Write every record to `writer`
///
/// # Errors
///
/// Returns the first `CodecError` hit; earlier records are already written.
pub fn encode_stream<'r, T, W>(
    writer: &mut W,
    records: impl IntoIterator<Item = &'r T>,
) -> Result<(), CodecError>
where
    T: Record + 'r,
    W: Write,
{
    for record in records {
        record.encode(writer)?;
    }
    Ok(())
}

/// Write a length-prefixed UTF-8 string
///
/// # Errors
///
/// Returns `CodecError::StringTooLong` past 65535 bytes, or an I/O error.
pub fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<(), CodecError> {
    let bytes = value.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| CodecError::StringTooLong(bytes.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

/// Read a length-prefixed UTF-8 string
///
/// # Errors
///
/// Returns `CodecError::Truncated` on a short read and
/// `CodecError::InvalidUtf8` on malformed text.
pub fn read_string<R: Read>(reader: &mut R) -> Result<String, CodecError> {
    let len = u16::from_be_bytes(read_array(reader)?);
    let mut bytes = vec![0; usize::from(len)];
    read_exact(reader, &mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

/// Read a fixed number of bytes
fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N], CodecError> {
    let mut buf = [0; N];
    read_exact(reader, &mut buf)?;
    Ok(buf)
}

/// `read_exact` with end-of-stream reported as a truncated record
fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), CodecError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => CodecError::Truncated,
        _ => CodecError::Io(e),
    })
}

/// Milliseconds since the epoch at UTC midnight of `date`
#[must_use]
pub fn date_to_epoch_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// UTC calendar date of an epoch timestamp in milliseconds
///
/// # Errors
///
/// Returns `CodecError::InvalidTimestamp` outside the representable range.
pub fn date_from_epoch_millis(millis: i64) -> Result<NaiveDate, CodecError> {
    DateTime::from_timestamp_millis(millis)
        .map(|moment| moment.date_naive())
        .ok_or(CodecError::InvalidTimestamp(millis))
}
