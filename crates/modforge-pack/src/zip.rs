use std::io::{self, Read, Seek, SeekFrom, Write};

use tempfile::NamedTempFile;
use time::OffsetDateTime;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::entry::{ArchiveEntry, EntryKind};
use crate::writer::WriterSettings;
use crate::PackError;

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const EOCD_LEN: usize = 22;
const MAX_COMMENT_LEN: u64 = u16::MAX as u64;
const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const CENTRAL_HEADER_LEN: usize = 46;
const ZIP64_MARKER: u32 = u32::MAX;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const MSDOS_DIRECTORY_FLAG: u32 = 0x10;

/// A date/time as stored in a zip header, in UTC with whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZipTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ZipTimestamp {
    pub const MIN: ZipTimestamp = ZipTimestamp {
        year: 1980,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub const MAX: ZipTimestamp = ZipTimestamp {
        year: 2107,
        month: 12,
        day: 31,
        hour: 23,
        minute: 59,
        second: 59,
    };

    fn to_zip(self) -> Option<DateTime> {
        DateTime::from_date_and_time(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
        .ok()
    }
}

/// Converts Unix seconds to the zip date tuple using the UTC calendar.
///
/// Zip dates cover 1980-01-01 to 2107-12-31. Outside that range a strict
/// conversion fails and a lenient one clamps to the nearest bound.
pub fn zip_timestamp(mtime: u64, strict: bool) -> Result<ZipTimestamp, PackError> {
    let utc = i64::try_from(mtime)
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok());
    let clamped = match utc {
        Some(utc) if utc.year() < i32::from(ZipTimestamp::MIN.year) => ZipTimestamp::MIN,
        Some(utc) if utc.year() > i32::from(ZipTimestamp::MAX.year) => ZipTimestamp::MAX,
        Some(utc) => {
            return Ok(ZipTimestamp {
                year: utc.year() as u16,
                month: u8::from(utc.month()),
                day: utc.day(),
                hour: utc.hour(),
                minute: utc.minute(),
                second: utc.second(),
            })
        }
        // Beyond what `time` can represent, far past 2107.
        None => ZipTimestamp::MAX,
    };
    if strict {
        return Err(PackError::TimestampOutOfRange { mtime });
    }
    Ok(clamped)
}

/// Zip backend.
///
/// External attributes carry `(type | mode) << 16` for every entry. The zip
/// crate leaves the low MS-DOS attribute byte empty, so directory entries get
/// their 0x10 flag patched into the central directory once it is written.
pub struct ZipArchiveWriter {
    inner: ZipWriter<NamedTempFile>,
    settings: WriterSettings,
    has_directories: bool,
}

impl ZipArchiveWriter {
    pub(crate) fn new(file: NamedTempFile, settings: &WriterSettings) -> Self {
        Self {
            inner: ZipWriter::new(file),
            settings: *settings,
            has_directories: false,
        }
    }

    fn options(&self, entry: &ArchiveEntry) -> Result<SimpleFileOptions, PackError> {
        let stamp = zip_timestamp(entry.mtime, self.settings.strict_timestamps)?;
        let modified = stamp
            .to_zip()
            .ok_or(PackError::TimestampOutOfRange { mtime: entry.mtime })?;
        Ok(SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(self.settings.compression_level)))
            .last_modified_time(modified)
            .unix_permissions(entry.mode))
    }

    pub(crate) fn append(&mut self, entry: &ArchiveEntry) -> Result<(), PackError> {
        let options = self.options(entry)?;
        match &entry.kind {
            EntryKind::File(data) => {
                self.inner.start_file(entry.path.as_str(), options)?;
                self.inner.write_all(data).map_err(PackError::io(format!(
                    "failed to write '{}' to zip archive",
                    entry.path
                )))?;
            }
            EntryKind::Symlink(target) => {
                self.inner
                    .add_symlink(entry.path.as_str(), target.as_str(), options)?;
            }
            EntryKind::Directory => {
                self.inner.add_directory(entry.path.as_str(), options)?;
                self.has_directories = true;
            }
        }
        Ok(())
    }

    /// Writes the central directory.
    pub(crate) fn finish(self) -> Result<NamedTempFile, PackError> {
        let mut file = self.inner.finish()?;
        if self.has_directories {
            flag_directory_entries(file.as_file_mut())
                .map_err(PackError::io("failed to flag zip directory entries"))?;
        }
        Ok(file)
    }
}

/// Sets the MS-DOS directory bit on every central directory record whose
/// Unix mode marks a directory.
fn flag_directory_entries<F: Read + Write + Seek>(file: &mut F) -> io::Result<()> {
    let len = file.seek(SeekFrom::End(0))?;
    let tail_len = len.min(EOCD_LEN as u64 + MAX_COMMENT_LEN);
    file.seek(SeekFrom::Start(len - tail_len))?;
    let mut tail = vec![0u8; tail_len as usize];
    file.read_exact(&mut tail)?;

    let eocd = tail
        .windows(EOCD_SIGNATURE.len())
        .rposition(|window| window == EOCD_SIGNATURE)
        .filter(|pos| pos + EOCD_LEN <= tail.len())
        .ok_or_else(|| invalid_data("end of central directory not found"))?;
    let directory_size = read_u32(&tail, eocd + 12);
    let directory_offset = read_u32(&tail, eocd + 16);
    if directory_size == ZIP64_MARKER || directory_offset == ZIP64_MARKER {
        tracing::warn!("zip64 archive, leaving directory attributes unchanged");
        return Ok(());
    }

    let mut directory = vec![0u8; directory_size as usize];
    file.seek(SeekFrom::Start(u64::from(directory_offset)))?;
    file.read_exact(&mut directory)?;

    let mut pos = 0;
    while pos + CENTRAL_HEADER_LEN <= directory.len() {
        if directory[pos..pos + 4] != CENTRAL_HEADER_SIGNATURE {
            return Err(invalid_data("corrupt central directory record"));
        }
        let name_len = usize::from(read_u16(&directory, pos + 28));
        let extra_len = usize::from(read_u16(&directory, pos + 30));
        let comment_len = usize::from(read_u16(&directory, pos + 32));
        let attributes = read_u32(&directory, pos + 38);
        if (attributes >> 16) & S_IFMT == S_IFDIR {
            let flagged = attributes | MSDOS_DIRECTORY_FLAG;
            directory[pos + 38..pos + 42].copy_from_slice(&flagged.to_le_bytes());
        }
        pos += CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
    }

    file.seek(SeekFrom::Start(u64::from(directory_offset)))?;
    file.write_all(&directory)?;
    file.flush()
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn invalid_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}
