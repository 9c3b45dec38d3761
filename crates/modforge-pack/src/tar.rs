use std::io;

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};
use tempfile::NamedTempFile;

use crate::entry::{ArchiveEntry, EntryKind};
use crate::writer::WriterSettings;
use crate::PackError;

/// GNU tar inside gzip framing.
///
/// The gzip header records no file name and a zero mtime; without that the
/// header would carry the time of the run and two identical builds would
/// differ. Every member has uid/gid 0 and empty owner names.
pub struct TarGzWriter {
    builder: Builder<GzEncoder<NamedTempFile>>,
}

impl TarGzWriter {
    pub(crate) fn new(file: NamedTempFile, settings: &WriterSettings) -> Self {
        let encoder = GzBuilder::new()
            .mtime(0)
            .write(file, Compression::new(settings.compression_level));
        Self {
            builder: Builder::new(encoder),
        }
    }

    pub(crate) fn append(&mut self, entry: &ArchiveEntry) -> Result<(), PackError> {
        let context = format!("failed to append '{}' to tar archive", entry.path);
        let mut header = Header::new_gnu();
        header.set_mode(entry.mode);
        header.set_uid(0);
        header.set_gid(0);
        header
            .set_username("")
            .map_err(PackError::io(context.clone()))?;
        header
            .set_groupname("")
            .map_err(PackError::io(context.clone()))?;
        header.set_mtime(entry.mtime);
        match &entry.kind {
            EntryKind::File(data) => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(data.len() as u64);
                self.builder
                    .append_data(&mut header, &entry.path, data.as_slice())
                    .map_err(PackError::io(context))?;
            }
            EntryKind::Symlink(target) => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                self.builder
                    .append_link(&mut header, &entry.path, target)
                    .map_err(PackError::io(context))?;
            }
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                self.builder
                    .append_data(&mut header, &entry.path, io::empty())
                    .map_err(PackError::io(context))?;
            }
        }
        Ok(())
    }

    /// Writes the end-of-archive blocks and the gzip trailer.
    pub(crate) fn finish(self) -> Result<NamedTempFile, PackError> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(PackError::io("failed to finish tar archive"))?;
        encoder
            .finish()
            .map_err(PackError::io("failed to finish gzip stream"))
    }
}
