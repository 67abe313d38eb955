use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use zip::{write::SimpleFileOptions, ZipArchive, ZipWriter};

use crate::error::{EncodeError, Error, Result};

/// Entry name used when wrapping a KML document in a KMZ archive.
pub const KMZ_ENTRY: &str = "doc.kml";

/// How a document is stored on disk: as the file itself, or as the only entry
/// of a zip archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Plain,
    Zip { entry: &'static str },
}

impl Container {
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(OsStr::to_str)
            .map(|x| x.to_lowercase())
            .as_deref()
        {
            Some("kmz") => Container::Zip { entry: KMZ_ENTRY },
            _ => Container::Plain,
        }
    }

    pub fn read_document(&self, path: &Path) -> Result<Vec<u8>> {
        match self {
            Container::Plain => fs::read(path).map_err(|source| Error::Open {
                path: path.to_owned(),
                source,
            }),
            Container::Zip { .. } => read_first_entry(path),
        }
    }

    /// Creates `path` (and its parent directories) and lets `encode` fill it.
    /// Every handle is released before returning, on success or failure.
    pub fn write_document<F>(&self, path: &Path, encode: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> std::result::Result<(), EncodeError>,
    {
        let write_error = |source| Error::Write {
            path: path.to_owned(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_error)?;
        }
        let file = File::create(path).map_err(write_error)?;

        match self {
            Container::Plain => {
                let mut sink = BufWriter::new(file);
                encode(&mut sink).map_err(|source| Error::Encode {
                    path: path.to_owned(),
                    source,
                })?;
                sink.flush().map_err(write_error)
            }
            Container::Zip { entry } => write_single_entry(path, file, entry, encode),
        }
    }
}

/// Reads the first entry of the archive at `path`. Other entries are ignored.
fn read_first_entry(path: &Path) -> Result<Vec<u8>> {
    let unzip_error = |source| Error::Unzip {
        path: path.to_owned(),
        source,
    };
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_owned(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(unzip_error)?;
    if archive.len() > 1 {
        warn!(
            "{:?} holds {} entries, only the first is read",
            path,
            archive.len()
        );
    }
    let mut entry = archive.by_index(0).map_err(unzip_error)?;
    debug!("reading entry {:?} of {:?}", entry.name(), path);
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| unzip_error(e.into()))?;
    Ok(bytes)
}

/// Writes an archive holding exactly one entry named `entry`. If `encode`
/// fails the entry is dropped and the archive is closed empty.
fn write_single_entry<F>(path: &Path, file: File, entry: &str, encode: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::result::Result<(), EncodeError>,
{
    let archive_error = |source| Error::Archive {
        path: path.to_owned(),
        source,
    };
    let mut zip = ZipWriter::new(BufWriter::new(file));
    zip.start_file(entry, SimpleFileOptions::default())
        .map_err(archive_error)?;
    if let Err(source) = encode(&mut zip) {
        if let Err(e) = zip.abort_file() {
            warn!("discarding partial entry of {:?}: {}", path, e);
        }
        if let Err(e) = zip.finish().and_then(|mut sink| Ok(sink.flush()?)) {
            warn!("closing {:?}: {}", path, e);
        }
        return Err(Error::Encode {
            path: path.to_owned(),
            source,
        });
    }
    let mut sink = zip.finish().map_err(archive_error)?;
    sink.flush().map_err(|source| Error::Write {
        path: path.to_owned(),
        source,
    })
}
