// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{
    fs::{self, File},
    io::Write,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::trace;

use crate::{
    stream::{SharedStream, Stream},
    Error,
    ResourceError,
    Result,
    ValidationError,
};

const MOVE_CHUNK_SIZE: usize = 4096;

/// The status codes an upload can report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UploadErrorCode {
    Ok = 0,
    IniSize = 1,
    FormSize = 2,
    Partial = 3,
    NoFile = 4,
    NoTmpDir = 6,
    CantWrite = 7,
    Extension = 8,
}

impl UploadErrorCode {
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        *self as i64
    }

    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Ok => "There is no error, the file uploaded with success.",
            Self::IniSize => "The uploaded file exceeds the upload_max_filesize directive in php.ini.",
            Self::FormSize => "The uploaded file exceeds the MAX_FILE_SIZE directive that was specified in the HTML form.",
            Self::Partial => "The uploaded file was only partially uploaded.",
            Self::NoFile => "No file was uploaded.",
            Self::NoTmpDir => "Missing a temporary folder.",
            Self::CantWrite => "Failed to write file to disk.",
            Self::Extension => "A PHP extension stopped the file upload.",
        }
    }
}

impl TryFrom<i64> for UploadErrorCode {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            _ => return Err(ValidationError::InvalidUploadErrorCode(code).into()),
        })
    }
}

/// A file received through a form upload.
///
/// Clones share the stream and the moved state, so moving one clone makes
/// the file unavailable through all of them.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    stream: SharedStream,
    size: u64,
    error: UploadErrorCode,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: Arc<AtomicBool>,
}

impl UploadedFile {
    /// Fails with a validation error when `error` is not a known upload
    /// error code.
    pub fn new(
        stream: SharedStream,
        size: u64,
        error: i64,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            stream,
            size,
            error: UploadErrorCode::try_from(error)?,
            client_filename,
            client_media_type,
            moved: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    #[must_use]
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> UploadErrorCode {
        self.error
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn is_moved(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }

    /// The contents of the upload. Not available when the upload failed or
    /// after the file was moved.
    pub fn stream(&self) -> Result<&SharedStream> {
        if self.error != UploadErrorCode::Ok {
            return Err(ResourceError::UploadFailed(self.error.message()).into());
        }

        if self.is_moved() {
            return Err(ResourceError::AlreadyMoved.into());
        }

        Ok(&self.stream)
    }

    /// Moves the upload to `target`. This can happen only once.
    ///
    /// A file-backed upload is renamed (or copied and removed when a rename
    /// is not possible), any other stream is copied into a new file and
    /// closed.
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();
        validate_target_directory(target)?;

        let mut stream = self.stream()?.lock();
        if self.is_moved() {
            return Err(ResourceError::AlreadyMoved.into());
        }

        match stream.metadata().and_then(|metadata| metadata.uri) {
            Some(source) => {
                move_file(&source, target)?;
                stream.close();
            }
            None => copy_stream(&mut stream, target)?,
        }

        self.moved.store(true, Ordering::Release);
        trace!("uploaded file moved to {}", target.display());
        Ok(())
    }
}

fn validate_target_directory(target: &Path) -> Result<()> {
    let directory = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let writable = fs::metadata(directory)
        .map(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
        .unwrap_or(false);

    if !writable {
        return Err(ResourceError::TargetNotWritable(directory.display().to_string()).into());
    }

    Ok(())
}

fn move_file(source: &Path, target: &Path) -> Result<()> {
    if fs::rename(source, target).is_ok() {
        return Ok(());
    }

    // Renaming fails across file systems.
    fs::copy(source, target).map_err(ResourceError::io("copy uploaded file"))?;
    fs::remove_file(source).map_err(ResourceError::io("remove uploaded file"))?;
    Ok(())
}

fn copy_stream(stream: &mut Stream, target: &Path) -> Result<()> {
    let mut file = File::create(target).map_err(ResourceError::io("create target file"))?;

    if stream.is_seekable() {
        stream.rewind()?;
    }

    while !stream.eof() {
        let chunk = stream.read(MOVE_CHUNK_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        file.write_all(&chunk).map_err(ResourceError::io("write target file"))?;
    }

    stream.close();
    Ok(())
}

/// Creates an uploaded file, taking the size from the stream when none is
/// given.
pub fn create_uploaded_file(
    stream: SharedStream,
    size: Option<u64>,
    error: i64,
    client_filename: Option<String>,
    client_media_type: Option<String>,
) -> Result<UploadedFile> {
    let size = match size {
        Some(size) => size,
        None => stream.lock().size().ok_or(ResourceError::UnknownSize)?,
    };

    UploadedFile::new(stream, size, error, client_filename, client_media_type)
}
