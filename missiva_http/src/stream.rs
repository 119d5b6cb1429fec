// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Byte streams used as message bodies and uploaded-file contents.
//!
//! A [`Stream`] owns at most one [`Resource`]. [`Stream::detach`] hands the
//! resource to the caller and leaves the stream inert; every later operation
//! fails with [`ResourceError::Detached`], except the inspection methods which
//! report an empty/closed state.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{Cursor, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{Error, ResourceError, Result};

/// The handle a [`Stream`] wraps.
pub enum Resource {
    /// A file on disk, remembering the path it was opened from.
    File {
        file: File,
        path: PathBuf,
    },

    /// An in-memory buffer.
    Memory(Cursor<Vec<u8>>),

    /// A forward-only source, e.g. the raw request input.
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
            Self::Memory(cursor) => f.debug_tuple("Memory").field(&cursor.get_ref().len()).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// Access mode of a stream, parsed from an `fopen`-style mode string.
///
/// | mode | read | write | create | truncate | append | must not exist |
/// |------|------|-------|--------|----------|--------|----------------|
/// | `r`  | ✓    |       |        |          |        |                |
/// | `w`  |      | ✓     | ✓      | ✓        |        |                |
/// | `a`  |      | ✓     | ✓      |          | ✓      |                |
/// | `x`  |      | ✓     | ✓      |          |        | ✓              |
/// | `c`  |      | ✓     | ✓      |          |        |                |
///
/// A `+` adds the missing read or write access. `b` and `t` are accepted
/// and ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamMode {
    mode: String,
}

impl StreamMode {
    pub fn parse(mode: &str) -> Result<Self> {
        let mut chars = mode.chars();
        if !matches!(chars.next(), Some('r' | 'w' | 'a' | 'x' | 'c')) {
            return Err(Error::type_mismatch(format!("invalid stream mode `{mode}`")));
        }

        if !chars.all(|c| matches!(c, '+' | 'b' | 't')) {
            return Err(Error::type_mismatch(format!("invalid stream mode `{mode}`")));
        }

        Ok(Self { mode: mode.to_string() })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.mode
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.mode.contains('r') || self.mode.contains('+')
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.mode.contains(['x', 'w', 'c', 'a', '+'])
    }

    fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.is_readable());
        match self.mode.chars().next() {
            Some('w') => { options.write(true).create(true).truncate(true); }
            Some('a') => { options.append(true).create(true); }
            Some('x') => { options.write(true).create_new(true); }
            Some('c') => { options.write(true).create(true); }
            _ => { options.write(self.is_writable()); }
        }
        options
    }
}

/// What [`Stream::metadata`] reports about the underlying resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamMetadata {
    /// The path of a file-backed stream.
    pub uri: Option<PathBuf>,
    pub mode: String,
    pub seekable: bool,
}

#[derive(Debug)]
pub struct Stream {
    resource: Option<Resource>,
    mode: StreamMode,

    /// Set once a read on a forward-only resource came up short.
    reached_end: bool,
}

impl Stream {
    /// Creates a readable, writable and seekable in-memory stream. The
    /// position starts at the beginning of `content`.
    pub fn from_string(content: impl Into<Vec<u8>>) -> Self {
        Self {
            resource: Some(Resource::Memory(Cursor::new(content.into()))),
            mode: StreamMode { mode: String::from("w+b") },
            reached_end: false,
        }
    }

    /// Creates an empty in-memory stream.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_string(Vec::new())
    }

    /// Opens the file at `path` with an `fopen`-style `mode`.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let path = path.as_ref();
        let mode = StreamMode::parse(mode)?;
        let file = mode.open_options()
            .open(path)
            .map_err(ResourceError::io("open file"))?;

        Ok(Self {
            resource: Some(Resource::File { file, path: path.to_path_buf() }),
            mode,
            reached_end: false,
        })
    }

    /// Wraps a forward-only reader. The stream is read-only and not
    /// seekable.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::from_resource(Resource::Reader(Box::new(reader)), StreamMode { mode: String::from("r") })
    }

    #[must_use]
    pub fn from_resource(resource: Resource, mode: StreamMode) -> Self {
        Self {
            resource: Some(resource),
            mode,
            reached_end: false,
        }
    }

    fn resource_mut(&mut self) -> Result<&mut Resource> {
        self.resource.as_mut().ok_or(Error::Resource(ResourceError::Detached))
    }

    /// Separates the underlying resource from the stream. The stream is
    /// unusable afterwards.
    pub fn detach(&mut self) -> Option<Resource> {
        self.reached_end = false;
        self.resource.take()
    }

    /// Detaches and releases the underlying resource. Closing an already
    /// closed or detached stream does nothing.
    pub fn close(&mut self) {
        drop(self.detach());
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.resource.is_none()
    }

    #[must_use]
    pub fn eof(&self) -> bool {
        match &self.resource {
            None => true,
            Some(Resource::File { file, .. }) => {
                let position = (&*file).stream_position();
                let length = file.metadata().map(|metadata| metadata.len());
                match (position, length) {
                    (Ok(position), Ok(length)) => position >= length,
                    _ => true,
                }
            }
            Some(Resource::Memory(cursor)) => cursor.position() >= cursor.get_ref().len() as u64,
            Some(Resource::Reader(_)) => self.reached_end,
        }
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        match self.resource.as_ref()? {
            Resource::File { file, .. } => file.metadata().ok().map(|metadata| metadata.len()),
            Resource::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            Resource::Reader(_) => None,
        }
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.resource.is_some() && self.mode.is_readable()
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.resource.is_some() && self.mode.is_writable()
    }

    #[must_use]
    pub fn is_seekable(&self) -> bool {
        matches!(self.resource, Some(Resource::File { .. } | Resource::Memory(_)))
    }

    /// Returns `None` once the stream is detached.
    #[must_use]
    pub fn metadata(&self) -> Option<StreamMetadata> {
        let resource = self.resource.as_ref()?;
        Some(StreamMetadata {
            uri: match resource {
                Resource::File { path, .. } => Some(path.clone()),
                _ => None,
            },
            mode: self.mode.as_str().to_string(),
            seekable: self.is_seekable(),
        })
    }

    /// Reads at most `length` bytes. Fewer bytes are returned at the end of
    /// the stream.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        if self.resource.is_none() {
            return Err(ResourceError::Detached.into());
        }
        if !self.mode.is_readable() {
            return Err(ResourceError::NotReadable.into());
        }

        let mut buffer = Vec::with_capacity(length.min(64 * 1024));
        let read = match self.resource_mut()? {
            Resource::File { file, .. } => file.take(length as u64).read_to_end(&mut buffer),
            Resource::Memory(cursor) => cursor.take(length as u64).read_to_end(&mut buffer),
            Resource::Reader(reader) => reader.take(length as u64).read_to_end(&mut buffer),
        }.map_err(ResourceError::io("read from stream"))?;

        if read < length {
            self.reached_end = true;
        }

        Ok(buffer)
    }

    /// Reads everything from the current position to the end.
    pub fn contents(&mut self) -> Result<Vec<u8>> {
        if self.resource.is_none() {
            return Err(ResourceError::Detached.into());
        }
        if !self.mode.is_readable() {
            return Err(ResourceError::NotReadable.into());
        }

        let mut buffer = Vec::new();
        match self.resource_mut()? {
            Resource::File { file, .. } => file.read_to_end(&mut buffer),
            Resource::Memory(cursor) => cursor.read_to_end(&mut buffer),
            Resource::Reader(reader) => reader.read_to_end(&mut buffer),
        }.map_err(ResourceError::io("read stream contents"))?;

        self.reached_end = true;
        Ok(buffer)
    }

    /// Returns the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.resource.is_none() {
            return Err(ResourceError::Detached.into());
        }
        if !self.mode.is_writable() {
            return Err(ResourceError::NotWritable.into());
        }

        match self.resource_mut()? {
            Resource::File { file, .. } => file.write_all(data),
            Resource::Memory(cursor) => cursor.write_all(data),
            Resource::Reader(_) => return Err(ResourceError::NotWritable.into()),
        }.map_err(ResourceError::io("write to stream"))?;

        Ok(data.len())
    }

    pub fn seek(&mut self, position: SeekFrom) -> Result<u64> {
        let new_position = match self.resource_mut()? {
            Resource::File { file, .. } => file.seek(position),
            Resource::Memory(cursor) => cursor.seek(position),
            Resource::Reader(_) => return Err(ResourceError::NotSeekable.into()),
        }.map_err(ResourceError::io("seek in stream"))?;

        self.reached_end = false;
        Ok(new_position)
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Returns the current position of the read/write pointer.
    pub fn tell(&mut self) -> Result<u64> {
        match self.resource_mut()? {
            Resource::File { file, .. } => file.stream_position(),
            Resource::Memory(cursor) => Ok(cursor.position()),
            Resource::Reader(_) => return Err(ResourceError::NotSeekable.into()),
        }.map_err(ResourceError::io("determine stream position"))
    }

    /// Reads the whole stream from the beginning (when seekable) as text.
    /// Any failure, or an unreadable stream, yields an empty string.
    pub fn to_string_lossy(&mut self) -> String {
        if !self.is_readable() {
            return String::new();
        }

        if self.is_seekable() && self.rewind().is_err() {
            return String::new();
        }

        match self.contents() {
            Ok(contents) => String::from_utf8_lossy(&contents).into_owned(),
            Err(_) => String::new(),
        }
    }
}

/// A stream shared between message values. Clones refer to the same stream,
/// which is how a derived message keeps the body of the message it was
/// derived from.
#[derive(Clone, Debug)]
pub struct SharedStream(Arc<Mutex<Stream>>);

impl SharedStream {
    #[must_use]
    pub fn new(stream: Stream) -> Self {
        Self(Arc::new(Mutex::new(stream)))
    }

    /// Locks the stream for exclusive use. A panic in another holder of the
    /// lock does not make the stream unusable.
    pub fn lock(&self) -> MutexGuard<'_, Stream> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles refer to the same stream.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Stream> for SharedStream {
    fn from(stream: Stream) -> Self {
        Self::new(stream)
    }
}

impl Default for SharedStream {
    fn default() -> Self {
        Self::new(Stream::empty())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use rstest::rstest;

    use super::*;

    #[test]
    fn test_memory_stream_read_write_seek() {
        let mut stream = Stream::from_string("hello");
        assert!(stream.is_readable());
        assert!(stream.is_writable());
        assert!(stream.is_seekable());
        assert_eq!(stream.size(), Some(5));

        assert_eq!(stream.read(2).unwrap(), b"he");
        assert_eq!(stream.tell().unwrap(), 2);
        assert!(!stream.eof());

        assert_eq!(stream.contents().unwrap(), b"llo");
        assert!(stream.eof());

        assert_eq!(stream.write(b", world").unwrap(), 7);
        assert_eq!(stream.to_string_lossy(), "hello, world");

        stream.seek(SeekFrom::Start(7)).unwrap();
        assert_eq!(stream.read(100).unwrap(), b"world");
    }

    #[test]
    fn test_detach_makes_stream_inert() {
        let mut stream = Stream::from_string("data");
        let resource = stream.detach();
        assert!(matches!(resource, Some(Resource::Memory(_))));

        assert!(stream.is_detached());
        assert!(stream.eof());
        assert_eq!(stream.size(), None);
        assert_eq!(stream.metadata(), None);
        assert!(!stream.is_readable());
        assert!(!stream.is_writable());
        assert!(!stream.is_seekable());
        assert!(matches!(stream.read(1), Err(Error::Resource(ResourceError::Detached))));
        assert!(matches!(stream.write(b"x"), Err(Error::Resource(ResourceError::Detached))));
        assert!(matches!(stream.tell(), Err(Error::Resource(ResourceError::Detached))));
        assert_eq!(stream.to_string_lossy(), "");

        assert!(stream.detach().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut stream = Stream::from_string("data");
        stream.close();
        stream.close();
        assert!(stream.is_detached());
    }

    #[test]
    fn test_file_stream() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"file contents").unwrap();

        let mut stream = Stream::open(temp.path(), "r").unwrap();
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert_eq!(stream.size(), Some(13));

        let metadata = stream.metadata().unwrap();
        assert_eq!(metadata.uri.as_deref(), Some(temp.path()));
        assert_eq!(metadata.mode, "r");
        assert!(metadata.seekable);

        assert!(matches!(stream.write(b"nope"), Err(Error::Resource(ResourceError::NotWritable))));
        assert_eq!(stream.to_string_lossy(), "file contents");
        assert!(stream.eof());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Stream::open(dir.path().join("missing"), "r");
        assert!(matches!(result, Err(Error::Resource(ResourceError::Io { .. }))));
    }

    #[test]
    fn test_reader_stream() {
        let mut stream = Stream::from_reader(std::io::Cursor::new(b"raw input".to_vec()));
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert!(!stream.is_seekable());
        assert_eq!(stream.size(), None);
        assert!(!stream.eof());

        assert_eq!(stream.read(3).unwrap(), b"raw");
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(Error::Resource(ResourceError::NotSeekable))));
        assert_eq!(stream.read(100).unwrap(), b" input");
        assert!(stream.eof());
    }

    #[rstest]
    #[case("r", true, false)]
    #[case("rb", true, false)]
    #[case("r+", true, true)]
    #[case("w", false, true)]
    #[case("w+", true, true)]
    #[case("a", false, true)]
    #[case("x", false, true)]
    #[case("c+", true, true)]
    #[case("r+b", true, true)]
    fn test_stream_mode(#[case] mode: &str, #[case] readable: bool, #[case] writable: bool) {
        let mode = StreamMode::parse(mode).unwrap();
        assert_eq!(mode.is_readable(), readable);
        assert_eq!(mode.is_writable(), writable);
    }

    #[rstest]
    #[case("")]
    #[case("q")]
    #[case("r?")]
    #[case("rr")]
    #[case("ww")]
    #[case("rw+")]
    fn test_invalid_stream_mode(#[case] mode: &str) {
        assert!(StreamMode::parse(mode).is_err());
    }

    #[test]
    fn test_shared_stream_identity() {
        let stream = SharedStream::new(Stream::from_string("body"));
        let clone = stream.clone();
        assert!(stream.ptr_eq(&clone));
        assert!(!stream.ptr_eq(&SharedStream::new(Stream::from_string("body"))));

        clone.lock().rewind().unwrap();
        assert_eq!(stream.lock().to_string_lossy(), "body");
    }
}
