use crate::error::ReportSheetError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// A source reader over either a local workbook file or bytes handed over by a storage collaborator
pub(crate) enum SourceReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer (e.g. an object fetched from remote storage)
    Memory(Cursor<Vec<u8>>),
}

impl SourceReader {
    /// Opens a local workbook file
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    /// # Returns
    /// * `Result<SourceReader, ReportSheetError>` - Reader for the file content
    pub(crate) fn open(path: &Path) -> Result<SourceReader, ReportSheetError> {
        let file = File::open(path)?;
        Ok(SourceReader::Local(BufReader::new(file)))
    }

    /// Wraps bytes that were already fetched by the caller
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> SourceReader {
        SourceReader::Memory(Cursor::new(bytes))
    }

    /// Reads the first `N` bytes and rewinds, used to sniff container signatures.
    pub(crate) fn peek<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut magic = [0u8; N];
        let result = self.read_exact(&mut magic);
        self.rewind().ok()?;
        result.ok().map(|_| magic)
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::Local(reader) => reader.read(buf),
            SourceReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            SourceReader::Local(reader) => reader.seek(pos),
            SourceReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_local_file() {
        // Cargo.toml should exist at the crate root while testing
        let result = SourceReader::open(Path::new("Cargo.toml"));
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = SourceReader::open(Path::new("non_existent_file.xlsx"));
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_peek_rewinds() {
        let mut reader = SourceReader::from_bytes(b"PK\x03\x04rest".to_vec());
        assert_eq!(reader.peek::<4>(), Some(*b"PK\x03\x04"));
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"PK\x03\x04rest");
    }

    #[test]
    fn test_peek_short_input() {
        let mut reader = SourceReader::from_bytes(b"PK".to_vec());
        assert_eq!(reader.peek::<4>(), None);
    }
}
