use crate::error::RustySubtableError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;
use url::Url;

/// Signature of an OLE compound file. Encrypted OOXML workbooks are wrapped in one.
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Error, Debug)]
pub(crate) enum UnifiedReaderError {
    #[error("No data from remote file: '{0}'")]
    RemoteFileNoDataError(String),
}

/// A unified reader that can handle both local files and remote URLs
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Remote URL reader (in-memory buffer)
    Remote(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a file from either a local path or remote URL
    /// For remote URLs, uses DuckDB's read_blob with proper credential handling
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, RustySubtableError> {
        if Self::is_remote_url(file_name) {
            Self::read_blob_with_duckdb(file_name)
        } else {
            let file = File::open(file_name)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Checks if a file name represents a remote URL
    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        if let Ok(url) = Url::parse(file_name) {
            // Single letters are Windows drive prefixes, not schemes
            url.scheme() != "file" && url.scheme().len() > 1
        } else {
            false
        }
    }

    /// Returns true if the content starts with the compound file signature.
    /// The read position is restored afterwards.
    pub(crate) fn is_compound_file(&mut self) -> Result<bool, RustySubtableError> {
        let mut signature = [0u8; 8];
        let matched = match self.read_exact(&mut signature) {
            Ok(()) => signature == COMPOUND_FILE_SIGNATURE,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(error) => Err(error)?,
        };
        self.seek(SeekFrom::Start(0))?;
        Ok(matched)
    }

    /// Reads a remote file using DuckDB's read_blob functionality
    fn read_blob_with_duckdb(file_name: &str) -> Result<UnifiedReader, RustySubtableError> {
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [file_name], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(file_name.to_owned()))?;
        }
        Ok(UnifiedReader::Remote(Cursor::new(bytes)))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Remote(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Remote(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote_url() {
        assert!(!UnifiedReader::is_remote_url("data/report.xlsx"));
        assert!(!UnifiedReader::is_remote_url("/srv/data/report.xlsx"));
        assert!(!UnifiedReader::is_remote_url("C:\\data\\report.xlsx"));
        assert!(!UnifiedReader::is_remote_url("file:///srv/data/report.xlsx"));

        assert!(UnifiedReader::is_remote_url("https://example.com/report.xlsx"));
        assert!(UnifiedReader::is_remote_url("s3://bucket/report.xlsx"));
    }

    #[test]
    fn test_is_compound_file() {
        let mut bytes = COMPOUND_FILE_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"payload");
        let mut reader = UnifiedReader::Remote(Cursor::new(bytes));
        assert!(reader.is_compound_file().unwrap());
        assert_eq!(reader.stream_position().unwrap(), 0);

        let mut reader = UnifiedReader::Remote(Cursor::new(b"PK\x03\x04".to_vec()));
        assert!(!reader.is_compound_file().unwrap());
    }

    #[test]
    fn test_open_missing_local_file() {
        assert!(UnifiedReader::new("no/such/workbook.xlsx").is_err());
    }
}
