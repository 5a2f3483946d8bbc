// Text decoding for delimited exports.
//
// Exports from media monitoring tools are usually UTF-8, sometimes with a BOM,
// and occasionally Windows-1252 when someone re-saved them in Excel.

use std::path::Path;

use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::error::IoError;

/// Decode raw bytes: UTF-8 (BOM stripped) when valid, otherwise Windows-1252.
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        // `decode` already sniffed and removed a UTF-8 BOM
        return text.into_owned();
    }
    log::debug!("source is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Read a file and decode it with [`decode_text`].
pub fn read_text_file(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_text(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBFDate,Source\n";
        assert_eq!(decode_text(bytes), "Date,Source\n");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // "Café" with 0xE9 as a single byte
        let bytes = b"Caf\xE9";
        assert_eq!(decode_text(bytes), "Café");
    }

    #[test]
    fn test_read_text_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Headline\nLaunch").unwrap();
        let text = read_text_file(file.path()).unwrap();
        assert_eq!(text, "Headline\nLaunch");
    }

    #[test]
    fn test_read_text_file_missing() {
        let err = read_text_file(Path::new("/nonexistent/export.csv")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
