//! Delimited text → matrix of string cells.
//!
//! Quoting, doubled quotes, embedded delimiters/newlines and CRLF are handled
//! by the `csv` crate. Blank lines, which `csv` skips, come back as
//! zero-length rows so that matrix index + 1 is still the physical line
//! number of single-line records.

use csv::{ReaderBuilder, StringRecord};

/// Delimiters tried by [`sniff_delimiter`], in order of preference.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Non-blank lines inspected when sniffing
const SNIFF_LINES: usize = 10;

/// Parse delimited text, choosing the delimiter with [`sniff_delimiter`].
pub fn parse_table(text: &str) -> Vec<Vec<String>> {
    parse_delimited(text, sniff_delimiter(text))
}

/// Parse delimited text with an explicit delimiter.
pub fn parse_delimited(text: &str, delimiter: u8) -> Vec<Vec<String>> {
    let bytes = text.as_bytes();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut lines = LineCounter::default();
    let mut next_line = 1usize;
    let mut record = StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                log::warn!("stopped reading delimited text: {e}");
                break;
            }
        }

        // The recorded position can sit before the blank lines csv skipped
        let start = record.position().map_or(0, |p| p.byte() as usize).min(bytes.len());
        let content_start = start
            + bytes[start..]
                .iter()
                .take_while(|b| matches!(b, b'\r' | b'\n'))
                .count();
        let line = 1 + lines.newlines_before(bytes, content_start);

        while next_line < line {
            rows.push(Vec::new());
            next_line += 1;
        }

        let embedded: usize = record.iter().map(|f| f.matches('\n').count()).sum();
        next_line = line + 1 + embedded;
        rows.push(record.iter().map(str::to_string).collect());
    }

    log::debug!("parsed {} rows (delimiter {:?})", rows.len(), delimiter as char);
    rows
}

/// True for zero-length rows and rows whose cells are all whitespace.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Pick the delimiter whose field count is consistent (and largest) over the
/// first lines; otherwise the one most frequent in the header line; else comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    let mut consistent: Option<(u8, usize)> = None;
    for &delimiter in &CANDIDATE_DELIMITERS {
        let first = count_unquoted(header, delimiter);
        if first == 0 {
            continue;
        }
        let stable = sample.iter().all(|l| count_unquoted(l, delimiter) == first);
        if stable && consistent.map_or(true, |(_, best)| first > best) {
            consistent = Some((delimiter, first));
        }
    }
    if let Some((delimiter, _)) = consistent {
        return delimiter;
    }

    let mut most_frequent: Option<(u8, usize)> = None;
    for &delimiter in &CANDIDATE_DELIMITERS {
        let n = count_unquoted(header, delimiter);
        if n > 0 && most_frequent.map_or(true, |(_, best)| n > best) {
            most_frequent = Some((delimiter, n));
        }
    }
    most_frequent.map_or(b',', |(delimiter, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Incremental newline count over a byte buffer scanned front to back
#[derive(Default)]
struct LineCounter {
    scanned: usize,
    newlines: usize,
}

impl LineCounter {
    fn newlines_before(&mut self, bytes: &[u8], offset: usize) -> usize {
        let offset = offset.min(bytes.len());
        if offset > self.scanned {
            self.newlines += bytes[self.scanned..offset].iter().filter(|&&b| b == b'\n').count();
            self.scanned = offset;
        }
        self.newlines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn quoted_fields_with_delimiters_and_newlines() {
        let text = "Title,Outlet\n\"Launch, day one\",\"Example\nTimes\"\n\"He said \"\"hi\"\"\",Wire\n";
        let rows = parse_table(text);
        assert_eq!(
            rows,
            vec![
                row(&["Title", "Outlet"]),
                row(&["Launch, day one", "Example\nTimes"]),
                row(&["He said \"hi\"", "Wire"]),
            ]
        );
    }

    #[test]
    fn crlf_and_lf_terminators() {
        let rows = parse_table("a,b\r\nc,d\ne,f");
        assert_eq!(rows, vec![row(&["a", "b"]), row(&["c", "d"]), row(&["e", "f"])]);
    }

    #[test]
    fn blank_lines_become_empty_rows() {
        let rows = parse_table("a,b\n\nc,d\r\n\r\ne,f\n");
        assert_eq!(rows.len(), 5);
        assert!(rows[1].is_empty());
        assert!(rows[3].is_empty());
        assert_eq!(rows[4], row(&["e", "f"]));
        assert!(is_blank_row(&rows[1]));
        assert!(is_blank_row(&row(&[" ", ""])));
    }

    #[test]
    fn blank_line_after_multiline_record() {
        let rows = parse_table("a,b\n\"x\ny\",z\n\nlast,row\n");
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], row(&["x\ny", "z"]));
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], row(&["last", "row"]));
    }

    #[test]
    fn unbalanced_quote_is_literal_remainder() {
        let rows = parse_table("a,b\nc,\"unterminated, text\nmore");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "c");
        assert!(rows[1][1].starts_with("unterminated, text"));
    }

    #[test]
    fn sniffs_tab_and_semicolon() {
        assert_eq!(sniff_delimiter("Date\tSource\tURL\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("Date;Source\n\"a;b\";c\n"), b';');
        assert_eq!(sniff_delimiter("single column\nvalue\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn sniff_ignores_quoted_delimiters() {
        let text = "Title,Outlet,URL\n\"Rates; fees | more\",Wire,http://a.com\n";
        assert_eq!(sniff_delimiter(text), b',');
        assert_eq!(parse_table(text)[1][0], "Rates; fees | more");
    }
}
