// CSV/TSV parameter sources

use std::io::Read;
use std::path::Path;

use paramgrid_recon::ParameterRow;

use crate::columns::{rows_from_records, ColumnMap};
use crate::error::IoError;

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts[0];
        if target <= 1 {
            continue;
        }

        // More consistent lines wins; more columns breaks ties
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |e: std::io::Error| IoError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Header row plus data records, with the delimiter sniffed from the content.
pub fn read_records(content: &str) -> Result<(Vec<String>, Vec<Vec<String>>), IoError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, records))
}

pub fn parse_rows(source_id: &str, content: &str, columns: &ColumnMap) -> Result<Vec<ParameterRow>, IoError> {
    let (headers, records) = read_records(content)?;
    rows_from_records(source_id, &headers, records, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "parameter_name;value;module\nTemp;30;M1\nSpeed;1200;M1\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "parameter_name,value,module\nTemp,30,M1\nSpeed,1200,M1\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "parameter_name\tvalue\nTemp\t30\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "parameter_name;value;note\n\"Ratio\";\"1,5\";\"a, b\"\nGain;2;x\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_parse_rows_with_aliases() {
        let content = "Name;Default Value;Spec Min;Spec Max\nTemp;48;10;50\nMode;auto;;\n";
        let rows = parse_rows("line1", content, &ColumnMap::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].parameter_name, "Temp");
        assert_eq!(rows[0].spec_min, Some(10.0));
        assert_eq!(rows[1].present_value(), Some("auto"));
        assert!(!rows[1].has_spec_range());
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Temp\u{e9}rature" with 0xE9 as a single Windows-1252 byte
        let mut bytes = b"parameter_name,value\nTemp".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"rature,20\n");
        fs::write(&path, bytes).unwrap();

        let content = read_file_as_utf8(&path).unwrap();
        let rows = parse_rows("latin.csv", &content, &ColumnMap::default()).unwrap();
        assert_eq!(rows[0].parameter_name, "Temp\u{e9}rature");
    }
}
