//! CSV extraction and producer-specific column checks.

use crate::error::VerifyError;

/// Column sets emitted by the tool's CSV producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvSchema {
    /// Image results: one row per region.
    Plain,
    /// PDF results: one row per region per page.
    Paged,
}

impl CsvSchema {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            CsvSchema::Plain => &["x", "y", "w", "h", "det_conf", "text", "rec_conf"],
            CsvSchema::Paged => &["Page", "File", "X1", "Y1", "X2", "Y2"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| self.column_index(col).is_none())
            .map(|col| col.to_string())
            .collect()
    }
}

/// Parses the CSV payload of `output`, skipping leading lines (banners,
/// progress) that contain no comma.
pub fn extract(output: &str) -> Result<CsvTable, VerifyError> {
    let payload = skip_preamble(output, None).ok_or_else(|| VerifyError::NoCsv {
        output: output.to_string(),
    })?;
    parse(payload, output)
}

/// Like [`extract`], but prefers a header line naming the schema's first
/// column so comma-bearing log lines before the payload are skipped too.
pub fn extract_for(output: &str, schema: CsvSchema) -> Result<CsvTable, VerifyError> {
    let anchor = schema.required_columns()[0];
    let payload = skip_preamble(output, Some(anchor))
        .or_else(|| skip_preamble(output, None))
        .ok_or_else(|| VerifyError::NoCsv {
            output: output.to_string(),
        })?;
    parse(payload, output)
}

pub fn assert_schema(output: &str, schema: CsvSchema) -> Result<CsvTable, VerifyError> {
    let table = extract_for(output, schema)?;
    check_columns(table, schema.required_columns(), output)
}

pub fn assert_columns(output: &str, required: &[&str]) -> Result<CsvTable, VerifyError> {
    let table = extract(output)?;
    check_columns(table, required, output)
}

fn check_columns(
    table: CsvTable,
    required: &[&str],
    output: &str,
) -> Result<CsvTable, VerifyError> {
    let missing = table.missing_columns(required);
    if missing.is_empty() {
        Ok(table)
    } else {
        Err(VerifyError::MissingColumns {
            missing: missing.join(", "),
            header: table.headers.join(","),
            output: output.to_string(),
        })
    }
}

fn skip_preamble<'a>(output: &'a str, anchor: Option<&str>) -> Option<&'a str> {
    let mut offset = 0;
    for line in output.split_inclusive('\n') {
        let is_header = line.contains(',')
            && anchor.map_or(true, |a| {
                line.split(',')
                    .any(|field| field.trim().trim_matches('"').eq_ignore_ascii_case(a))
            });
        if is_header {
            return Some(&output[offset..]);
        }
        offset += line.len();
    }
    None
}

fn parse(payload: &str, output: &str) -> Result<CsvTable, VerifyError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(payload.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| VerifyError::InvalidCsv {
            reason: e.to_string(),
            output: output.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.len() < 2 {
        return Err(VerifyError::HeaderWithoutCommas {
            header: headers.join(""),
            output: output.to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| VerifyError::InvalidCsv {
            reason: e.to_string(),
            output: output.to_string(),
        })?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(CsvTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "pogo v0.3.1\nProcessing test.png\nx,y,w,h,det_conf,text,rec_conf\n10,20,200,50,0.95,Hello World,0.92\n";

    #[test]
    fn test_extract_skips_banner() {
        let table = extract(PLAIN).unwrap();
        assert_eq!(table.headers.len(), 7);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.column("text").unwrap(), vec!["Hello World"]);
    }

    #[test]
    fn test_plain_schema_passes() {
        assert!(assert_schema(PLAIN, CsvSchema::Plain).is_ok());
    }

    #[test]
    fn test_column_presence_is_case_insensitive() {
        let output = "X,Y,W,H,DET_CONF,TEXT,REC_CONF\n1,2,3,4,0.9,a,0.8\n";
        assert!(assert_schema(output, CsvSchema::Plain).is_ok());
        assert!(assert_columns(output, &["text"]).is_ok());
    }

    #[test]
    fn test_paged_schema() {
        let output = "Processing doc.pdf (2 pages)\nPage,File,X1,Y1,X2,Y2,Text,Confidence\n1,doc.pdf,10,20,210,70,Hello,0.92\n";
        assert!(assert_schema(output, CsvSchema::Paged).is_ok());
        match assert_schema(output, CsvSchema::Plain) {
            Err(VerifyError::MissingColumns { missing, .. }) => {
                assert!(missing.contains("det_conf"));
            }
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_anchor_skips_comma_bearing_log_line() {
        let output = "Loaded 2 models, 1 dictionary\nx,y,w,h,det_conf,text,rec_conf\n1,2,3,4,0.9,a,0.8\n";
        let table = assert_schema(output, CsvSchema::Plain).unwrap();
        assert_eq!(table.headers[0], "x");
    }

    #[test]
    fn test_no_csv() {
        assert!(matches!(
            extract("no separators here\nnor here"),
            Err(VerifyError::NoCsv { .. })
        ));
    }

    #[test]
    fn test_quoted_single_field_header_rejected() {
        let output = "\"Loading, please wait\"\n";
        assert!(matches!(
            extract(output),
            Err(VerifyError::HeaderWithoutCommas { .. })
        ));
    }

    #[test]
    fn test_quoted_text_with_comma() {
        let output = "x,y,w,h,det_conf,text,rec_conf\n1,2,3,4,0.9,\"Hello, World\",0.8\n";
        let table = extract(output).unwrap();
        assert_eq!(table.column("TEXT").unwrap(), vec!["Hello, World"]);
    }
}
