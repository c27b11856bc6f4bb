//! Result shapes produced by `pogo` and its HTTP service.
//!
//! The Mock Service and the synthetic in-process tool both render through
//! these types, so the verification predicates see the same JSON fields
//! and CSV columns whichever backend produced them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text of the synthetic region.
pub const SYNTHETIC_TEXT: &str = "Hello World";

/// Text of the synthetic region when German is requested.
pub const SYNTHETIC_TEXT_DE: &str = "Größe Übung ändern";

#[derive(Debug, Error)]
#[error("Unsupported output format: '{0}' (expected json, text or csv)")]
pub struct UnknownFormat(pub String);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
    Csv,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Text => "text/plain; charset=utf-8",
            OutputFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

/// One detected text region. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrRegion {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub det_conf: f64,
    pub text: String,
    pub rec_conf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub regions: Vec<OcrRegion>,
    pub processing_time_ms: u64,
}

/// Body of a successful `POST /ocr/image` and of `pogo image --format json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub success: bool,
    pub filename: String,
    pub ocr: OcrResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
}

/// One region of a page-structured (PDF) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRegion {
    #[serde(rename = "Page")]
    pub page: u32,
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "X1")]
    pub x1: i32,
    #[serde(rename = "Y1")]
    pub y1: i32,
    #[serde(rename = "X2")]
    pub x2: i32,
    #[serde(rename = "Y2")]
    pub y2: i32,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

impl From<(&OcrRegion, u32, &str)> for PageRegion {
    fn from((region, page, file): (&OcrRegion, u32, &str)) -> Self {
        Self {
            page,
            file: file.to_string(),
            x1: region.x,
            y1: region.y,
            x2: region.x + region.w as i32,
            y2: region.y + region.h as i32,
            text: region.text.clone(),
            confidence: region.rec_conf,
        }
    }
}

/// The single deterministic region returned by the synthetic backends.
pub fn synthetic_region(language: Option<&str>) -> OcrRegion {
    let text = match language {
        Some(lang) if lang.eq_ignore_ascii_case("de") => SYNTHETIC_TEXT_DE,
        _ => SYNTHETIC_TEXT,
    };

    OcrRegion {
        x: 10,
        y: 20,
        w: 200,
        h: 50,
        det_conf: 0.95,
        text: text.to_string(),
        rec_conf: 0.92,
    }
}

/// Fixed model catalog reported by `GET /models` and `pogo models`.
pub fn model_catalog() -> serde_json::Value {
    serde_json::json!({
        "detection": [
            { "name": "db_resnet18", "file": "det_db_resnet18.onnx", "default": true }
        ],
        "recognition": [
            { "name": "crnn_latin", "file": "rec_crnn_latin.onnx", "default": true },
            { "name": "crnn_german", "file": "rec_crnn_german.onnx", "default": false }
        ],
        "dictionaries": [
            { "name": "latin", "file": "dict_latin.txt", "language": "en" },
            { "name": "german", "file": "dict_german.txt", "language": "de" }
        ]
    })
}

impl ImageResponse {
    pub fn new(filename: &str, regions: Vec<OcrRegion>) -> Self {
        Self {
            success: true,
            filename: filename.to_string(),
            ocr: OcrResult {
                regions,
                processing_time_ms: 0,
            },
            overlay: None,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, RenderError> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(render_text(&self.ocr.regions)),
            OutputFormat::Csv => render_csv(&self.ocr.regions),
        }
    }
}

/// Renders page-structured results; JSON groups regions under `pages`.
pub fn render_pages(
    file: &str,
    pages: &[Vec<OcrRegion>],
    format: OutputFormat,
) -> Result<String, RenderError> {
    let rows: Vec<PageRegion> = pages
        .iter()
        .enumerate()
        .flat_map(|(idx, regions)| {
            regions
                .iter()
                .map(move |region| PageRegion::from((region, idx as u32 + 1, file)))
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let pages_json: Vec<serde_json::Value> = pages
                .iter()
                .enumerate()
                .map(|(idx, regions)| {
                    serde_json::json!({
                        "page": idx + 1,
                        "regions": regions,
                    })
                })
                .collect();
            Ok(serde_json::to_string_pretty(&serde_json::json!({
                "success": true,
                "file": file,
                "pages": pages_json,
            }))?)
        }
        OutputFormat::Text => Ok(rows
            .iter()
            .map(|row| format!("[page {}] {}", row.page, row.text))
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Csv => write_csv(&rows),
    }
}

fn render_text(regions: &[OcrRegion]) -> String {
    regions
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_csv(regions: &[OcrRegion]) -> Result<String, RenderError> {
    if regions.is_empty() {
        // serde-driven headers are only written with the first record
        return Ok("x,y,w,h,det_conf,text,rec_conf\n".to_string());
    }
    write_csv(regions)
}

fn write_csv<T: Serialize>(rows: &[T]) -> Result<String, RenderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| RenderError::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
