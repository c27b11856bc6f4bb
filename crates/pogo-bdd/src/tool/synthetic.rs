//! A deterministic stand-in for `pogo`.
//!
//! It parses the same flags as the real CLI and prints results in the
//! shared result shapes, without loading models or running inference.
//! Feature files exercise the harness end to end against it.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::exec::directive::{any_flag_value, flag_value, has_flag};
use crate::ocr_result::{self, ImageResponse, OcrRegion, OutputFormat};

use super::{InvocationConfig, ToolEntry, ToolIo};

pub const VERSION: &str = "0.0.0-synthetic";

/// Detection confidence below which regions are dropped by default.
const DEFAULT_CONFIDENCE: f64 = 0.5;

const USAGE: &str = "usage: pogo <image|pdf|models> [FILE] [--format json|text|csv] \
[--confidence N] [--output PATH] [--language CODE] [--models-dir DIR]";

#[derive(Debug, Clone, Default)]
pub struct SyntheticTool {
    /// Regions returned before confidence filtering; defaults to
    /// [`default_regions`].
    regions: Option<Vec<OcrRegion>>,
}

impl SyntheticTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions(regions: Vec<OcrRegion>) -> Self {
        Self {
            regions: Some(regions),
        }
    }

    fn regions(&self, language: Option<&str>) -> Vec<OcrRegion> {
        self.regions
            .clone()
            .unwrap_or_else(|| default_regions(language))
    }
}

/// Three regions with falling detection confidence.
pub fn default_regions(language: Option<&str>) -> Vec<OcrRegion> {
    vec![
        ocr_result::synthetic_region(language),
        OcrRegion {
            x: 10,
            y: 90,
            w: 180,
            h: 40,
            det_conf: 0.85,
            text: "Invoice 2024-001".to_string(),
            rec_conf: 0.88,
        },
        OcrRegion {
            x: 10,
            y: 150,
            w: 120,
            h: 30,
            det_conf: 0.62,
            text: "Total 42.00".to_string(),
            rec_conf: 0.71,
        },
    ]
}

impl ToolEntry for SyntheticTool {
    fn run(&self, args: &[String], config: &InvocationConfig, io: &mut ToolIo) -> i32 {
        let Some(command) = args.first() else {
            let _ = writeln!(io.err(), "{}", USAGE);
            return 2;
        };

        match command.as_str() {
            "--version" | "-V" => {
                let _ = writeln!(io.out(), "pogo {}", VERSION);
                0
            }
            "--help" | "-h" => {
                let _ = writeln!(io.out(), "{}", USAGE);
                0
            }
            "models" => {
                let catalog = ocr_result::model_catalog();
                let rendered = serde_json::to_string_pretty(&catalog)
                    .unwrap_or_else(|_| catalog.to_string());
                let _ = writeln!(io.out(), "{}", rendered);
                0
            }
            "image" | "pdf" => self.recognise(command, &args[1..], config, io),
            other => {
                let _ = writeln!(io.err(), "error: unknown command '{}'\n{}", other, USAGE);
                2
            }
        }
    }
}

impl SyntheticTool {
    fn recognise(
        &self,
        command: &str,
        args: &[String],
        config: &InvocationConfig,
        io: &mut ToolIo,
    ) -> i32 {
        let Some(input) = args.first().filter(|a| !a.starts_with('-')) else {
            let _ = writeln!(io.err(), "error: missing input file\n{}", USAGE);
            return 2;
        };
        let input_path = resolve(&config.working_dir, input);
        if !input_path.exists() {
            let _ = writeln!(io.err(), "error: file not found: {}", input);
            return 1;
        }

        let format = match flag_value(args, "--format").map(str::parse::<OutputFormat>) {
            None => OutputFormat::Text,
            Some(Ok(format)) => format,
            Some(Err(e)) => {
                let _ = writeln!(io.err(), "error: {}", e);
                return 2;
            }
        };

        let min_confidence = match flag_value(args, "--confidence").map(str::parse::<f64>) {
            None => DEFAULT_CONFIDENCE,
            Some(Ok(value)) if (0.0..=1.0).contains(&value) => value,
            Some(_) => {
                let _ = writeln!(io.err(), "error: --confidence must be a number in [0, 1]");
                return 2;
            }
        };

        let models_dir = flag_value(args, "--models-dir")
            .map(|d| resolve(&config.working_dir, d))
            .or_else(|| config.models_dir.clone());
        if let Some(dir) = &models_dir {
            if !dir.is_dir() {
                let _ = writeln!(io.err(), "error: models directory not found: {}", dir.display());
                return 1;
            }
            let _ = writeln!(io.err(), "Using models from {}", dir.display());
        }

        for flag in ["--det-model", "--rec-model", "--dict"] {
            if let Some(path) = flag_value(args, flag) {
                if !resolve(&config.working_dir, path).is_file() {
                    let _ = writeln!(io.err(), "error: {} not found: {}", &flag[2..], path);
                    return 1;
                }
            }
        }

        let language = flag_value(args, "--language");
        let regions: Vec<OcrRegion> = self
            .regions(language)
            .into_iter()
            .filter(|r| r.det_conf >= min_confidence)
            .collect();

        let filename = Path::new(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string());

        if has_flag(args, "--verbose") {
            let _ = writeln!(io.out(), "Processing {} ({} regions)", filename, regions.len());
        }

        let rendered = if command == "pdf" {
            let pages = vec![regions.clone(), regions];
            ocr_result::render_pages(&filename, &pages, format)
        } else {
            let mut response = ImageResponse::new(&filename, regions);
            if has_flag(args, "--overlay") {
                response.overlay = Some(format!("{}.overlay.png", filename));
            }
            response.render(format)
        };
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                let _ = writeln!(io.err(), "error: {}", e);
                return 1;
            }
        };

        match any_flag_value(args, &["--output", "-o"]) {
            Some(out) => {
                let out_path = resolve(&config.working_dir, out);
                if let Err(e) = std::fs::write(&out_path, rendered.as_bytes()) {
                    let _ = writeln!(io.err(), "error: failed to write {}: {}", out, e);
                    return 1;
                }
                let _ = writeln!(io.out(), "Wrote {}", out);
            }
            None => {
                let _ = writeln!(io.out(), "{}", rendered);
            }
        }

        0
    }
}

fn resolve(working_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}
