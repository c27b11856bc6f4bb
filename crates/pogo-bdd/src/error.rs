use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Setup failures that abort a scenario before the directive under test runs.
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("Fixture not found: {0}")]
    MissingFixture(PathBuf),

    #[error("Directive uses '{token}' but no {what} was created by an earlier step")]
    UnresolvedToken { token: String, what: String },

    #[error("Failed to create '{path}': {source}")]
    CreateArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No server is running for this scenario")]
    NoServer,

    #[error("No command has been run in this scenario")]
    NoCommand,

    #[error("No HTTP request has been made in this scenario")]
    NoHttpResponse,

    #[error("'{0}' cannot run in-process: no tool entry point is registered")]
    NoTool(String),

    #[error("Empty directive")]
    EmptyDirective,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Port {port} on {host} is already in use")]
    PortInUse { host: String, port: u16 },

    #[error("Failed to spawn server '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server at {url} did not become ready within {timeout_ms}ms: {reason}\n--- server log ---\n{log}")]
    NotReady {
        url: String,
        timeout_ms: u64,
        reason: String,
        log: String,
    },

    #[error("Failed to stop server (pid {pid}): {reason}")]
    Stop { pid: u32, reason: String },

    #[error("A {active} server is already active; stop it before starting another")]
    AlreadyRunning { active: &'static str },

    #[error("Mock service failed: {0}")]
    Mock(String),

    #[error("Invalid server directive '{directive}': {reason}")]
    Directive { directive: String, reason: String },
}

/// A failed expectation. Every variant carries the output it inspected so
/// the failure report is diagnosable without rerunning the scenario.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Expected output to contain '{expected}'\n--- output ---\n{output}")]
    NotFound { expected: String, output: String },

    #[error("Expected output not to contain '{unexpected}'\n--- output ---\n{output}")]
    UnexpectedlyFound { unexpected: String, output: String },

    #[error("Expected output to match /{pattern}/\n--- output ---\n{output}")]
    NoMatch { pattern: String, output: String },

    #[error("Invalid pattern /{pattern}/: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No JSON object or array found in output\n--- output ---\n{output}")]
    NoJson { output: String },

    #[error("Output is not valid JSON: {reason}\n--- output ---\n{output}")]
    InvalidJson { reason: String, output: String },

    #[error("JSON field '{path}' not found (missing segment '{segment}')\n--- json ---\n{json}")]
    PathMissing {
        path: String,
        segment: String,
        json: String,
    },

    #[error("JSON field '{path}' is not an object at segment '{segment}'\n--- json ---\n{json}")]
    NotAnObject {
        path: String,
        segment: String,
        json: String,
    },

    #[error("JSON field '{path}' is not an array\n--- json ---\n{json}")]
    NotAnArray { path: String, json: String },

    #[error("JSON field '{path}' has value {actual}, expected {expected}\n--- json ---\n{json}")]
    ValueMismatch {
        path: String,
        expected: String,
        actual: String,
        json: String,
    },

    #[error("No CSV header found in output\n--- output ---\n{output}")]
    NoCsv { output: String },

    #[error("Output is not valid CSV: {reason}\n--- csv ---\n{output}")]
    InvalidCsv { reason: String, output: String },

    #[error("CSV header '{header}' contains no comma separators\n--- output ---\n{output}")]
    HeaderWithoutCommas { header: String, output: String },

    #[error("CSV is missing required columns [{missing}] (header: {header})\n--- csv ---\n{output}")]
    MissingColumns {
        missing: String,
        header: String,
        output: String,
    },

    #[error("Best similarity {best:.3} to '{expected}' is below threshold {threshold:.2}\n--- output ---\n{output}")]
    BelowThreshold {
        expected: String,
        best: f64,
        threshold: f64,
        output: String,
    },

    #[error("Output contains none of the characters ä ö ü Ä Ö Ü ß\n--- output ---\n{output}")]
    NoLocaleCharacters { output: String },

    #[error("Region {index} has {field} = {actual}, expected at least {min}\n--- json ---\n{json}")]
    ConfidenceBelow {
        index: usize,
        field: String,
        actual: f64,
        min: f64,
        json: String,
    },

    #[error("Expected file '{path}' to exist")]
    MissingFile { path: PathBuf },

    #[error("Failed to read '{path}': {reason}")]
    ReadFile { path: PathBuf, reason: String },

    #[error("Expected exit code {expected}, got {actual}\n--- output ---\n{output}")]
    ExitCode {
        expected: String,
        actual: i32,
        output: String,
    },

    #[error("Expected HTTP status {expected}, got {actual}\n--- body ---\n{body}")]
    HttpStatus {
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("Expected header '{name}' = '{expected}', got {actual:?}")]
    Header {
        name: String,
        expected: String,
        actual: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read upload file '{path}': {source}")]
    ReadUpload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HarnessError>;
