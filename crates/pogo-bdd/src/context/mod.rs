//! Per-scenario state and the artifacts a scenario leaves behind.

pub mod substitution;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HttpError, PreconditionError};
use crate::exec::{CommandOutcome, EnvOverrides, ExecutionMode, Executor};
use crate::http::{HttpClient, HttpExchange};
use crate::server::{MockServer, ProcessServer, ServerManager};
use crate::tool::ToolEntry;

/// Ad hoc model files a scenario can point the tool at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModelKind {
    DetectionModel,
    RecognitionModel,
    Dictionary,
}

impl ModelKind {
    pub fn token(&self) -> &'static str {
        match self {
            ModelKind::DetectionModel => substitution::CUSTOM_DET_MODEL,
            ModelKind::RecognitionModel => substitution::CUSTOM_REC_MODEL,
            ModelKind::Dictionary => substitution::CUSTOM_DICT,
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            ModelKind::DetectionModel => "custom_det.onnx",
            ModelKind::RecognitionModel => "custom_rec.onnx",
            ModelKind::Dictionary => "custom_dict.txt",
        }
    }

    fn placeholder(&self) -> &'static [u8] {
        match self {
            ModelKind::DetectionModel | ModelKind::RecognitionModel => b"ONNX-PLACEHOLDER",
            ModelKind::Dictionary => "a\nb\nc\nä\nö\nü\nß\n".as_bytes(),
        }
    }
}

/// Everything one scenario accumulates between its first and last step.
///
/// Created fresh for every scenario. Tracked paths are removed by
/// [`TestContext::teardown`] or, failing that, on drop.
pub struct TestContext {
    config: Arc<HarnessConfig>,
    executor: Executor,

    last_command: Option<CommandOutcome>,

    env: EnvOverrides,
    working_dir: Option<PathBuf>,
    root: Option<TempDir>,
    temp_models_dir: Option<PathBuf>,
    custom_models: BTreeMap<ModelKind, PathBuf>,

    server: ServerManager,
    http: Option<HttpClient>,
    last_http: Option<HttpExchange>,

    created_files: Vec<PathBuf>,
    created_dirs: Vec<PathBuf>,
}

impl TestContext {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self {
            executor: Executor::new(Arc::clone(&config)),
            config,
            last_command: None,
            env: EnvOverrides::new(),
            working_dir: None,
            root: None,
            temp_models_dir: None,
            custom_models: BTreeMap::new(),
            server: ServerManager::new(),
            http: None,
            last_http: None,
            created_files: Vec::new(),
            created_dirs: Vec::new(),
        }
    }

    /// Registers the entry point used for in-process directives.
    pub fn with_tool(mut self, tool: Arc<dyn ToolEntry>) -> Self {
        self.executor = self.executor.clone().with_tool(tool);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    // ---- filesystem -------------------------------------------------------

    /// Scenario-scoped temporary root, created on first use.
    pub fn root_dir(&mut self) -> Result<PathBuf, PreconditionError> {
        if let Some(root) = &self.root {
            return Ok(root.path().to_path_buf());
        }
        let root = tempfile::Builder::new()
            .prefix("pogo-bdd-")
            .tempdir()
            .map_err(|source| PreconditionError::CreateArtifact {
                path: std::env::temp_dir(),
                source,
            })?;
        let path = root.path().to_path_buf();
        debug!("Scenario root {}", path.display());
        self.root = Some(root);
        Ok(path)
    }

    /// Explicit working directory, else the scenario root.
    pub fn working_dir(&mut self) -> Result<PathBuf, PreconditionError> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => self.root_dir(),
        }
    }

    /// Relative paths are taken from the scenario root.
    pub fn set_working_dir(&mut self, path: impl AsRef<Path>) -> Result<(), PreconditionError> {
        let path = self.resolve_in_root(path.as_ref())?;
        if !path.is_dir() {
            return Err(PreconditionError::MissingFixture(path));
        }
        self.working_dir = Some(path);
        Ok(())
    }

    pub fn create_temp_models_dir(&mut self) -> Result<PathBuf, PreconditionError> {
        let dir = self
            .root_dir()?
            .join(format!("models-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).map_err(|source| PreconditionError::CreateArtifact {
            path: dir.clone(),
            source,
        })?;
        self.track_dir(&dir);
        self.temp_models_dir = Some(dir.clone());
        Ok(dir)
    }

    pub fn temp_models_dir(&self) -> Option<&Path> {
        self.temp_models_dir.as_deref()
    }

    /// Writes a placeholder model or dictionary under the root and records
    /// it for its substitution token.
    pub fn create_custom_model(&mut self, kind: ModelKind) -> Result<PathBuf, PreconditionError> {
        let path = self.root_dir()?.join(kind.file_name());
        write_file(&path, kind.placeholder())?;
        self.track_file(&path);
        self.custom_models.insert(kind, path.clone());
        Ok(path)
    }

    /// Writes `bytes` to `name` relative to the working directory.
    pub fn write_fixture(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf, PreconditionError> {
        let path = self.working_dir()?.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PreconditionError::CreateArtifact {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_file(&path, bytes)?;
        self.track_file(&path);
        Ok(path)
    }

    /// Path of an input file that must already exist.
    pub fn require_fixture(&mut self, name: &str) -> Result<PathBuf, PreconditionError> {
        let path = self.working_dir()?.join(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(PreconditionError::MissingFixture(path))
        }
    }

    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        self.created_files.push(path.into());
    }

    pub fn track_dir(&mut self, path: impl Into<PathBuf>) {
        self.created_dirs.push(path.into());
    }

    pub fn tracked_paths(&self) -> impl Iterator<Item = &Path> {
        self.created_files
            .iter()
            .chain(self.created_dirs.iter())
            .map(PathBuf::as_path)
    }

    // ---- environment ------------------------------------------------------

    pub fn add_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.push(name, value);
    }

    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }

    pub fn effective_env(&self) -> BTreeMap<String, String> {
        self.env.effective()
    }

    /// Points the models-directory variable at a freshly created temp dir.
    pub fn use_temp_models_dir(&mut self) -> Result<PathBuf, PreconditionError> {
        let dir = match &self.temp_models_dir {
            Some(dir) => dir.clone(),
            None => self.create_temp_models_dir()?,
        };
        let name = self.config.models_dir_env.clone();
        self.add_env(name, dir.to_string_lossy());
        Ok(dir)
    }

    pub fn substitute(&mut self, directive: &str) -> Result<String, PreconditionError> {
        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();
        if let Some(dir) = &self.temp_models_dir {
            values.insert(substitution::TEMP_MODELS_DIR, dir.to_string_lossy().into_owned());
        }
        for (kind, path) in &self.custom_models {
            values.insert(kind.token(), path.to_string_lossy().into_owned());
        }
        if directive.contains(substitution::ROOT) {
            values.insert(substitution::ROOT, self.root_dir()?.to_string_lossy().into_owned());
        }
        if let Some(url) = self.server.base_url() {
            values.insert(substitution::SERVER_URL, url);
        }
        substitution::substitute(directive, &values)
    }

    // ---- commands ---------------------------------------------------------

    /// Substitutes tokens, runs the directive and records the outcome.
    pub async fn run(
        &mut self,
        directive: &str,
        mode: ExecutionMode,
    ) -> Result<&CommandOutcome, HarnessError> {
        let directive = self.substitute(directive)?;
        let working_dir = self.working_dir()?;
        let outcome = self
            .executor
            .run(&directive, mode, &self.env, &working_dir)
            .await?;
        Ok(self.record(outcome))
    }

    /// Runs with the mode implied by the directive's program name.
    pub async fn run_suggested(&mut self, directive: &str) -> Result<&CommandOutcome, HarnessError> {
        let mode = ExecutionMode::suggested_for(directive, &self.config.tool_name);
        self.run(directive, mode).await
    }

    pub fn record(&mut self, outcome: CommandOutcome) -> &CommandOutcome {
        if let Some(file) = &outcome.output_file {
            self.created_files.push(file.clone());
        }
        self.last_command.insert(outcome)
    }

    pub fn last_command(&self) -> Result<&CommandOutcome, PreconditionError> {
        self.last_command.as_ref().ok_or(PreconditionError::NoCommand)
    }

    pub fn output(&self) -> Result<&str, PreconditionError> {
        self.last_command().map(|c| c.output.as_str())
    }

    pub fn last_output_file(&self) -> Option<&Path> {
        self.last_command
            .as_ref()
            .and_then(|c| c.output_file.as_deref())
    }

    // ---- server -----------------------------------------------------------

    /// Starts the real server named by `directive`; its log goes under the
    /// scenario root.
    pub async fn start_server(&mut self, directive: &str) -> Result<(), HarnessError> {
        let directive = self.substitute(directive)?;
        let working_dir = self.working_dir()?;
        let log_path = self
            .root_dir()?
            .join(format!("server-{}.log", Uuid::new_v4().simple()));
        self.track_file(&log_path);

        let backend = ProcessServer::from_directive(
            Arc::clone(&self.config),
            &directive,
            self.env.clone(),
            &working_dir,
            log_path,
        )?;
        self.server.start(Box::new(backend)).await?;
        Ok(())
    }

    pub async fn start_mock_server(&mut self) -> Result<(), HarnessError> {
        let backend = MockServer::new(self.config.mock_max_upload_bytes);
        self.server.start(Box::new(backend)).await?;
        Ok(())
    }

    pub async fn stop_server(&mut self) -> Result<(), HarnessError> {
        self.server.stop().await?;
        Ok(())
    }

    pub fn server(&self) -> &ServerManager {
        &self.server
    }

    pub fn server_url(&self) -> Result<String, PreconditionError> {
        self.server.base_url().ok_or(PreconditionError::NoServer)
    }

    // ---- HTTP -------------------------------------------------------------

    fn http_client(&mut self) -> Result<HttpClient, HttpError> {
        match &self.http {
            Some(client) => Ok(client.clone()),
            None => {
                let client = HttpClient::new()?;
                self.http = Some(client.clone());
                Ok(client)
            }
        }
    }

    pub async fn http_get(&mut self, path: &str) -> Result<&HttpExchange, HarnessError> {
        let url = format!("{}{}", self.server_url()?, path);
        let exchange = self.http_client()?.get(&url).await?;
        Ok(self.record_http(exchange))
    }

    /// Uploads a file (relative to the working directory) as multipart
    /// field `field`.
    pub async fn http_upload(
        &mut self,
        path: &str,
        file: &str,
        field: &str,
        query: &[(String, String)],
    ) -> Result<&HttpExchange, HarnessError> {
        let url = format!("{}{}", self.server_url()?, path);
        let file = self.require_fixture(file)?;
        let exchange = self.http_client()?.upload(&url, &file, field, query).await?;
        Ok(self.record_http(exchange))
    }

    pub async fn http_preflight(&mut self, path: &str, origin: &str) -> Result<&HttpExchange, HarnessError> {
        let url = format!("{}{}", self.server_url()?, path);
        let exchange = self.http_client()?.preflight(&url, origin).await?;
        Ok(self.record_http(exchange))
    }

    pub fn record_http(&mut self, exchange: HttpExchange) -> &HttpExchange {
        self.last_http.insert(exchange)
    }

    pub fn last_http(&self) -> Result<&HttpExchange, PreconditionError> {
        self.last_http.as_ref().ok_or(PreconditionError::NoHttpResponse)
    }

    // ---- teardown ---------------------------------------------------------

    /// Stops any server and removes everything the scenario created.
    pub async fn teardown(&mut self) {
        if let Err(e) = self.server.stop().await {
            warn!("Failed to stop server during teardown: {}", e);
        }
        self.remove_tracked();
        if let Some(root) = self.root.take() {
            if let Err(e) = root.close() {
                warn!("Failed to remove scenario root: {}", e);
            }
        }
        self.working_dir = None;
        self.temp_models_dir = None;
        self.custom_models.clear();
    }

    fn remove_tracked(&mut self) {
        for file in self.created_files.drain(..) {
            if let Err(e) = std::fs::remove_file(&file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", file.display(), e);
                }
            }
        }
        for dir in self.created_dirs.drain(..).rev() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", dir.display(), e);
                }
            }
        }
    }

    fn resolve_in_root(&mut self, path: &Path) -> Result<PathBuf, PreconditionError> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.root_dir()?.join(path))
        }
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.kill_now();
        self.remove_tracked();
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PreconditionError> {
    std::fs::write(path, bytes).map_err(|source| PreconditionError::CreateArtifact {
        path: path.to_path_buf(),
        source,
    })
}
