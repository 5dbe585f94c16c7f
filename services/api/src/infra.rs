use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use outreach_forms::config::{SheetsConfig, StoreBackend};
use outreach_forms::forms::{FormKind, SubmissionHandler};
use outreach_forms::store::{
    GoogleSheets, InMemorySheets, SheetLayout, SheetStore, SheetsBackend, StoreError,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type FormStore = SheetStore<ConfiguredBackend>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<FormStore>,
}

/// Backend picked from `STORE_BACKEND` at startup.
#[derive(Debug)]
pub(crate) enum ConfiguredBackend {
    Google(GoogleSheets),
    Memory(InMemorySheets),
}

impl ConfiguredBackend {
    pub(crate) async fn from_config(config: &SheetsConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Google => {
                let backend = GoogleSheets::connect(config).await?;
                info!(
                    spreadsheet_id = backend.spreadsheet_id(),
                    "using google sheets backend"
                );
                Ok(Self::Google(backend))
            }
            StoreBackend::Memory => {
                warn!("using in-memory sheets backend; submissions are lost on restart");
                Ok(Self::Memory(InMemorySheets::default()))
            }
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            ConfiguredBackend::Google(_) => "google",
            ConfiguredBackend::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl SheetsBackend for ConfiguredBackend {
    async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
        match self {
            ConfiguredBackend::Google(backend) => backend.sheet_titles().await,
            ConfiguredBackend::Memory(backend) => backend.sheet_titles().await,
        }
    }

    async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
        match self {
            ConfiguredBackend::Google(backend) => backend.create_sheet(layout).await,
            ConfiguredBackend::Memory(backend) => backend.create_sheet(layout).await,
        }
    }

    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        match self {
            ConfiguredBackend::Google(backend) => backend.append_values(range, rows).await,
            ConfiguredBackend::Memory(backend) => backend.append_values(range, rows).await,
        }
    }
}

/// Builds the process-wide store and the handler that shares it.
pub(crate) async fn build_store(
    config: &SheetsConfig,
) -> Result<(Arc<FormStore>, Arc<SubmissionHandler<FormStore>>), StoreError> {
    let backend = ConfiguredBackend::from_config(config).await?;
    let store = Arc::new(SheetStore::new(backend));
    let handler = Arc::new(SubmissionHandler::new(store.clone()));
    Ok((store, handler))
}

pub(crate) fn parse_form_kind(raw: &str) -> Result<FormKind, String> {
    FormKind::parse(raw).ok_or_else(|| format!("unknown form '{raw}', expected donation or application"))
}

/// Parses a repeated `key=value` CLI argument.
pub(crate) fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("field name missing in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
