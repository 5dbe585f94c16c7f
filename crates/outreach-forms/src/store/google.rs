use async_trait::async_trait;
use google_sheets4::api::{
    AddSheetRequest, BatchUpdateSpreadsheetRequest, CellData, ExtendedValue, GridCoordinate,
    Request, RowData, Scope, SheetProperties, UpdateCellsRequest, ValueRange,
};
use google_sheets4::common::FieldMask;
use google_sheets4::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_sheets4::hyper_util::client::legacy::connect::HttpConnector;
use google_sheets4::hyper_util::client::legacy::Client;
use google_sheets4::hyper_util::rt::TokioExecutor;
use google_sheets4::{yup_oauth2, Sheets};
use serde_json::{json, Value};

use super::{SheetLayout, SheetsBackend, StoreError};
use crate::config::{SheetsConfig, SheetsCredentials};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Cell values are stored verbatim; submitted text never becomes a formula.
const VALUE_INPUT_OPTION: &str = "RAW";

/// Production backend type produced by [`GoogleSheetsBackend::connect`].
pub type GoogleSheets = GoogleSheetsBackend<HttpsConnector<HttpConnector>>;

/// Thin wrapper around the generated google-sheets4 hub scoped to one spreadsheet.
pub struct GoogleSheetsBackend<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
    spreadsheet_id: String,
}

impl<C> GoogleSheetsBackend<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            hub,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn map_error<E: std::fmt::Display>(err: E) -> StoreError {
        StoreError::Backend(err.to_string())
    }

    fn value_range(rows: Vec<Vec<String>>) -> ValueRange {
        ValueRange {
            values: Some(
                rows.into_iter()
                    .map(|row| row.into_iter().map(Value::String).collect())
                    .collect(),
            ),
            ..ValueRange::default()
        }
    }
}

impl GoogleSheetsBackend<HttpsConnector<HttpConnector>> {
    /// Authenticate with the configured service account and build the HTTPS hub.
    pub async fn connect(config: &SheetsConfig) -> Result<Self, StoreError> {
        let spreadsheet_id = config.spreadsheet_id.clone().ok_or_else(|| {
            StoreError::Credentials("GOOGLE_SHEETS_SPREADSHEET_ID is not set".to_string())
        })?;
        let credentials = config.credentials.as_ref().ok_or_else(|| {
            StoreError::Credentials("service account credentials are not set".to_string())
        })?;

        let key = match credentials {
            SheetsCredentials::KeyFile(path) => yup_oauth2::read_service_account_key(path)
                .await
                .map_err(|err| {
                    StoreError::Credentials(format!("reading {}: {err}", path.display()))
                })?,
            SheetsCredentials::Inline {
                client_email,
                private_key,
            } => {
                let document = json!({
                    "type": "service_account",
                    "client_email": client_email,
                    "private_key": private_key,
                    "token_uri": TOKEN_URI,
                });
                yup_oauth2::parse_service_account_key(document.to_string())
                    .map_err(|err| StoreError::Credentials(err.to_string()))?
            }
        };

        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|err| StoreError::Credentials(err.to_string()))?;

        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| StoreError::Backend(format!("loading TLS roots: {err}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self::new(Sheets::new(client, auth), spreadsheet_id))
    }
}

impl<C> std::fmt::Debug for GoogleSheetsBackend<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsBackend")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> SheetsBackend for GoogleSheetsBackend<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
        let (_, spreadsheet) = self
            .hub
            .spreadsheets()
            .get(&self.spreadsheet_id)
            .param("fields", "sheets.properties.title")
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(Self::map_error)?;

        Ok(spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| sheet.properties.and_then(|properties| properties.title))
            .collect())
    }

    async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
        let header = RowData {
            values: Some(
                layout
                    .headers
                    .iter()
                    .map(|header| CellData {
                        user_entered_value: Some(ExtendedValue {
                            string_value: Some(header.to_string()),
                            ..ExtendedValue::default()
                        }),
                        ..CellData::default()
                    })
                    .collect(),
            ),
        };

        // A batch update applies all of its requests or none, so the sheet never
        // exists without its header row.
        let request = BatchUpdateSpreadsheetRequest {
            requests: Some(vec![
                Request {
                    add_sheet: Some(AddSheetRequest {
                        properties: Some(SheetProperties {
                            sheet_id: Some(layout.sheet_id),
                            title: Some(layout.title.to_string()),
                            ..SheetProperties::default()
                        }),
                    }),
                    ..Request::default()
                },
                Request {
                    update_cells: Some(UpdateCellsRequest {
                        start: Some(GridCoordinate {
                            sheet_id: Some(layout.sheet_id),
                            row_index: Some(0),
                            column_index: Some(0),
                        }),
                        rows: Some(vec![header]),
                        fields: Some(FieldMask::new(&["userEnteredValue"])),
                        ..UpdateCellsRequest::default()
                    }),
                    ..Request::default()
                },
            ]),
            ..BatchUpdateSpreadsheetRequest::default()
        };

        let result = self
            .hub
            .spreadsheets()
            .batch_update(request, &self.spreadsheet_id)
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await;

        match result {
            Ok(_) => Ok(()),
            // The API answers a duplicate title with a 400 naming the existing sheet.
            Err(err) if err.to_string().contains("already exists") => {
                Err(StoreError::SheetExists(layout.title.to_string()))
            }
            Err(err) => Err(Self::map_error(err)),
        }
    }

    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        self.hub
            .spreadsheets()
            .values_append(Self::value_range(rows), &self.spreadsheet_id, range)
            .value_input_option(VALUE_INPUT_OPTION)
            .insert_data_option("INSERT_ROWS")
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(Self::map_error)?;
        Ok(())
    }
}
