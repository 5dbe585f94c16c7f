use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;

use super::{SheetLayout, SheetsBackend, StoreError};

/// Process-local spreadsheet used for development runs and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemorySheets {
    sheets: Arc<Mutex<IndexMap<String, Vec<Vec<String>>>>>,
}

impl InMemorySheets {
    /// Sheet titles in creation order.
    pub fn titles(&self) -> Vec<String> {
        match self.sheets.lock() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        }
    }

    /// Every row of a sheet, header included. Empty when the sheet does not exist.
    pub fn rows(&self, title: &str) -> Vec<Vec<String>> {
        let guard = match self.sheets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(title).cloned().unwrap_or_default()
    }

    /// Put a sheet in place with arbitrary contents, replacing any existing one.
    pub fn insert_sheet(&self, title: &str, rows: Vec<Vec<String>>) {
        let mut guard = match self.sheets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(title.to_string(), rows);
    }

    fn lock(&self) -> Result<MutexGuard<'_, IndexMap<String, Vec<Vec<String>>>>, StoreError> {
        self.sheets
            .lock()
            .map_err(|_| StoreError::Backend("in-memory sheets lock poisoned".to_string()))
    }
}

/// Sheet title of an A1 range such as `Donations!A:G`.
fn range_title(range: &str) -> Result<&str, StoreError> {
    range
        .split_once('!')
        .map(|(title, _)| title)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| StoreError::Backend(format!("Unable to parse range: {range}")))
}

#[async_trait]
impl SheetsBackend for InMemorySheets {
    async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.contains_key(layout.title) {
            return Err(StoreError::SheetExists(layout.title.to_string()));
        }
        guard.insert(layout.title.to_string(), vec![layout.header_row()]);
        Ok(())
    }

    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let title = range_title(range)?;
        let mut guard = self.lock()?;
        let sheet = guard
            .get_mut(title)
            .ok_or_else(|| StoreError::Backend(format!("Unable to parse range: {range}")))?;
        sheet.extend(rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DONATIONS;

    #[test]
    fn range_title_requires_sheet_prefix() {
        assert_eq!(range_title("Applications!A:N").expect("title"), "Applications");
        assert!(range_title("no-sheet-separator").is_err());
        assert!(range_title("!A:G").is_err());
    }

    #[tokio::test]
    async fn append_to_unknown_sheet_fails() {
        let sheets = InMemorySheets::default();
        let result = sheets
            .append_values("Donations!A:G", vec![vec!["x".to_string()]])
            .await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn created_sheet_starts_with_header() {
        let sheets = InMemorySheets::default();
        sheets.create_sheet(&DONATIONS).await.expect("created");

        assert_eq!(sheets.rows("Donations"), vec![DONATIONS.header_row()]);
        match sheets.create_sheet(&DONATIONS).await {
            Err(StoreError::SheetExists(title)) => assert_eq!(title, "Donations"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
