//! Append-only spreadsheet store for accepted submissions.
//!
//! The pipeline only ever talks to [`AppendLog`]: make sure the sheets exist, then
//! append one ordered row per record. [`SheetStore`] implements that contract over
//! any [`SheetsBackend`] (Google Sheets in production, [`InMemorySheets`] otherwise).

pub mod google;
pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::forms::{ApplicationRecord, DonationRecord};

pub use google::{GoogleSheets, GoogleSheetsBackend};
pub use memory::InMemorySheets;

/// Fixed title and header row of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub title: &'static str,
    /// Grid id assigned on creation so the header lands in the same batch.
    pub sheet_id: i32,
    pub headers: &'static [&'static str],
}

pub const DONATIONS: SheetLayout = SheetLayout {
    title: "Donations",
    sheet_id: 710_001,
    headers: &[
        "Timestamp",
        "Name",
        "Email",
        "Sponsorship Tier",
        "Other Amount",
        "Monthly Sponsorship",
        "IP Address",
    ],
};

pub const APPLICATIONS: SheetLayout = SheetLayout {
    title: "Applications",
    sheet_id: 710_002,
    headers: &[
        "Timestamp",
        "Full Name",
        "Email",
        "Phone",
        "Address",
        "Adults",
        "Children",
        "Children Ages",
        "Monthly Income",
        "Income Source",
        "Government Assistance",
        "Need Description",
        "Intended Use",
        "IP Address",
    ],
};

/// Every sheet the store provisions, in creation order.
pub const SHEETS: [SheetLayout; 2] = [DONATIONS, APPLICATIONS];

impl SheetLayout {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Full column span used for appends, e.g. `Donations!A:G`.
    pub fn column_range(&self) -> String {
        format!("{}!A:{}", self.title, column_letter(self.width()))
    }

    pub fn header_row(&self) -> Vec<String> {
        self.headers.iter().map(|header| header.to_string()).collect()
    }
}

/// 1-based column index to A1 letters (1 -> A, 27 -> AA).
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A record that occupies exactly one row of its sheet.
///
/// Encoding only runs one way: records come from validation, never from rows.
///
/// ```compile_fail
/// use outreach_forms::forms::DonationRecord;
///
/// let row = vec![String::new(); 7];
/// let _ = DonationRecord::from_row(&row);
/// ```
pub trait SheetRecord {
    const LAYOUT: SheetLayout;

    /// Cell values in header order.
    fn to_row(&self) -> Vec<String>;
}

/// Failure talking to the backing spreadsheet.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sheet '{0}' already exists")]
    SheetExists(String),
    #[error("row for sheet '{sheet}' has {found} values, expected {expected}")]
    RowShape {
        sheet: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("sheets credentials rejected: {0}")]
    Credentials(String),
    #[error("sheets backend failed: {0}")]
    Backend(String),
}

/// Raw spreadsheet operations a backend has to provide.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    async fn sheet_titles(&self) -> Result<Vec<String>, StoreError>;

    /// Create the sheet with its header as row 1 in one atomic step, so no reader
    /// ever sees the sheet without its header. Must return
    /// [`StoreError::SheetExists`] when the title is taken.
    async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError>;

    /// Append rows after the last non-empty row of the table in `range`.
    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError>;
}

/// Narrow append-only log interface the submission handler depends on.
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Create any missing sheet together with its header row. Safe to repeat.
    async fn ensure_initialized(&self) -> Result<(), StoreError>;

    async fn append_row(&self, layout: &SheetLayout, values: Vec<String>)
        -> Result<(), StoreError>;

    async fn append_donation(&self, record: &DonationRecord) -> Result<(), StoreError> {
        self.append_row(&DonationRecord::LAYOUT, record.to_row())
            .await
    }

    async fn append_application(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        self.append_row(&ApplicationRecord::LAYOUT, record.to_row())
            .await
    }
}

/// Store client constructed once per process and shared across requests.
#[derive(Debug)]
pub struct SheetStore<B> {
    backend: B,
    initialized: AtomicBool,
    // Held for the whole list-and-create pass; appends wait on it until the
    // headers exist.
    init_lock: Mutex<()>,
}

impl<B> SheetStore<B>
where
    B: SheetsBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Caller must hold `init_lock`.
    async fn initialize(&self) -> Result<(), StoreError> {
        let existing = self.backend.sheet_titles().await?;
        debug!(?existing, "existing sheets");

        for layout in SHEETS.iter() {
            if existing.iter().any(|title| title == layout.title) {
                continue;
            }
            self.provision(layout).await?;
        }

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn provision(&self, layout: &SheetLayout) -> Result<(), StoreError> {
        match self.backend.create_sheet(layout).await {
            Ok(()) => {
                info!(sheet = layout.title, "sheet created with header row");
                Ok(())
            }
            // Another instance won the race; its header went in with the sheet.
            Err(StoreError::SheetExists(title)) => {
                warn!(sheet = %title, "sheet was created concurrently; continuing");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl<B> AppendLog for SheetStore<B>
where
    B: SheetsBackend,
{
    async fn ensure_initialized(&self) -> Result<(), StoreError> {
        let _guard = self.init_lock.lock().await;
        self.initialize().await
    }

    async fn append_row(
        &self,
        layout: &SheetLayout,
        values: Vec<String>,
    ) -> Result<(), StoreError> {
        if values.len() != layout.width() {
            return Err(StoreError::RowShape {
                sheet: layout.title,
                expected: layout.width(),
                found: values.len(),
            });
        }

        if !self.is_initialized() {
            let _guard = self.init_lock.lock().await;
            if !self.is_initialized() {
                self.initialize().await?;
            }
        }

        self.backend
            .append_values(&layout.column_range(), vec![values])
            .await?;
        debug!(sheet = layout.title, "row appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn layouts_expose_a1_ranges() {
        assert_eq!(DONATIONS.column_range(), "Donations!A:G");
        assert_eq!(APPLICATIONS.column_range(), "Applications!A:N");
        assert_ne!(DONATIONS.sheet_id, APPLICATIONS.sheet_id);
    }

    #[test]
    fn column_letters_roll_over() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
    }

    #[tokio::test]
    async fn ensure_initialized_is_idempotent() {
        let sheets = InMemorySheets::default();
        let store = SheetStore::new(sheets.clone());

        store.ensure_initialized().await.expect("first init");
        store.ensure_initialized().await.expect("second init");

        assert_eq!(sheets.titles(), vec!["Donations", "Applications"]);
        assert_eq!(sheets.rows("Donations"), vec![DONATIONS.header_row()]);
        assert_eq!(sheets.rows("Applications"), vec![APPLICATIONS.header_row()]);
        assert!(store.is_initialized());
    }

    #[tokio::test]
    async fn ensure_initialized_keeps_existing_sheets_untouched() {
        let sheets = InMemorySheets::default();
        sheets.insert_sheet("Donations", vec![vec!["legacy".to_string()]]);

        let store = SheetStore::new(sheets.clone());
        store.ensure_initialized().await.expect("init");

        assert_eq!(sheets.rows("Donations"), vec![vec!["legacy".to_string()]]);
        assert_eq!(sheets.rows("Applications"), vec![APPLICATIONS.header_row()]);
    }

    /// Reports no sheets even though they exist, like a second instance racing the first.
    #[derive(Debug, Clone, Default)]
    struct StaleListing {
        inner: InMemorySheets,
    }

    #[async_trait]
    impl SheetsBackend for StaleListing {
        async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }

        async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
            self.inner.create_sheet(layout).await
        }

        async fn append_values(
            &self,
            range: &str,
            rows: Vec<Vec<String>>,
        ) -> Result<(), StoreError> {
            self.inner.append_values(range, rows).await
        }
    }

    #[tokio::test]
    async fn create_conflict_from_another_instance_is_benign() {
        let backend = StaleListing::default();
        let first = SheetStore::new(backend.clone());
        let second = SheetStore::new(backend.clone());

        first.ensure_initialized().await.expect("first instance");
        second
            .ensure_initialized()
            .await
            .expect("conflict treated as success");

        assert_eq!(backend.inner.titles().len(), 2);
        assert_eq!(backend.inner.rows("Donations"), vec![DONATIONS.header_row()]);
    }

    /// Yields to the scheduler around every call, with a longer stall while
    /// creating Donations, so concurrent callers interleave.
    #[derive(Debug, Clone, Default)]
    struct Yielding {
        inner: InMemorySheets,
    }

    async fn yield_times(count: usize) {
        for _ in 0..count {
            tokio::task::yield_now().await;
        }
    }

    #[async_trait]
    impl SheetsBackend for Yielding {
        async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
            yield_times(2).await;
            let titles = self.inner.sheet_titles().await;
            yield_times(2).await;
            titles
        }

        async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
            let stall = if layout.title == "Donations" { 8 } else { 1 };
            yield_times(stall).await;
            let created = self.inner.create_sheet(layout).await;
            yield_times(stall).await;
            created
        }

        async fn append_values(
            &self,
            range: &str,
            rows: Vec<Vec<String>>,
        ) -> Result<(), StoreError> {
            yield_times(1).await;
            self.inner.append_values(range, rows).await
        }
    }

    fn donation_row(name: &str) -> Vec<String> {
        let mut row = vec![String::new(); DONATIONS.width()];
        row[1] = name.to_string();
        row
    }

    fn assert_header_then(rows: &[Vec<String>], mut names: Vec<&str>) {
        assert_eq!(rows[0], DONATIONS.header_row());
        let mut stored: Vec<&str> = rows[1..].iter().map(|row| row[1].as_str()).collect();
        stored.sort_unstable();
        names.sort_unstable();
        assert_eq!(stored, names);
    }

    #[tokio::test]
    async fn overlapping_first_appends_keep_every_row() {
        let backend = Yielding::default();
        let store = Arc::new(SheetStore::new(backend.clone()));

        let (first, second, third) = tokio::join!(
            store.append_row(&DONATIONS, donation_row("first")),
            store.append_row(&DONATIONS, donation_row("second")),
            store.append_row(&DONATIONS, donation_row("third")),
        );
        first.expect("first append");
        second.expect("second append");
        third.expect("third append");

        let rows = backend.inner.rows("Donations");
        assert_eq!(rows.len(), 4, "header plus three rows: {rows:?}");
        assert_header_then(&rows, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn overlapping_instances_keep_every_row() {
        let backend = Yielding::default();
        let first = SheetStore::new(backend.clone());
        let second = SheetStore::new(backend.clone());

        let (a, b) = tokio::join!(
            first.append_row(&DONATIONS, donation_row("from-a")),
            second.append_row(&DONATIONS, donation_row("from-b")),
        );
        a.expect("instance a");
        b.expect("instance b");

        let rows = backend.inner.rows("Donations");
        assert_eq!(rows.len(), 3, "header plus two rows: {rows:?}");
        assert_header_then(&rows, vec!["from-a", "from-b"]);
        assert_eq!(backend.inner.rows("Applications"), vec![APPLICATIONS.header_row()]);
    }

    #[tokio::test]
    async fn initialize_route_and_append_overlap_safely() {
        let backend = Yielding::default();
        let store = SheetStore::new(backend.clone());

        let (init, appended) = tokio::join!(
            store.ensure_initialized(),
            store.append_row(&DONATIONS, donation_row("during-init")),
        );
        init.expect("init");
        appended.expect("append");

        let rows = backend.inner.rows("Donations");
        assert_eq!(rows.len(), 2);
        assert_header_then(&rows, vec!["during-init"]);
    }

    #[derive(Debug, Default)]
    struct CountingBackend {
        inner: InMemorySheets,
        listings: AtomicUsize,
    }

    #[async_trait]
    impl SheetsBackend for CountingBackend {
        async fn sheet_titles(&self) -> Result<Vec<String>, StoreError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            self.inner.sheet_titles().await
        }

        async fn create_sheet(&self, layout: &SheetLayout) -> Result<(), StoreError> {
            self.inner.create_sheet(layout).await
        }

        async fn append_values(
            &self,
            range: &str,
            rows: Vec<Vec<String>>,
        ) -> Result<(), StoreError> {
            self.inner.append_values(range, rows).await
        }
    }

    #[tokio::test]
    async fn first_append_initializes_lazily_once() {
        let store = SheetStore::new(CountingBackend::default());
        let row = vec![String::new(); DONATIONS.width()];

        store
            .append_row(&DONATIONS, row.clone())
            .await
            .expect("first append");
        store.append_row(&DONATIONS, row).await.expect("second append");

        assert_eq!(store.backend().listings.load(Ordering::SeqCst), 1);
        assert_eq!(store.backend().inner.rows("Donations").len(), 3);
    }

    #[tokio::test]
    async fn append_row_rejects_wrong_width() {
        let sheets = InMemorySheets::default();
        let store = SheetStore::new(sheets.clone());

        match store
            .append_row(&APPLICATIONS, vec!["only".to_string()])
            .await
        {
            Err(StoreError::RowShape {
                sheet, expected, ..
            }) => {
                assert_eq!(sheet, "Applications");
                assert_eq!(expected, 14);
            }
            other => panic!("expected row shape error, got {other:?}"),
        }
        assert!(sheets.titles().is_empty(), "no initialization on bad rows");
    }
}
