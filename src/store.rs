use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{AbortHandle, Abortable};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::client::{ApiClient, ApiError};
use crate::records::Record;
use crate::view::{RenderedPage, TableView};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the collection.
    Applied { records: usize },
    /// A newer fetch was issued before this one finished; its result was
    /// dropped.
    Stale,
    /// The store was closed; nothing was applied.
    Closed,
}

/// Callback a successful mutation uses to ask for a re-fetch.
#[derive(Clone)]
pub struct RefreshHook(Arc<dyn Fn() + Send + Sync>);

impl RefreshHook {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn fire(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for RefreshHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshHook")
    }
}

struct StoreState<R> {
    records: Vec<R>,
    latest_seq: u64,
    in_flight: Option<(u64, AbortHandle)>,
    closed: bool,
    last_error: Option<String>,
}

#[derive(Default)]
struct RefreshSignal {
    pending: AtomicU64,
    notify: Notify,
}

/// The in-memory copy of one backend collection.
///
/// Each fetch is a single GET tagged with a sequence number. Only the
/// response to the newest request may replace the rows; older responses are
/// dropped, and a superseded request is aborted outright. A failed fetch
/// keeps the last-known-good rows.
pub struct RemoteCollectionStore<R: Record> {
    client: ApiClient,
    state: Arc<Mutex<StoreState<R>>>,
    refresh: Arc<RefreshSignal>,
}

impl<R: Record> Clone for RemoteCollectionStore<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            state: Arc::clone(&self.state),
            refresh: Arc::clone(&self.refresh),
        }
    }
}

impl<R: Record> RemoteCollectionStore<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(StoreState {
                records: Vec::new(),
                latest_seq: 0,
                in_flight: None,
                closed: false,
                last_error: None,
            })),
            refresh: Arc::new(RefreshSignal::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<R>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, ApiError> {
        let (handle, registration) = AbortHandle::new_pair();
        let seq = {
            let mut state = self.lock();
            if state.closed {
                return Ok(FetchOutcome::Closed);
            }
            state.latest_seq += 1;
            let seq = state.latest_seq;
            if let Some((previous, old)) = state.in_flight.replace((seq, handle)) {
                debug!(kind = %R::KIND, previous, seq, "aborting superseded fetch");
                old.abort();
            }
            seq
        };

        let path = R::KIND.collection_path();
        let result = Abortable::new(self.client.get::<Vec<R>>(path), registration).await;

        let mut state = self.lock();
        if matches!(state.in_flight, Some((s, _)) if s == seq) {
            state.in_flight = None;
        }
        if state.closed {
            debug!(kind = %R::KIND, seq, "store closed, dropping response");
            return Ok(FetchOutcome::Closed);
        }
        let Ok(result) = result else {
            return Ok(FetchOutcome::Stale);
        };
        if seq < state.latest_seq {
            debug!(kind = %R::KIND, seq, latest = state.latest_seq, "dropping stale response");
            return Ok(FetchOutcome::Stale);
        }

        match result.and_then(validate_all) {
            Ok(records) => {
                let count = records.len();
                state.records = records;
                state.last_error = None;
                debug!(kind = %R::KIND, seq, count, "collection replaced");
                Ok(FetchOutcome::Applied { records: count })
            }
            Err(e) => {
                warn!(kind = %R::KIND, error = %e, "fetch failed, keeping previous rows");
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Detaches the store from its view: the in-flight fetch is aborted and
    /// any response still on its way is ignored.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.records.clear();
        if let Some((seq, handle)) = state.in_flight.take() {
            debug!(kind = %R::KIND, seq, "aborting fetch on close");
            handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn records(&self) -> Vec<R> {
        self.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn render(&self, view: &mut TableView) -> RenderedPage<R> {
        let state = self.lock();
        view.render(&state.records)
    }

    pub fn refresh_hook(&self) -> RefreshHook {
        let signal = Arc::clone(&self.refresh);
        RefreshHook::new(move || {
            signal.pending.fetch_add(1, Ordering::SeqCst);
            signal.notify.notify_one();
        })
    }

    /// Consumes pending refresh requests; true if there were any.
    pub fn take_refresh_request(&self) -> bool {
        self.refresh.pending.swap(0, Ordering::SeqCst) > 0
    }

    /// Waits until a refresh has been requested through the hook.
    pub async fn wait_for_refresh(&self) {
        loop {
            if self.take_refresh_request() {
                return;
            }
            self.refresh.notify.notified().await;
        }
    }
}

fn validate_all<R: Record>(records: Vec<R>) -> Result<Vec<R>, ApiError> {
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}
