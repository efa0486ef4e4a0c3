use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use orebook_core::{Company, FactSource, FetchError, RawFieldMap, SourceId};

/// In-memory collaborator for deterministic offline tests.
///
/// Results are staged per company id and consumed in order, one per fetch
/// call, so retry behavior can be scripted (failures first, success last).
/// An exhausted or unstaged company yields a 404.
pub struct FixtureSource {
    id: SourceId,
    priority: u8,
    scripted: Mutex<HashMap<i64, VecDeque<Result<RawFieldMap, FetchError>>>>,
    calls: AtomicUsize,
}

impl FixtureSource {
    pub fn new(id: SourceId, priority: u8) -> Self {
        Self {
            id,
            priority,
            scripted: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue the next fetch result for a company.
    ///
    /// # Panics
    /// Panics if the script mutex is poisoned.
    pub fn stage(&self, company_id: i64, result: Result<RawFieldMap, FetchError>) {
        self.scripted
            .lock()
            .expect("fixture mutex poisoned")
            .entry(company_id)
            .or_default()
            .push_back(result);
    }

    /// Total fetch calls observed, for attempt-count assertions.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FactSource for FixtureSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn fetch<'a>(
        &'a self,
        company: &'a Company,
    ) -> Pin<Box<dyn Future<Output = Result<RawFieldMap, FetchError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .scripted
            .lock()
            .expect("fixture mutex poisoned")
            .get_mut(&company.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(FetchError::Status(404)));
        Box::pin(async move { next })
    }
}
