#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use safe_outputs::error::PlatformError;
use safe_outputs::operation::ResourceRef;
use safe_outputs::platform::{PlatformClient, PlatformFuture, PlatformRequest, PlatformResponse};

/// In-memory platform. Created issues and pull requests get consecutive
/// numbers starting at `first_number`; internal ids are `number + 10_000`.
/// Failures can be queued per request name.
pub struct FakePlatform {
    calls: Mutex<Vec<PlatformRequest>>,
    failures: Mutex<HashMap<&'static str, VecDeque<PlatformError>>>,
    next_number: AtomicU64,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::starting_at(100)
    }

    pub fn starting_at(first_number: u64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            next_number: AtomicU64::new(first_number),
        }
    }

    pub fn fail_next(&self, request: &'static str, error: PlatformError) {
        self.failures
            .lock()
            .unwrap()
            .entry(request)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<PlatformRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(PlatformRequest::name).collect()
    }

    fn answer(&self, request: &PlatformRequest) -> Result<PlatformResponse, PlatformError> {
        self.calls.lock().unwrap().push(request.clone());
        let queued = self
            .failures
            .lock()
            .unwrap()
            .get_mut(request.name())
            .and_then(VecDeque::pop_front);
        if let Some(err) = queued {
            return Err(err);
        }

        let resource = |number: u64| {
            let mut r = ResourceRef::new(request.repository().clone(), number);
            r.id = Some(number + 10_000);
            r.url = Some(format!("https://github.com/{}/issues/{number}", request.repository()));
            PlatformResponse::resource(r)
        };
        Ok(match request {
            PlatformRequest::CreateIssue { .. } | PlatformRequest::CreatePullRequest { .. } => {
                resource(self.next_number.fetch_add(1, Ordering::SeqCst))
            }
            PlatformRequest::CreateComment { number, .. }
            | PlatformRequest::GetIssue { number, .. } => resource(*number),
            _ => PlatformResponse::empty(),
        })
    }
}

impl PlatformClient for FakePlatform {
    fn send<'a>(&'a self, request: &'a PlatformRequest) -> PlatformFuture<'a> {
        Box::pin(async move { self.answer(request) })
    }

    fn name(&self) -> &str {
        "fake"
    }
}
