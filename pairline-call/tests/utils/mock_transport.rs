use async_trait::async_trait;
use pairline_call::{LocalStream, MediaError, PeerTransport, TransportEvent, TransportFactory};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Recording peer transport. Descriptions and candidates are stored
/// verbatim for assertions; tests drive connectivity by emitting events
/// through the session's channel, the way a real platform transport would.
pub struct MockTransport {
    label: String,
    local_description: Mutex<Option<String>>,
    remote_description: Mutex<Option<String>>,
    applied_candidates: Mutex<Vec<String>>,
    closed: AtomicBool,
    fail_create_offer: AtomicBool,
    fail_add_candidate: AtomicBool,
    events: mpsc::Sender<TransportEvent>,
}

impl MockTransport {
    fn new(label: String, fail_create_offer: bool, events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            label,
            local_description: Mutex::new(None),
            remote_description: Mutex::new(None),
            applied_candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_create_offer: AtomicBool::new(fail_create_offer),
            fail_add_candidate: AtomicBool::new(false),
            events,
        }
    }

    pub fn local_description(&self) -> Option<String> {
        self.local_description.lock().unwrap().clone()
    }

    pub fn remote_description(&self) -> Option<String> {
        self.remote_description.lock().unwrap().clone()
    }

    pub fn applied_candidates(&self) -> Vec<String> {
        self.applied_candidates.lock().unwrap().clone()
    }

    pub fn set_fail_add_candidate(&self, fail: bool) {
        self.fail_add_candidate.store(fail, Ordering::SeqCst);
    }

    /// Report a locally generated connectivity candidate.
    pub async fn emit_candidate(&self, candidate: &str) {
        let _ = self
            .events
            .send(TransportEvent::CandidateGenerated(candidate.to_string()))
            .await;
    }

    /// Report that a usable media path is up.
    pub async fn emit_ready(&self) {
        let _ = self.events.send(TransportEvent::Ready).await;
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self) -> Result<String, MediaError> {
        if self.fail_create_offer.load(Ordering::SeqCst) {
            return Err(MediaError::Transport("offer refused by test".to_string()));
        }
        Ok(format!("offer-from-{}", self.label))
    }

    async fn create_answer(&self) -> Result<String, MediaError> {
        Ok(format!("answer-from-{}", self.label))
    }

    async fn set_local_description(&self, description: String) -> Result<(), MediaError> {
        *self.local_description.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: String) -> Result<(), MediaError> {
        *self.remote_description.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: String) -> Result<(), MediaError> {
        if self.fail_add_candidate.load(Ordering::SeqCst) {
            return Err(MediaError::Transport("candidate refused by test".to_string()));
        }
        self.applied_candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockTransportFactory {
    label: String,
    fail_offers: AtomicBool,
    created: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportFactory {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            fail_offers: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Every transport created from now on refuses to produce an offer.
    pub fn fail_offers(&self) {
        self.fail_offers.store(true, Ordering::SeqCst);
    }

    /// The transport built for the session under test.
    pub fn transport(&self) -> Arc<MockTransport> {
        self.created
            .lock()
            .unwrap()
            .first()
            .cloned()
            .expect("no transport created yet")
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(
        &self,
        _local_stream: Arc<dyn LocalStream>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Arc<dyn PeerTransport> {
        let transport = Arc::new(MockTransport::new(
            self.label.clone(),
            self.fail_offers.load(Ordering::SeqCst),
            events,
        ));
        self.created.lock().unwrap().push(transport.clone());
        transport
    }
}
