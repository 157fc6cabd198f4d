use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::actions::{ActionClient, TransportError};
use crate::models::{AccountCredentials, AccountGroup, ActionResponse};

type Responder = dyn Fn(usize, &Value) -> Result<ActionResponse, TransportError> + Send + Sync;

/// Scripted action server. Records every request and the peak number of
/// requests in flight.
pub struct MockClient {
    responder: Box<Responder>,
    latency: Duration,
    calls: Mutex<Vec<(String, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockClient {
    pub fn new(
        responder: impl Fn(usize, &Value) -> Result<ActionResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn always(response: ActionResponse) -> Self {
        Self::new(move |_, _| Ok(response.clone()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ActionClient for MockClient {
    async fn send(
        &self,
        endpoint: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<ActionResponse, TransportError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((endpoint.to_string(), body.clone()));
            calls.len() - 1
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.in_flight.fetch_sub(1, Ordering::SeqCst);
                    return Err(TransportError::Cancelled);
                }
                _ = tokio::time::sleep(self.latency) => {}
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.responder)(call, &body)
    }
}

pub fn group(n: usize) -> AccountGroup {
    AccountGroup::new(
        "test",
        (0..n)
            .map(|i| AccountCredentials::new(format!("token-{}", i), format!("http://proxy-{}:8000", i)))
            .collect(),
    )
}

pub fn shared(client: MockClient) -> (Arc<MockClient>, Arc<dyn ActionClient>) {
    let client = Arc::new(client);
    let dyn_client: Arc<dyn ActionClient> = client.clone();
    (client, dyn_client)
}
