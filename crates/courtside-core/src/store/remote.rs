// Hosted match collection over HTTP.
//
// `GET {base}/matches` returns the collection as a JSON array of raw match
// documents. `GET {base}/matches/stream` is a Server-Sent-Events stream whose
// messages each carry the full collection. Reconnecting a dropped stream is
// left to `reqwest-eventsource`.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use tracing::{debug, warn};

use super::{Delivery, MatchStore, Subscription, SnapshotCallback};
use crate::error::{Result, StoreError};
use crate::model::{decode_snapshot, Match, MatchRecord};

/// SSE event names that carry a snapshot. Unnamed events arrive as
/// "message".
const SNAPSHOT_EVENTS: [&str; 2] = ["message", "snapshot"];

#[derive(Clone)]
pub struct HttpMatchStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMatchStore {
    /// Create a client for the collection rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::Misconfigured(format!(
                "remote_url must be an http(s) URL, got `{base_url}`"
            )));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn collection_url(&self) -> String {
        format!("{}/matches", self.base_url)
    }

    pub fn stream_url(&self) -> String {
        format!("{}/matches/stream", self.base_url)
    }
}

/// Parse one snapshot body (a JSON array of match documents).
pub fn parse_snapshot(body: &str) -> Result<Vec<Match>> {
    let records: Vec<MatchRecord> = serde_json::from_str(body)?;
    let mut matches = decode_snapshot(records);
    matches.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(matches)
}

#[async_trait]
impl MatchStore for HttpMatchStore {
    async fn fetch_all(&self) -> Result<Vec<Match>> {
        let url = self.collection_url();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus { url, status });
        }

        let body = response
            .text()
            .await
            .map_err(|source| StoreError::Http {
                url: url.clone(),
                source,
            })?;
        parse_snapshot(&body)
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        let store = self.clone();

        Subscription::spawn(callback, move |mut delivery| async move {
            if !delivery.deliver(store.fetch_all().await) {
                return;
            }

            let url = store.stream_url();
            let mut es = match store.http.get(&url).eventsource() {
                Ok(es) => es,
                Err(e) => {
                    delivery.deliver(Err(StoreError::Stream(format!(
                        "failed to open event stream {url}: {e}"
                    ))));
                    return;
                }
            };

            while let Some(event) = es.next().await {
                if !dispatch(event, &mut delivery, &url) {
                    break;
                }
            }

            es.close();
        })
    }
}

/// Handle one item from the event stream. Returns `false` once the
/// subscriber has gone away.
fn dispatch(
    event: std::result::Result<Event, reqwest_eventsource::Error>,
    delivery: &mut Delivery,
    url: &str,
) -> bool {
    match event {
        Ok(Event::Open) => {
            debug!("Match stream opened at {url}");
            true
        }
        Ok(Event::Message(msg)) => {
            if !SNAPSHOT_EVENTS.contains(&msg.event.as_str()) {
                debug!("Ignoring match stream event `{}`", msg.event);
                return true;
            }
            delivery.deliver(parse_snapshot(&msg.data))
        }
        Err(reqwest_eventsource::Error::StreamEnded) => {
            debug!("Match stream ended, waiting for reconnect");
            true
        }
        Err(e) => {
            warn!("Match stream error from {url}: {e}");
            delivery.deliver(Err(StoreError::Stream(e.to_string())))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
