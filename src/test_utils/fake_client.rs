use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Notify;

use crate::{HttpClient, HttpRequest, HttpResponse, TransportError};

struct Reply {
    result: Result<HttpResponse, TransportError>,
    gate: Option<Arc<Notify>>,
}

/// An [HttpClient] that answers each path with scripted replies, in order.
///
/// A reply can be held back behind a gate so that tests decide the order in
/// which concurrent requests resolve.
#[derive(Default)]
pub(crate) struct FakeClient {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&self, path: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_owned())
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn reply(&self, path: &str, response: HttpResponse) -> &Self {
        self.push(
            path,
            Reply {
                result: Ok(response),
                gate: None,
            },
        )
    }

    pub(crate) fn reply_json(&self, path: &str, status: StatusCode, body: Value) -> &Self {
        self.reply(path, HttpResponse::json(status, &body))
    }

    pub(crate) fn reply_when(
        &self,
        path: &str,
        response: HttpResponse,
        gate: Arc<Notify>,
    ) -> &Self {
        self.push(
            path,
            Reply {
                result: Ok(response),
                gate: Some(gate),
            },
        )
    }

    pub(crate) fn fail(&self, path: &str, error: TransportError) -> &Self {
        self.push(
            path,
            Reply {
                result: Err(error),
                gate: None,
            },
        )
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.path)
            .collect()
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front);
        self.requests.lock().unwrap().push(request.clone());

        let Some(reply) = reply else {
            return Err(TransportError::Connection(format!(
                "no reply scripted for {}",
                request.path
            )));
        };

        if let Some(gate) = reply.gate {
            gate.notified().await;
        }

        reply.result
    }
}
