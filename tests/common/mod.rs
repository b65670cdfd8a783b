#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use vendproxy::application::flow::PaymentFlowController;
use vendproxy::application::gateway::GatewayClient;
use vendproxy::domain::payload::{GatewayResponse, PayloadKind};
use vendproxy::domain::ports::{Endpoint, GatewayTransport, TransportReply};
use vendproxy::domain::signature::{sign, verify_fields};
use vendproxy::domain::terminal::{SigningKey, TerminalBinding};
use vendproxy::error::{GatewayError, Result};
use vendproxy::infrastructure::in_memory::{InMemorySessionStore, InMemoryTerminalRegistry};

pub const ORIGIN: &str = "https://shop.vendhq.com";
pub const REGISTER_ID: &str = "0afa8de1-147c-11e8-edec-2b197906d816";
pub const MERCHANT_ID: &str = "30190000";
pub const DEVICE_TOKEN: &str = "01SUCCES";
pub const TERMINAL_KEY: &str = "szUb4YwzQNXn";

enum Scripted {
    Reply(TransportReply),
    Unavailable { timed_out: bool },
}

/// Gateway transport that replays scripted replies and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<(Endpoint, serde_json::Value)>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a 200 reply carrying `response` signed with `key`.
    pub fn reply_signed(&self, mut response: GatewayResponse, key: &str) -> &Self {
        response.signature = sign(&response, key).unwrap();
        self.reply_raw(200, serde_json::to_vec(&response).unwrap())
    }

    pub fn reply_raw(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(TransportReply {
                status,
                body: body.into(),
            }));
        self
    }

    pub fn fail(&self, timed_out: bool) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Unavailable { timed_out });
        self
    }

    pub fn requests(&self) -> Vec<(Endpoint, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn post(&self, endpoint: Endpoint, body: &serde_json::Value) -> Result<TransportReply> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint, body.clone()));
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Unavailable { timed_out }) => Err(GatewayError::GatewayUnavailable {
                endpoint: endpoint.to_string(),
                reason: "scripted failure".to_string(),
                timed_out,
            }),
            None => panic!("unexpected gateway call to {endpoint}"),
        }
    }
}

/// A controller over in-memory stores, plus handles to inspect them.
pub struct Harness {
    pub controller: PaymentFlowController,
    pub registry: InMemoryTerminalRegistry,
    pub sessions: InMemorySessionStore,
    pub transport: ScriptedTransport,
}

pub fn harness() -> Harness {
    let registry = InMemoryTerminalRegistry::new();
    let sessions = InMemorySessionStore::new();
    let transport = ScriptedTransport::new();
    let controller = PaymentFlowController::new(
        Box::new(registry.clone()),
        Box::new(sessions.clone()),
        GatewayClient::new(Box::new(transport.clone()), "1.1"),
    );
    Harness {
        controller,
        registry,
        sessions,
        transport,
    }
}

pub fn bound_terminal() -> TerminalBinding {
    TerminalBinding::new(
        ORIGIN,
        REGISTER_ID,
        "01SUCCES-4fa1c2d3e5",
        MERCHANT_ID,
        SigningKey::new(TERMINAL_KEY),
    )
}

pub fn response(code: &str, purchase_number: &str) -> GatewayResponse {
    GatewayResponse {
        purchase_number: purchase_number.to_string(),
        status: if code.starts_with('S') { "SUCCESS" } else { "FAIL" }.to_string(),
        code: code.to_string(),
        message: String::new(),
        ..Default::default()
    }
}

/// Checks an outgoing request body's `signature` against `key`.
pub fn request_is_signed(kind: PayloadKind, body: &serde_json::Value, key: &str) -> bool {
    let object = body.as_object().expect("request body is a JSON object");
    let signature = object["signature"].as_str().unwrap_or_default();
    let fields = object
        .iter()
        .filter_map(|(name, value)| value.as_str().map(|v| (name.as_str(), v)));
    verify_fields(kind, fields, signature, key)
}
