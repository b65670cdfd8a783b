//! Application layer orchestrating gateway operations.
//!
//! `GatewayClient` speaks the gateway's POS API over a pluggable transport.
//! `PaymentFlowController` drives registration, payment, and refund flows
//! against the terminal registry and session store.

pub mod flow;
pub mod gateway;
