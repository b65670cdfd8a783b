//! Domain types and ports: payloads and their signing, result-code
//! classification, terminal bindings, and the payment context.

pub mod outcome;
pub mod payload;
pub mod payment;
pub mod ports;
pub mod response_code;
pub mod signature;
pub mod terminal;
