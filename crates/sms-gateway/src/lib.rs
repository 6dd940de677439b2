//! Messaging gateway client building blocks.
//!
//! Provides HMAC credential signing, wire payload types, the `GatewayClient`
//! trait used by dispatch orchestration, and a reqwest-backed implementation
//! with per-call timeouts and structured failure classification.

pub mod gateway_client;
pub mod gateway_contract;
pub mod gateway_credentials;
pub mod gateway_error;

pub use gateway_client::*;
pub use gateway_contract::*;
pub use gateway_credentials::*;
pub use gateway_error::*;
