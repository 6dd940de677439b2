//! HTTP boundary for bulk SMS/MMS dispatch.
pub mod send_sms_server;

pub use send_sms_server::*;
