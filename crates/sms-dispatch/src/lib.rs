//! Bulk SMS/MMS dispatch building blocks.
//!
//! Provides request validation, dispatch configuration, the orchestrator that
//! signs once, uploads an optional attachment and fans sends out under a
//! concurrency bound, plus the per-recipient report and cancellation handle.
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sms_dispatch::{parse_receivers_field, DispatchRequest, DispatchRequestLimits};
//!
//! let receivers = parse_receivers_field(r#"["010-1111-2222", "01033334444"]"#)?;
//! let request = DispatchRequest::new(
//!     "안내문자",
//!     receivers,
//!     None,
//!     DispatchRequestLimits::default(),
//! )?;
//! assert_eq!(request.recipients()[0].as_str(), "01011112222");
//! assert_eq!(request.recipients().len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod dispatch_cancellation;
pub mod dispatch_config;
pub mod dispatch_error;
pub mod dispatch_orchestrator;
pub mod dispatch_report;
pub mod dispatch_request;
pub mod recipient_selection;

pub use dispatch_cancellation::*;
pub use dispatch_config::*;
pub use dispatch_error::*;
pub use dispatch_orchestrator::*;
pub use dispatch_report::*;
pub use dispatch_request::*;
pub use recipient_selection::*;
