//! Credit ledger client SDK.
//!
//! Services that gate their own work on credits use this crate to charge
//! accounts through the ledger service's `/v1/usage/consume` endpoint.
//! Dashboards holding a user token can also read balances and history.
//!
//! # Example
//!
//! ```no_run
//! use ledger_client::{ClientOptions, LedgerClient};
//! use ledger_core::{AccountId, Metadata};
//!
//! # async fn example() -> Result<(), ledger_client::ClientError> {
//! let client = LedgerClient::with_options(
//!     "http://ledger.internal:8080",
//!     "your-service-api-key",
//!     ClientOptions::with_service_name("chat"),
//! )?;
//!
//! let account = AccountId::generate();
//! let response = client
//!     .consume(&account, 5, "chat message", Metadata::new().with("invocation_id", "inv-42"))
//!     .await?;
//!
//! println!("New balance: {} credits", response.balance);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, LedgerClient};
pub use error::ClientError;
pub use types::*;
