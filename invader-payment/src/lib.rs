//! Payment workflow for Invader storefronts
//!
//! A confirmation request names a *target* (`current_cart`) and a payment
//! mode. [`InvaderPaymentService`] resolves both, creates the payment token
//! and transaction, and leaves the acquirer call to the connector crates:
//!
//! ```text
//! storefront ─► REST method ─► InvaderPaymentService ─► PayableResolver
//!                                   │
//!                                   ├─► factory::prepare ─► PaymentStore
//!                                   └─► acquirer client (connector)
//!
//! acquirer ─► notification route ─► NotificationReceiver
//!                                   └─► TransactionStatusProvider (re-query)
//! ```
//!
//! Deployments plug in their own [`PayableResolver`] and [`PaymentStore`];
//! [`memory`] provides process-local versions of both.

pub mod error;
pub mod factory;
pub mod memory;
pub mod money;
pub mod notification;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod store;
pub mod types;

pub use error::*;
pub use factory::TransactionDraft;
pub use money::*;
pub use notification::NotificationReceiver;
pub use provider::*;
pub use resolver::PayableResolver;
pub use service::{InvaderPaymentService, PaymentAttempt};
pub use store::{PaymentStore, TransactionLookup};
pub use types::*;
