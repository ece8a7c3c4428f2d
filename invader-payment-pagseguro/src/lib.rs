//! PagSeguro acquirer for Invader payments
//!
//! [`PagseguroService`] is mounted under `/payment_pagseguro`:
//!
//! | Route                          | Payment                               |
//! |--------------------------------|---------------------------------------|
//! | `POST confirm-payment`         | encrypted card, captured at once      |
//! | `POST confirm-payment-pix`     | PIX QR code of a PagSeguro order      |
//! | `POST confirm-payment-boleto`  | boleto document                       |
//! | `GET public-key`               | key used to encrypt cards client-side |
//!
//! [`PagseguroNotifications`] serves `POST /notification-url` at the root;
//! PagSeguro posts the id of the charge or order that changed and the
//! transaction is re-read from the API before anything is updated.

pub mod client;
pub mod config;
pub mod service;

pub use client::{Charge, Order, PROVIDER, PagseguroClient, charge_state};
pub use config::PagseguroConfig;
pub use service::{PagseguroNotifications, PagseguroService};
