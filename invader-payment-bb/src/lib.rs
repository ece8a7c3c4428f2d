//! Banco do Brasil PIX acquirer for Invader payments
//!
//! [`BbPixService`] publishes `POST /payment_bacen_pix/confirm-payment-pix`,
//! which creates a PIX collection ("cobrança") for the storefront's payable
//! and answers with its QR code data, and `POST
//! /payment_bacen_pix/notification`, the BB webhook. Payment modes served
//! here must use an acquirer with provider `bacenpix`.

pub mod client;
pub mod config;
pub mod service;

pub use client::{BbPixClient, Collection, PROVIDER, TXID_REGEX, collection_state};
pub use config::BbConfig;
pub use service::BbPixService;
