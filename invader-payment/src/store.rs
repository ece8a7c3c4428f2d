//! Persistence seam for payment records

use crate::error::PaymentResult;
use crate::factory::TransactionDraft;
use crate::types::{PaymentMode, PaymentToken, PaymentTransaction};
use async_trait::async_trait;

/// Key used to find the transaction a notification is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLookup {
    /// Id assigned by the acquirer (PagSeguro charge id)
    AcquirerReference(String),
    /// Correlation id chosen by the storefront (PIX txid)
    TxId(String),
}

impl std::fmt::Display for TransactionLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcquirerReference(reference) => write!(f, "acquirer_reference={}", reference),
            Self::TxId(tx_id) => write!(f, "tx_id={}", tx_id),
        }
    }
}

/// Storage for payment modes, tokens and transactions
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Payment mode by id; `NotFound` when unknown
    async fn payment_mode(&self, id: i64) -> PaymentResult<PaymentMode>;

    /// Persist a token, returning it with its assigned id
    async fn create_token(&self, token: PaymentToken) -> PaymentResult<PaymentToken>;

    /// Persist a complete draft as a new `Draft` transaction
    async fn create_transaction(&self, draft: TransactionDraft) -> PaymentResult<PaymentTransaction>;

    async fn update_transaction(&self, transaction: &PaymentTransaction) -> PaymentResult<()>;

    async fn transaction(&self, id: i64) -> PaymentResult<PaymentTransaction>;

    async fn search_transactions(
        &self,
        lookup: &TransactionLookup,
    ) -> PaymentResult<Vec<PaymentTransaction>>;
}
