//! Acquirer notification handling

use crate::error::{PaymentError, PaymentResult};
use crate::provider::TransactionStatusProvider;
use crate::resolver::PayableResolver;
use crate::store::{PaymentStore, TransactionLookup};
use crate::types::PaymentTransaction;
use std::sync::Arc;

/// Applies acquirer notifications to transactions.
///
/// The notification only identifies the transaction. Its state is always
/// re-read from the acquirer, so repeated or forged notifications cannot
/// move a transaction anywhere the acquirer does not report.
#[derive(Clone)]
pub struct NotificationReceiver {
    store: Arc<dyn PaymentStore>,
    resolver: Arc<dyn PayableResolver>,
    provider: Arc<dyn TransactionStatusProvider>,
}

impl NotificationReceiver {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        resolver: Arc<dyn PayableResolver>,
        provider: Arc<dyn TransactionStatusProvider>,
    ) -> Self {
        Self {
            store,
            resolver,
            provider,
        }
    }

    /// Process one notification. Returns `false` on any failure; the
    /// cause is logged, never returned.
    pub async fn receive(&self, lookup: TransactionLookup) -> bool {
        match self.process(&lookup).await {
            Ok(transaction) => {
                invader_log::info!(
                    "{} notification processed for {}", self.provider.name(), lookup;
                    "transaction_id" => transaction.id,
                    "state" => transaction.state.as_str()
                );
                true
            }
            Err(err) => {
                invader_log::error!("{} notification for {} failed: {}", self.provider.name(), lookup, err);
                false
            }
        }
    }

    async fn process(&self, lookup: &TransactionLookup) -> PaymentResult<PaymentTransaction> {
        let mut matches = self.store.search_transactions(lookup).await?;
        let mut transaction = match matches.len() {
            1 => matches.remove(0),
            0 => return Err(PaymentError::NotFound(format!("no transaction with {}", lookup))),
            n => {
                return Err(PaymentError::Unhandled(format!(
                    "{} transactions with {}",
                    n, lookup
                )));
            }
        };

        let update = self.provider.check_transaction(&transaction).await?;
        let reported = update.state;
        if transaction.set_state(update.state, update.message) {
            self.store.update_transaction(&transaction).await?;
        }

        // Retried on every notification confirming the payment until the
        // payable has been told
        if reported.is_success() && transaction.awaits_acceptance() {
            self.notify_payable(&transaction).await?;
            transaction.accepted_notified = true;
            self.store.update_transaction(&transaction).await?;
        }
        Ok(transaction)
    }

    async fn notify_payable(&self, transaction: &PaymentTransaction) -> PaymentResult<()> {
        match self.resolver.find_payable_from_transaction(transaction).await {
            Ok(payable) => self.resolver.payment_accepted(&payable, transaction).await,
            Err(PaymentError::NotImplemented(_)) => {
                invader_log::warn!(
                    "no payable lookup for transactions, {} not reported as paid",
                    transaction.reference
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
