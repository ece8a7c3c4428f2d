//! Payable resolution supplied by each deployment

use crate::error::PaymentResult;
use crate::types::{Payable, PaymentMode, PaymentTransaction};
use async_trait::async_trait;
use invader_core::RestRequest;
use invader_validation::Schema;
use serde_json::{Map, Value};

/// Locates the entity being paid for.
///
/// `target` is an opaque token from the storefront (`current_cart`) and is
/// always one of [`PayableResolver::allowed_targets`] by the time
/// [`PayableResolver::find_payable`] runs: the request has been validated
/// against the target schema, and its session headers travel with it.
#[async_trait]
pub trait PayableResolver: Send + Sync {
    /// Accepted values of the `target` parameter
    fn allowed_targets(&self) -> Vec<String>;

    /// Payable designated by `target`; `NotFound` when nothing matches
    async fn find_payable(&self, target: &str, request: &RestRequest) -> PaymentResult<Payable>;

    /// Payable a transaction was created for. Used on the webhook path,
    /// where only acquirer identifiers are known. Deployments without a
    /// webhook flow return `NotImplemented`.
    async fn find_payable_from_transaction(
        &self,
        transaction: &PaymentTransaction,
    ) -> PaymentResult<Payable>;

    /// Record the payment mode chosen for `payable`; setting the same mode
    /// twice is a no-op
    async fn set_payment_mode(&self, payable: &Payable, mode: &PaymentMode) -> PaymentResult<()>;

    /// Payment modes accepted by this deployment; empty means any
    fn restricted_payment_mode_ids(&self) -> Vec<i64> {
        Vec::new()
    }

    /// Add deployment-specific fields to the target schema
    fn extend_target_validator(&self, schema: Schema) -> Schema {
        schema
    }

    /// Extra keys merged into successful confirmation responses
    fn payment_success_response_data(
        &self,
        _payable: &Payable,
        _target: &str,
        _request: &RestRequest,
    ) -> Map<String, Value> {
        Map::new()
    }

    /// Called when a notification moves a transaction to an accepted state
    async fn payment_accepted(
        &self,
        _payable: &Payable,
        _transaction: &PaymentTransaction,
    ) -> PaymentResult<()> {
        Ok(())
    }
}
