// Invader - storefront payment services for Brazilian acquirers
//
// This library bundles the REST plumbing, the payment workflow and the
// acquirer connectors behind one dependency.

// Re-export core functionality
pub use invader_core::*;

pub use invader_config;
pub use invader_log;
pub use invader_payment;
pub use invader_validation;

#[cfg(feature = "bb")]
pub use invader_payment_bb;

#[cfg(feature = "pagseguro")]
pub use invader_payment_pagseguro;

#[cfg(all(feature = "bb", feature = "pagseguro"))]
pub mod sandbox;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application, Error, HttpMethod, HttpRequest, HttpResponse, RestMethod, RestRequest,
        RestService, Router, ServerConfig,
    };
    pub use invader_config::{ConfigManager, Validate};
    pub use invader_payment::{
        InvaderPaymentService, PayableResolver, PaymentError, PaymentStore,
        TransactionStatusProvider,
    };
    pub use invader_validation::{FieldRule, Schema};
}
