//! Schema validation for Invader REST services
//!
//! Services describe their accepted input as a [`Schema`]: a map of field
//! names to [`FieldRule`]s. Fragments compose, so a generic payment service
//! can publish the target validator and each acquirer extends it with its
//! own fields before the request is validated.
//!
//! # Examples
//!
//! ```
//! use invader_validation::{Coerce, FieldRule, Schema};
//! use serde_json::json;
//!
//! let target = Schema::new()
//!     .field("target", FieldRule::string().required().allowed(["current_cart"]))
//!     .field("payment_mode_id", FieldRule::integer().required().coerce(Coerce::Int));
//!
//! let pix = target.extend(Schema::new().field("tx_id", FieldRule::string().required()));
//!
//! let document = json!({"target": "current_cart", "payment_mode_id": "4", "tx_id": "abc"});
//! let normalized = pix.validate(&document).unwrap();
//! assert_eq!(normalized["payment_mode_id"], json!(4));
//!
//! let errors = pix.validate(&json!({"target": "other_cart"})).unwrap_err();
//! assert!(errors.has("target", "allowed"));
//! assert!(errors.has("tx_id", "required"));
//! ```

mod errors;
mod schema;
mod validator;

pub use errors::*;
pub use schema::*;
