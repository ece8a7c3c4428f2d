//! HTTP and REST plumbing for the Invader payment services.
//!
//! A [`Router`] dispatches [`HttpRequest`]s to handlers; [`RestService`]s
//! publish JSON methods whose input (and optionally output) is checked
//! against an [`invader_validation::Schema`] before the handler runs.
//! [`Application`] serves a router with hyper.

pub mod application;
pub mod error;
pub mod http;
pub mod rest;
pub mod routing;

pub use application::{Application, ServerConfig};
pub use error::Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use rest::{RestHandlerFn, RestMethod, RestRequest, RestService};
pub use routing::{HandlerFn, Route, Router};

pub type Result<T> = std::result::Result<T, Error>;
