// REST services: schema-validated JSON methods mounted under a usage prefix

use crate::{Error, HttpMethod, HttpRequest, HttpResponse, Route, Router};
use invader_validation::Schema;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Handler of a REST method: receives the validated input, returns the
/// JSON document to answer with.
pub type RestHandlerFn = Arc<
    dyn Fn(RestRequest) -> Pin<Box<dyn Future<Output = Result<Value, Error>> + Send>>
        + Send
        + Sync,
>;

/// Input handed to a REST handler
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// Normalized parameters (query string for GET, JSON body otherwise)
    pub params: Value,
    /// Request headers, names lowercased
    pub headers: HashMap<String, String>,
}

impl RestRequest {
    pub fn new(params: Value) -> Self {
        Self {
            params,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    pub fn i64_param(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(Value::as_i64)
    }
}

/// One routed method of a [`RestService`]
#[derive(Clone)]
pub struct RestMethod {
    pub method: HttpMethod,
    pub path: String,
    pub input: Schema,
    pub output: Option<Schema>,
    pub cors: Option<String>,
    pub handler: RestHandlerFn,
}

impl RestMethod {
    pub fn new<F, Fut>(method: HttpMethod, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RestRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self {
            method,
            path: path.into(),
            input: Schema::new(),
            output: None,
            cors: None,
            handler: Arc::new(move |request| Box::pin(handler(request))),
        }
    }

    pub fn get<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RestRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::GET, path, handler)
    }

    pub fn post<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RestRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::POST, path, handler)
    }

    pub fn input(mut self, schema: Schema) -> Self {
        self.input = schema;
        self
    }

    pub fn output(mut self, schema: Schema) -> Self {
        self.output = Some(schema);
        self
    }

    /// Answer cross-origin requests from `origin` (`*` for any)
    pub fn cors(mut self, origin: impl Into<String>) -> Self {
        self.cors = Some(origin.into());
        self
    }

    /// Validate the request, run the handler and check its output
    pub async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let params = match self.method {
            HttpMethod::GET | HttpMethod::DELETE => self.input.validate_params(&request.query_params)?,
            _ => {
                let document = if request.body.iter().all(u8::is_ascii_whitespace) {
                    Value::Object(Default::default())
                } else {
                    request.json::<Value>()?
                };
                self.input.validate(&document)?
            }
        };

        let rest_request = RestRequest {
            params,
            headers: request.headers,
        };
        let output = (self.handler)(rest_request).await?;

        if let Some(schema) = &self.output {
            if let Err(errors) = schema.validate(&output) {
                invader_log::error!("invalid response from {}: {}", self.path, errors);
                return Err(Error::Internal(format!("invalid response: {}", errors)));
            }
        }

        let mut response = HttpResponse::json(&output)?;
        if let Some(origin) = &self.cors {
            response = response.with_header("Access-Control-Allow-Origin", origin.clone());
        }
        Ok(response)
    }
}

/// A group of REST methods published under a common usage prefix
pub trait RestService: Send + Sync + 'static {
    /// Prefix of every route of the service (`payment_pagseguro`); an
    /// empty usage mounts the methods at the root.
    fn usage(&self) -> &str;

    fn methods(self: Arc<Self>) -> Vec<RestMethod>;
}

impl Router {
    /// Mount every method of `service` under `/{usage}`
    pub fn mount<S: RestService>(&mut self, service: Arc<S>) {
        let usage = service.usage().trim_matches('/').to_string();
        for method in service.methods() {
            let path = join_path(&usage, &method.path);
            invader_log::debug!("mounting {} {}", method.method.as_str(), path);

            if let Some(origin) = method.cors.clone() {
                let allow_methods = format!("{}, OPTIONS", method.method.as_str());
                self.add_route(Route::new(HttpMethod::OPTIONS, path.clone(), move |_req| {
                    let response = HttpResponse::no_content()
                        .with_header("Access-Control-Allow-Origin", origin.clone())
                        .with_header("Access-Control-Allow-Methods", allow_methods.clone())
                        .with_header("Access-Control-Allow-Headers", "*");
                    async move { Ok(response) }
                }));
            }

            let http_method = method.method;
            let method = Arc::new(method);
            self.add_route(Route::new(http_method, path, move |req| {
                let method = method.clone();
                async move { method.dispatch(req).await }
            }));
        }
    }
}

fn join_path(usage: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    match (usage.is_empty(), path.is_empty()) {
        (true, _) => format!("/{}", path),
        (false, true) => format!("/{}", usage),
        (false, false) => format!("/{}/{}", usage, path),
    }
}
