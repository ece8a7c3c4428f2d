// Routing system for HTTP requests

use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A route handler function type
pub type HandlerFn = Arc<
    dyn Fn(HttpRequest) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>
        + Send
        + Sync,
>;

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerFn,
}

impl Route {
    pub fn new<F, Fut>(method: HttpMethod, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self {
            method,
            path: path.into(),
            handler: Arc::new(move |request| Box::pin(handler(request))),
        }
    }
}

/// Router for managing routes and dispatching requests
#[derive(Clone, Default)]
pub struct Router {
    pub routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add a route to the router
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Find the route matching the request and run its handler
    pub async fn route(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (path, query_string) = match request.path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (request.path.clone(), None),
        };

        if let Some(query) = query_string {
            request.query_params.extend(parse_query_string(&query));
        }
        request.path = path.clone();

        let mut path_matched = false;
        for route in &self.routes {
            let Some(params) = match_path(&route.path, &path) else {
                continue;
            };
            if !route.method.as_str().eq_ignore_ascii_case(&request.method) {
                path_matched = true;
                continue;
            }
            request.path_params = params;
            return (route.handler)(request).await;
        }

        if path_matched {
            Err(Error::MethodNotAllowed(format!("{} {}", request.method, path)))
        } else {
            Err(Error::RouteNotFound(format!("{} {}", request.method, path)))
        }
    }

    /// Route the request, rendering any error as a response
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let method = request.method.clone();
        let path = request.path.clone();
        match self.route(request).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    invader_log::error!("{} {} failed: {}", method, path, err; "status" => err.status_code());
                } else {
                    invader_log::debug!("{} {} rejected: {}", method, path, err; "status" => err.status_code());
                }
                err.to_response()
            }
        }
    }
}

/// Match a route path pattern against a request path.
/// Returns Some(params) if matched, None otherwise.
pub(crate) fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            params.insert(param_name.to_string(), path_part.to_string());
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

/// Parse a query string into a map of decoded parameters
pub(crate) fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_router() -> Router {
        let mut router = Router::new();
        router.add_route(Route::new(HttpMethod::GET, "/carts/:id", |req: HttpRequest| async move {
            HttpResponse::json(&serde_json::json!({
                "id": req.param("id"),
                "target": req.query("target"),
            }))
        }));
        router
    }

    #[test]
    fn test_match_path_static() {
        let result = match_path("/notification-url", "/notification-url");
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn test_match_path_with_param() {
        let params = match_path("/carts/:id", "/carts/123").unwrap();
        assert_eq!(params.get("id"), Some(&"123".to_string()));
    }

    #[test]
    fn test_match_path_no_match() {
        assert!(match_path("/carts/:id", "/orders/123").is_none());
        assert!(match_path("/payment_pagseguro/public-key", "/payment_pagseguro").is_none());
    }

    #[test]
    fn test_parse_query_string_decodes() {
        let params = parse_query_string("target=current_cart&name=john%20doe&q=a+b&flag");
        assert_eq!(params.get("target"), Some(&"current_cart".to_string()));
        assert_eq!(params.get("name"), Some(&"john doe".to_string()));
        assert_eq!(params.get("q"), Some(&"a b".to_string()));
        assert_eq!(params.get("flag"), Some(&String::new()));
    }

    #[test]
    fn test_parse_query_string_empty() {
        assert!(parse_query_string("").is_empty());
    }

    #[tokio::test]
    async fn test_route_dispatch_with_query() {
        let router = echo_router();
        let response = router
            .route(HttpRequest::new("GET", "/carts/7?target=current_cart"))
            .await
            .unwrap();
        let body = response.body_json().unwrap();
        assert_eq!(body["id"], "7");
        assert_eq!(body["target"], "current_cart");
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let router = echo_router();

        let missing = router.handle(HttpRequest::new("GET", "/nope")).await;
        assert_eq!(missing.status, 404);

        let wrong_method = router.handle(HttpRequest::new("POST", "/carts/7")).await;
        assert_eq!(wrong_method.status, 405);
    }

    #[tokio::test]
    async fn test_handler_failure_is_logged_not_returned() {
        let mut router = Router::new();
        router.add_route(Route::new(HttpMethod::POST, "/charges", |_req: HttpRequest| async move {
            Err::<HttpResponse, _>(Error::Internal("acquirer rejected client_secret".into()))
        }));

        let response = router.handle(HttpRequest::new("POST", "/charges")).await;

        assert_eq!(response.status, 500);
        let body = response.body_json().unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("client_secret"));
    }
}
