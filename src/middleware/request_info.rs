use std::{
    future::{Ready, ready},
    rc::Rc,
};

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;

/// Client details captured for the audit trail.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub user_agent: String,
    pub ip_address: String,
    pub method: String,
    pub path: String,
}

impl RequestInfo {
    fn from_http_request(req: &HttpRequest) -> Self {
        RequestInfo {
            user_agent: req
                .headers()
                .get("user-agent")
                .and_then(|h| h.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
            ip_address: req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string(),
            method: req.method().to_string(),
            path: req.path().to_string(),
        }
    }
}

impl FromRequest for RequestInfo {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Prefer what the middleware captured; build it directly otherwise
        let cached = req.extensions().get::<RequestInfo>().cloned();
        let info = cached.unwrap_or_else(|| RequestInfo::from_http_request(req));

        ready(Ok(info))
    }
}

// Middleware factory
pub struct RequestInfoMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestInfoMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestInfoMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestInfoMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestInfoMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestInfoMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let request_info = RequestInfo::from_http_request(req.request());
            req.extensions_mut().insert(request_info);

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_extracts_client_details() {
        let req = TestRequest::post()
            .uri("/api/v1/leaves")
            .insert_header(("user-agent", "integration-test"))
            .insert_header(("x-forwarded-for", "203.0.113.9"))
            .to_http_request();

        let info = RequestInfo::extract(&req).await.unwrap();

        assert_eq!(info.user_agent, "integration-test");
        assert_eq!(info.ip_address, "203.0.113.9");
        assert_eq!(info.method, "POST");
        assert_eq!(info.path, "/api/v1/leaves");
    }

    #[actix_web::test]
    async fn test_missing_headers_fall_back_to_unknown() {
        let req = TestRequest::get().uri("/").to_http_request();
        let info = RequestInfo::extract(&req).await.unwrap();

        assert_eq!(info.user_agent, "unknown");
    }

    #[actix_web::test]
    async fn test_prefers_captured_details() {
        let req = TestRequest::get().uri("/health").to_http_request();
        req.extensions_mut().insert(RequestInfo {
            user_agent: "captured".to_string(),
            ip_address: "198.51.100.4".to_string(),
            method: "GET".to_string(),
            path: "/health".to_string(),
        });

        let info = RequestInfo::extract(&req).await.unwrap();

        assert_eq!(info.user_agent, "captured");
        assert_eq!(info.ip_address, "198.51.100.4");
    }
}
