//! Instrumented outbound requests over a caller-supplied transport
//!
//! The facade does no networking itself: each protocol gets the transport
//! function the caller installs, and the hook records
//! `<METHOD> <scheme>//<host><path>` before delegating.

use crate::error::Result;
use crate::filter::Subsystem;
use crate::intercept::catalog::{self, request_summary};
use crate::intercept::{Hook, Registry};
use serde::{Deserialize, Serialize};

const DEFAULT_METHOD: &str = "GET";

/// Where a request goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestTarget {
    /// Full URL, recorded verbatim
    Url(String),
    /// Host plus path; the scheme comes from the protocol used
    Options { host: String, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// HTTP verb; `GET` when absent
    #[serde(default)]
    pub method: Option<String>,
    pub target: RequestTarget,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: None,
            target: RequestTarget::Url(url.into()),
        }
    }

    pub fn new(
        method: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            method: Some(method.into()),
            target: RequestTarget::Options {
                host: host.into(),
                path: path.into(),
            },
        }
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or(DEFAULT_METHOD)
    }

    /// Full address of the request as sent over `subsystem`
    pub fn url(&self, subsystem: Subsystem) -> String {
        match &self.target {
            RequestTarget::Url(url) => url.clone(),
            RequestTarget::Options { host, path } => {
                let scheme = match subsystem {
                    Subsystem::NetworkSecure => "https:",
                    _ => "http:",
                };
                format!("{}//{}{}", scheme, host, path)
            }
        }
    }

    /// Whether a URL target names the secure scheme
    fn is_secure_url(&self) -> bool {
        matches!(&self.target, RequestTarget::Url(url) if url.starts_with("https:"))
    }
}

fn summarize(subsystem: Subsystem) -> impl Fn(&OutboundRequest) -> String + Send + Sync {
    move |request: &OutboundRequest| request_summary(request.method(), &request.url(subsystem))
}

/// Plain and secure request primitives sharing one response type
#[derive(Debug)]
pub struct Network<R> {
    plain: Hook<OutboundRequest, R>,
    secure: Hook<OutboundRequest, R>,
}

impl<R> Clone for Network<R> {
    fn clone(&self) -> Self {
        Self {
            plain: self.plain.clone(),
            secure: self.secure.clone(),
        }
    }
}

impl<R: 'static> Network<R> {
    /// Install the two transports in `registry`
    pub fn install<P, S>(registry: &Registry, plain: P, secure: S) -> Result<Self>
    where
        P: Fn(OutboundRequest) -> R + Send + Sync + 'static,
        S: Fn(OutboundRequest) -> R + Send + Sync + 'static,
    {
        let plain_summary = summarize(Subsystem::NetworkPlain);
        let secure_summary = summarize(Subsystem::NetworkSecure);
        Ok(Self {
            plain: registry.install(catalog::HTTP_REQUEST, plain, plain_summary)?,
            secure: registry.install(catalog::HTTPS_REQUEST, secure, secure_summary)?,
        })
    }

    /// Send over the plain transport
    pub fn http(&self, request: OutboundRequest) -> R {
        self.plain.call(request)
    }

    /// Send over the secure transport
    pub fn https(&self, request: OutboundRequest) -> R {
        self.secure.call(request)
    }

    /// Route a URL request by its scheme; option targets go plain
    pub fn request(&self, request: OutboundRequest) -> R {
        if request.is_secure_url() {
            self.https(request)
        } else {
            self.http(request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::probe::Probe;
    use crate::stats::Aggregated;
    use std::sync::Arc;

    fn network() -> (Arc<Probe>, Network<std::result::Result<u16, String>>) {
        let probe = Arc::new(Probe::new(Config::default(), "/app/main.js"));
        let registry = Registry::new(Arc::clone(&probe));
        let network = Network::install(
            &registry,
            |_| Ok(200),
            |request: OutboundRequest| match request.target {
                RequestTarget::Options { host, .. } if host == "down.example.com" => {
                    Err("ECONNREFUSED".to_string())
                }
                _ => Ok(201),
            },
        )
        .unwrap();
        (probe, network)
    }

    #[test]
    fn test_options_target_summary() {
        let (probe, network) = network();
        let response = network.https(OutboundRequest::new("post", "api.example.com", "/v1/items"));
        assert_eq!(response, Ok(201));

        let (summary, _) = probe.finalize().unwrap();
        assert_eq!(
            summary.get(Subsystem::NetworkSecure, Some("request")),
            Some(&Aggregated::Unique(vec!["POST https://api.example.com/v1/items".to_string()]))
        );
    }

    #[test]
    fn test_url_without_method_defaults_to_get() {
        let (probe, network) = network();
        assert_eq!(network.request(OutboundRequest::get("http://example.com/health")), Ok(200));

        let (summary, _) = probe.finalize().unwrap();
        assert_eq!(
            summary.get(Subsystem::NetworkPlain, Some("request")),
            Some(&Aggregated::Unique(vec!["GET http://example.com/health".to_string()]))
        );
    }

    #[test]
    fn test_request_routes_by_scheme() {
        let (probe, network) = network();
        assert_eq!(network.request(OutboundRequest::get("https://example.com/")), Ok(201));
        assert_eq!(probe.recorded(Subsystem::NetworkSecure, Some("request")), 1);
        assert_eq!(probe.recorded(Subsystem::NetworkPlain, Some("request")), 0);
    }

    #[test]
    fn test_transport_error_passes_through() {
        let (probe, network) = network();
        let response = network.https(OutboundRequest::new("GET", "down.example.com", "/"));
        assert_eq!(response, Err("ECONNREFUSED".to_string()));
        assert_eq!(probe.recorded(Subsystem::NetworkSecure, Some("request")), 1);
    }
}
