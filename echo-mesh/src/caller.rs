//! Call semantics independent of caller identity.

use crate::config::Protocol;
use crate::error::{CallError, RetryExhaustedError};
use crate::instance::{EchoInstance, Instances};
use crate::retry::{retry_call, RetryPolicy};
use crate::workload::{EchoResponse, ForwardRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What a call is aimed at.
#[derive(Clone, Debug)]
pub enum CallTarget {
    /// A built instance; address and port are resolved from its config.
    Instance(EchoInstance),
    /// A raw `host:port`, bypassing service resolution.
    Address(String),
}

/// Options for one forward call.
///
/// Every field shapes request construction only; retry scheduling lives
/// entirely in [`RetryPolicy`].
#[derive(Clone, Debug)]
pub struct CallOptions {
    pub target: CallTarget,
    /// Declared port name on the target config; first port when `None`.
    /// Ignored for raw address targets.
    pub port_name: Option<String>,
    /// Overrides the scheme implied by the resolved port's protocol.
    pub scheme: Option<Protocol>,
    /// Connections to open; one parsed response per connection.
    pub count: u32,
    pub headers: Vec<(String, String)>,
    pub payload: String,
    pub timeout: Duration,
}

impl CallOptions {
    pub fn to_instance(target: &EchoInstance) -> Self {
        Self::new(CallTarget::Instance(target.clone()))
    }

    pub fn to_address(address: &str) -> Self {
        Self::new(CallTarget::Address(address.to_string()))
    }

    fn new(target: CallTarget) -> Self {
        Self {
            target,
            port_name: None,
            scheme: None,
            count: 1,
            headers: Vec::new(),
            payload: String::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_port(mut self, port_name: &str) -> Self {
        self.port_name = Some(port_name.to_string());
        self
    }

    pub fn with_scheme(mut self, scheme: Protocol) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_payload(mut self, payload: &str) -> Self {
        self.payload = payload.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stable label naming the target in errors and log events.
    pub fn describe_target(&self) -> String {
        match &self.target {
            CallTarget::Instance(instance) => instance.config().fqdn(),
            CallTarget::Address(address) => address.clone(),
        }
    }

    /// Resolves these options into one concrete forward request.
    pub(crate) async fn forward_request(&self) -> Result<ForwardRequest, CallError> {
        let (target, scheme) = match &self.target {
            CallTarget::Address(address) => {
                (address.clone(), self.scheme.unwrap_or(Protocol::Http))
            }
            CallTarget::Instance(instance) => {
                let config = instance.config();
                let port = match &self.port_name {
                    Some(name) => config.port(name).ok_or_else(|| CallError::UnknownPort {
                        service: config.fqdn(),
                        port: name.clone(),
                    })?,
                    None => config.first_port().ok_or_else(|| CallError::UnknownPort {
                        service: config.fqdn(),
                        port: "<first>".to_string(),
                    })?,
                };
                let host = instance.dial_address().await?;
                (
                    format!("{host}:{}", port.service_port),
                    self.scheme.unwrap_or(port.protocol),
                )
            }
        };

        Ok(ForwardRequest {
            target,
            scheme,
            count: self.count.max(1),
            headers: self.headers.clone(),
            payload: self.payload.clone(),
            timeout: self.timeout,
        })
    }
}

/// Per-connection results of one successful call.
#[derive(Clone, Debug, Default)]
pub struct CallResponses {
    responses: Vec<EchoResponse>,
}

impl CallResponses {
    pub fn new(responses: Vec<EchoResponse>) -> Self {
        Self { responses }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EchoResponse> {
        self.responses.iter()
    }

    pub fn into_inner(self) -> Vec<EchoResponse> {
        self.responses
    }
}

/// Anything that can originate a forward call.
///
/// Implemented by [`EchoInstance`] and by composite collections; target
/// selection lives in [`CallOptions`], so call semantics are independent of
/// the caller's identity.
#[async_trait]
pub trait Caller: Send + Sync {
    /// Issues exactly one forward call.
    async fn call(&self, options: &CallOptions) -> Result<CallResponses, CallError>;

    /// The concrete instance behind this caller, when there is exactly one.
    fn as_instance(&self) -> Option<EchoInstance>;

    /// Re-issues [`call`][Caller::call] under `policy`, stopping on first
    /// success.
    async fn call_with_retry(
        &self,
        options: &CallOptions,
        policy: &RetryPolicy,
    ) -> Result<CallResponses, RetryExhaustedError> {
        let label = options.describe_target();
        retry_call(policy, &label, || self.call(options)).await
    }
}

/// Heterogeneous collection of callers.
#[derive(Clone, Default)]
pub struct Callers {
    items: Vec<Arc<dyn Caller>>,
}

impl Callers {
    pub fn new(items: Vec<Arc<dyn Caller>>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, caller: Arc<dyn Caller>) {
        self.items.push(caller);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The homogeneous instance view of this collection.
    ///
    /// `None` unless every element is concretely an instance; callers never
    /// receive a silently-truncated collection.
    pub fn instances(&self) -> Option<Instances> {
        let mut out = Vec::with_capacity(self.items.len());
        for caller in &self.items {
            out.push(caller.as_instance()?);
        }
        Some(Instances::new(out))
    }
}

impl FromIterator<Arc<dyn Caller>> for Callers {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Caller>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
