//! The [`Transport`] trait and a swappable handle around it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{HttpRequest, HttpResponse, TransportError};

/// The single call point through which the client performs HTTP requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "transport"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Cloneable handle whose underlying transport can be replaced at runtime.
///
/// All clones observe the same slot. The lock is only held to clone the
/// current `Arc`, never across a request.
#[derive(Clone)]
pub struct SharedTransport {
    current: Arc<RwLock<Arc<dyn Transport>>>,
}

impl SharedTransport {
    /// Wrap a transport
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Wrap an already shared transport
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self { current: Arc::new(RwLock::new(transport)) }
    }

    /// The transport currently installed
    pub fn current(&self) -> Arc<dyn Transport> {
        self.current.read().clone()
    }

    /// Install `transport`, returning the one it replaced
    pub fn replace(&self, transport: Arc<dyn Transport>) -> Arc<dyn Transport> {
        std::mem::replace(&mut *self.current.write(), transport)
    }

    /// Whether `transport` is the one currently installed
    pub fn is_current(&self, transport: &Arc<dyn Transport>) -> bool {
        let current = self.current.read();
        std::ptr::eq(
            Arc::as_ptr(&*current) as *const (),
            Arc::as_ptr(transport) as *const (),
        )
    }
}

impl fmt::Debug for SharedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTransport")
            .field("current", &self.current.read().name())
            .finish()
    }
}

#[async_trait]
impl Transport for SharedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let transport = self.current();
        transport.execute(request).await
    }

    fn name(&self) -> &str {
        "shared"
    }
}
