//! The seam between the message engine and the wire.

/// Error reported by a [`Transport`].
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Delivers an encoded pkiMessage to the CA and returns the encoded response.
///
/// Implementations own HTTP plumbing such as `GET ?operation=PKIOperation` or
/// `POST`, proxies and retries. A failed delivery leaves the transaction in
/// its previous state.
pub trait Transport {
    /// Sends `request` and waits for the CA's `CertRep`.
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).send(request)
    }
}
