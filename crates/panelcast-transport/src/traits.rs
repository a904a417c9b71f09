use crate::error::Result;

/// Opaque delivery acknowledgement: the HTTP response body, or a short
/// transport-specific marker for links that have no application-level ack.
pub type Ack = String;

/// A delivery channel to the panel.
///
/// Implementations own whatever connection state the transport needs and
/// keep it alive across calls. `deliver` blocks until the payload is
/// written or a bounded timeout expires.
pub trait Transport {
    /// Establish the session eagerly, before the first delivery. Stateless
    /// transports have nothing to do; stateful ones open their link here so
    /// the startup cost (serial reset settle, first BLE scan) is paid ahead
    /// of the first message.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Deliver one payload to the panel.
    fn deliver(&mut self, payload: &[u8]) -> Result<Ack>;

    /// Release the session. Best-effort: failures are swallowed, never
    /// surfaced. Only reachable at process shutdown.
    fn close(&mut self) {}

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn Transport + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("name", &self.name()).finish()
    }
}
