use std::net::SocketAddr;

/// Connection-level details of a consuming client.
///
/// Captured by the transport layer when the connection is established, and carried
/// along to any component that needs to attribute behavior to a specific client.
#[derive(Clone, Debug)]
pub struct ClientInfo {
    /// Remote socket address of the client connection.
    pub address: SocketAddr,

    /// Client library version string, as reported by the client at connect time.
    pub version: String,

    /// Client-supplied metadata properties, in the order the client sent them.
    ///
    /// Values are kept verbatim; any size or format constraints are enforced by the
    /// transport layer before this type is constructed.
    pub metadata: Vec<(String, String)>,
}

impl ClientInfo {
    /// Creates client details for the given remote address.
    pub fn new<V: Into<String>>(address: SocketAddr, version: V) -> Self {
        Self {
            address,
            version: version.into(),
            metadata: Vec::new(),
        }
    }

    /// Adds a client-supplied metadata property.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}
