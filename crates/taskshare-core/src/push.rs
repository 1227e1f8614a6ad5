//! Push-notification collaborator.

use crate::auth::AuthToken;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of raw inbound messages. An `Err` item reports a transport failure;
/// the end of the stream means the connection closed.
pub type PushStream = BoxStream<'static, Result<String>>;

/// Server-to-client notification transport.
///
/// Connection setup and the authentication handshake belong to the
/// implementation. Each call to [`connect`](PushTransport::connect) opens a
/// fresh connection.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self, token: &AuthToken) -> Result<PushStream>;
}
