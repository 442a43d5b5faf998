//! Length-prefixed TCP client
//!
//! One request, one framed reply; the caller blocks until the response
//! arrives or the connection closes.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::Iso8583Error;
use crate::message::Message;
use crate::server::LengthPrefixedCodec;
use crate::spec::MessageSpec;

pub struct Client {
    framed: Framed<TcpStream, LengthPrefixedCodec>,
    spec: &'static MessageSpec,
}

impl Client {
    /// Dial the issuer endpoint
    pub async fn connect(addr: &str, spec: &'static MessageSpec) -> Result<Self, Iso8583Error> {
        let stream = TcpStream::connect(addr).await?;
        debug!(addr, "connected to ISO 8583 endpoint");

        Ok(Self {
            framed: Framed::new(stream, LengthPrefixedCodec),
            spec,
        })
    }

    /// Send a request and wait for its reply
    pub async fn request(&mut self, message: &Message) -> Result<Message, Iso8583Error> {
        let packed = message.pack(self.spec)?;
        self.framed.send(Bytes::from(packed)).await?;

        match self.framed.next().await {
            Some(Ok(bytes)) => Message::unpack(&bytes, self.spec),
            Some(Err(err)) => Err(err),
            None => Err(Iso8583Error::ConnectionClosed),
        }
    }
}
