//! Length-prefixed TCP server
//!
//! Each frame is a 2-byte big-endian length followed by a packed message.
//! The server runs one task per connection: read a frame, unpack, hand the
//! message to the upstream handler, pack its reply, write it back. Replies
//! go out in handler-return order; the exchange is strictly one-in-one-out
//! per connection.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Iso8583Error;
use crate::message::Message;
use crate::spec::MessageSpec;

const HEADER_LEN: usize = 2;

/// Frame codec: 2-byte big-endian length prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthPrefixedCodec;

impl Decoder for LengthPrefixedCodec {
    type Item = Bytes;
    type Error = Iso8583Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = ((src[0] as usize) << 8) | src[1] as usize;
        if src.len() < HEADER_LEN + length {
            src.reserve(HEADER_LEN + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<Bytes> for LengthPrefixedCodec {
    type Error = Iso8583Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > u16::MAX as usize {
            return Err(Iso8583Error::FrameTooLarge(item.len()));
        }

        dst.reserve(HEADER_LEN + item.len());
        dst.put_u16(item.len() as u16);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

/// Upstream request handler; one call per inbound message
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, request: Message) -> Result<Message, Iso8583Error>;
}

/// A running ISO 8583 server
pub struct Server {
    local_addr: std::net::SocketAddr,
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Bind and start accepting connections
    pub async fn start(
        addr: &str,
        spec: &'static MessageSpec,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, Iso8583Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let cancel = CancellationToken::new();

        info!(addr = %local_addr, "ISO 8583 server listening");

        let accept_task = tokio::spawn(accept_loop(listener, spec, handler, cancel.clone()));

        Ok(Self {
            local_addr,
            cancel,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let in-flight handlers finish, join every task
    pub async fn shutdown(self) {
        info!("stopping ISO 8583 server");
        self.cancel.cancel();
        let _ = self.accept_task.await;
        info!("ISO 8583 server stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    spec: &'static MessageSpec,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "accepted connection");
                    connections.spawn(handle_connection(
                        stream,
                        spec,
                        handler.clone(),
                        cancel.clone(),
                    ));
                }
                Err(err) => {
                    error!(error = %err, "accept failed");
                    break;
                }
            },
            () = cancel.cancelled() => break,
        }
    }

    drop(listener);
    while connections.join_next().await.is_some() {}
}

async fn handle_connection(
    stream: TcpStream,
    spec: &'static MessageSpec,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    let mut framed = Framed::new(stream, LengthPrefixedCodec);

    loop {
        tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(bytes)) => {
                    if !serve_one(&mut framed, &bytes, spec, handler.as_ref()).await {
                        break;
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "frame read failed");
                    break;
                }
                None => {
                    debug!("peer closed connection");
                    break;
                }
            },
            () = cancel.cancelled() => break,
        }
    }
}

/// Serve one request; false closes the connection
async fn serve_one(
    framed: &mut Framed<TcpStream, LengthPrefixedCodec>,
    bytes: &[u8],
    spec: &'static MessageSpec,
    handler: &dyn MessageHandler,
) -> bool {
    let request = match Message::unpack(bytes, spec) {
        Ok(message) => message,
        Err(err) => {
            // a peer speaking something else gets a transport close
            warn!(error = %err, "unpack failed, closing connection");
            return false;
        }
    };

    let response = match handler.handle(request).await {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "handler failed, closing connection");
            return false;
        }
    };

    let packed = match response.pack(spec) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "response pack failed, closing connection");
            return false;
        }
    };

    if let Err(err) = framed.send(Bytes::from(packed)).await {
        warn!(error = %err, "reply write failed");
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = LengthPrefixedCodec;
        let mut buf = BytesMut::new();

        codec.encode(Bytes::from_static(b"hello"), &mut buf).unwrap();
        assert_eq!(&buf[..2], &[0x00, 0x05]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_partial_frame() {
        let mut codec = LengthPrefixedCodec;
        let mut buf = BytesMut::from(&[0x00, 0x05, b'h', b'e'][..]);

        // not enough payload yet
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"llo");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"hello");
    }

    #[test]
    fn test_codec_two_frames_in_one_read() {
        let mut codec = LengthPrefixedCodec;
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"one"), &mut buf).unwrap();
        codec.encode(Bytes::from_static(b"two"), &mut buf).unwrap();

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"one");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"two");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}
