//! Multi-process transport over a full mesh of TCP connections.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use matrix_mul_types::{Message, Rank, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, warn};

use crate::{Error, Transport};

const MAX_RETRIES: usize = 8;
const MAX_FRAME_LENGTH: usize = 1 << 30;

type FramedStream = Framed<TcpStream, LengthDelimitedCodec>;

/// First frame on every connection, sent by both ends.
#[derive(Debug, Serialize, Deserialize)]
struct Handshake {
    rank: Rank,
    size: usize,
}

struct Link {
    sink: Mutex<SplitSink<FramedStream, Bytes>>,
    stream: Mutex<SplitStream<FramedStream>>,
}

impl Link {
    fn new(framed: FramedStream) -> Self {
        let (sink, stream) = framed.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

/// One rank of a group where every rank is its own OS process.
///
/// `peers[r]` is the listening address of rank `r`. Every rank accepts
/// connections from the ranks above it and dials the ranks below it, so each
/// pair shares exactly one connection. Messages to self use an in-process
/// loopback queue.
///
/// # Example
///
/// ```no_run
/// use matrix_mul_transport::{Collective, TcpTransport, Transport};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let peers = vec!["127.0.0.1:7000".parse()?, "127.0.0.1:7001".parse()?];
///     let transport = TcpTransport::bind(0, peers).await?;
///
///     transport.barrier().await?;
///     Ok(())
/// }
/// ```
pub struct TcpTransport {
    rank: Rank,
    links: Vec<Option<Link>>,
    loopback_tx: UnboundedSender<Message>,
    loopback_rx: Mutex<UnboundedReceiver<Message>>,
}

impl TcpTransport {
    /// Binds `peers[rank]` and connects to the rest of the group.
    pub async fn bind(rank: Rank, peers: Vec<SocketAddr>) -> Result<Self, Error> {
        let addr = *peers.get(rank).ok_or(Error::InvalidRank {
            rank,
            size: peers.len(),
        })?;
        let listener = TcpListener::bind(addr).await?;
        Self::from_listener(rank, listener, peers).await
    }

    /// Connects to the rest of the group using an already bound listener.
    ///
    /// Resolves once a connection to every other rank is established and has
    /// passed the handshake.
    pub async fn from_listener(
        rank: Rank,
        listener: TcpListener,
        peers: Vec<SocketAddr>,
    ) -> Result<Self, Error> {
        let size = peers.len();
        if rank >= size {
            return Err(Error::InvalidRank { rank, size });
        }

        let (accepted, dialed) = tokio::try_join!(
            accept_peers(listener, rank, size),
            dial_peers(rank, &peers[..rank], size),
        )?;

        let mut links: Vec<Option<Link>> = (0..size).map(|_| None).collect();
        for (peer, framed) in accepted.into_iter().chain(dialed) {
            links[peer] = Some(Link::new(framed));
        }

        info!(rank, size, "connected to group");

        let (loopback_tx, loopback_rx) = unbounded_channel();
        Ok(Self {
            rank,
            links,
            loopback_tx,
            loopback_rx: Mutex::new(loopback_rx),
        })
    }

    fn link(&self, peer: Rank) -> Result<&Link, Error> {
        self.check_rank(peer)?;
        self.links[peer].as_ref().ok_or(Error::ConnectionClosed(peer))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.links.len()
    }

    async fn send(&self, destination: Rank, message: Message) -> Result<(), Error> {
        if destination == self.rank {
            return self
                .loopback_tx
                .send(message)
                .map_err(|_| Error::ConnectionClosed(destination));
        }

        let frame = Bytes::from(encode(&message)?);
        let mut sink = self.link(destination)?.sink.lock().await;
        sink.send(frame).await?;
        Ok(())
    }

    async fn receive(&self, source: Rank) -> Result<Message, Error> {
        if source == self.rank {
            let mut loopback = self.loopback_rx.lock().await;
            return loopback.recv().await.ok_or(Error::ConnectionClosed(source));
        }

        let mut stream = self.link(source)?.stream.lock().await;
        let frame = stream
            .next()
            .await
            .ok_or(Error::ConnectionClosed(source))??;
        Ok(decode(&frame)?)
    }
}

fn framed(stream: TcpStream) -> Result<FramedStream, Error> {
    stream.set_nodelay(true)?;
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec();
    Ok(Framed::new(stream, codec))
}

async fn write_handshake(framed: &mut FramedStream, rank: Rank, size: usize) -> Result<(), Error> {
    let bytes = postcard::to_allocvec(&Handshake { rank, size })?;
    framed.send(Bytes::from(bytes)).await?;
    Ok(())
}

async fn read_handshake(framed: &mut FramedStream) -> Result<Handshake, Error> {
    let frame = framed
        .next()
        .await
        .ok_or_else(|| Error::Handshake("connection closed before handshake".to_string()))??;
    Ok(postcard::from_bytes(&frame)?)
}

/// Accepts one connection from every rank above `rank`.
async fn accept_peers(
    listener: TcpListener,
    rank: Rank,
    size: usize,
) -> Result<Vec<(Rank, FramedStream)>, Error> {
    let expected = size - rank - 1;
    let mut incoming = TcpListenerStream::new(listener);
    let mut accepted: Vec<(Rank, FramedStream)> = Vec::with_capacity(expected);

    while accepted.len() < expected {
        let stream = incoming
            .next()
            .await
            .ok_or_else(|| Error::Handshake("listener closed".to_string()))??;
        let mut framed = framed(stream)?;

        let hello = read_handshake(&mut framed).await?;
        if hello.size != size {
            return Err(Error::Handshake(format!(
                "rank {} expects a group of {}, this group has {}",
                hello.rank, hello.size, size
            )));
        }
        if hello.rank <= rank || hello.rank >= size {
            return Err(Error::Handshake(format!(
                "rank {} must not dial rank {}",
                hello.rank, rank
            )));
        }
        if accepted.iter().any(|(peer, _)| *peer == hello.rank) {
            return Err(Error::Handshake(format!(
                "rank {} connected twice",
                hello.rank
            )));
        }

        write_handshake(&mut framed, rank, size).await?;
        debug!(rank, peer = hello.rank, "accepted peer");
        accepted.push((hello.rank, framed));
    }

    Ok(accepted)
}

/// Dials every rank below `rank`; `lower[r]` is the address of rank `r`.
async fn dial_peers(
    rank: Rank,
    lower: &[SocketAddr],
    size: usize,
) -> Result<Vec<(Rank, FramedStream)>, Error> {
    let mut dialed = Vec::with_capacity(lower.len());

    for (peer, addr) in lower.iter().enumerate() {
        let stream = connect_with_retry(*addr).await?;
        let mut framed = framed(stream)?;

        write_handshake(&mut framed, rank, size).await?;
        let hello = read_handshake(&mut framed).await?;
        if hello.rank != peer || hello.size != size {
            return Err(Error::Handshake(format!(
                "{} answered as rank {} of {}, expected rank {} of {}",
                addr, hello.rank, hello.size, peer, size
            )));
        }

        debug!(rank, peer, %addr, "dialed peer");
        dialed.push((peer, framed));
    }

    Ok(dialed)
}

/// Peers start independently, so a refused connection is retried with
/// exponential backoff (100ms starting, doubling each retry).
async fn connect_with_retry(addr: SocketAddr) -> Result<TcpStream, Error> {
    let mut retries = 0;
    let mut delay = Duration::from_millis(100);

    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    return Err(Error::Io(e));
                }
                warn!(%addr, retries, error = %e, "connect failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}
