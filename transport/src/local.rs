//! In-process transport: every rank is a task in the same process.

use async_trait::async_trait;
use matrix_mul_types::{Message, Rank};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::{Error, Transport};

/// One endpoint of an in-process group.
///
/// Each ordered pair of ranks owns a dedicated unbounded channel, so a send
/// never blocks and messages between two ranks stay in order. Dropping an
/// endpoint closes every channel it feeds; peers waiting on it observe
/// [`Error::ConnectionClosed`].
pub struct LocalTransport {
    rank: Rank,
    outboxes: Vec<UnboundedSender<Message>>,
    inboxes: Vec<Mutex<UnboundedReceiver<Message>>>,
}

impl LocalTransport {
    /// Creates `size` connected endpoints, indexed by rank.
    pub fn group(size: usize) -> Vec<LocalTransport> {
        // channels[from][to]
        let mut senders: Vec<Vec<UnboundedSender<Message>>> = Vec::with_capacity(size);
        let mut receivers: Vec<Vec<Option<UnboundedReceiver<Message>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for from in 0..size {
            let mut row = Vec::with_capacity(size);
            for to in 0..size {
                let (tx, rx) = unbounded_channel();
                row.push(tx);
                receivers[to][from] = Some(rx);
            }
            senders.push(row);
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| LocalTransport {
                rank,
                outboxes,
                inboxes: inboxes.into_iter().flatten().map(Mutex::new).collect(),
            })
            .collect()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    async fn send(&self, destination: Rank, message: Message) -> Result<(), Error> {
        self.check_rank(destination)?;
        self.outboxes[destination]
            .send(message)
            .map_err(|_| Error::ConnectionClosed(destination))
    }

    async fn receive(&self, source: Rank) -> Result<Message, Error> {
        self.check_rank(source)?;
        let mut inbox = self.inboxes[source].lock().await;
        inbox.recv().await.ok_or(Error::ConnectionClosed(source))
    }
}
