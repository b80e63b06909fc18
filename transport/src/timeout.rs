use std::time::Duration;

use async_trait::async_trait;
use matrix_mul_types::{Message, Rank};

use crate::{Error, Transport};

/// Bounds every receive of the wrapped transport by a deadline.
///
/// Without it a receive whose matching send never happens waits forever.
pub struct Timeout<T> {
    inner: T,
    limit: Duration,
}

impl<T: Transport> Timeout<T> {
    pub fn new(inner: T, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<T: Transport> Transport for Timeout<T> {
    fn rank(&self) -> Rank {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    async fn send(&self, destination: Rank, message: Message) -> Result<(), Error> {
        self.inner.send(destination, message).await
    }

    async fn receive(&self, source: Rank) -> Result<Message, Error> {
        tokio::time::timeout(self.limit, self.inner.receive(source))
            .await
            .map_err(|_| Error::Timeout(source))?
    }
}
