//! Connectivity probe for a freshly launched group.

use matrix_mul_types::Message;
use tracing::info;

use crate::{Error, Transport};

/// Bounces a counter between ranks 0 and 1 until it reaches `limit`.
///
/// The rank whose turn it is increments the counter and sends it to its
/// partner; the partner receives it. Ranks above 1 take no part and return
/// immediately. Returns the final counter value.
pub async fn ping_pong<T: Transport + ?Sized>(transport: &T, limit: u64) -> Result<u64, Error> {
    transport.check_rank(1)?;

    let rank = transport.rank();
    if rank > 1 {
        return Ok(0);
    }

    let partner = 1 - rank;
    let mut count = 0;
    while count < limit {
        if count % 2 == rank as u64 {
            count += 1;
            transport.send(partner, Message::Ping(count)).await?;
            info!(rank, count, partner, "sent ping");
        } else {
            count = match transport.receive(partner).await? {
                Message::Ping(count) => count,
                other => {
                    return Err(Error::UnexpectedMessage {
                        peer: partner,
                        expected: "ping",
                        found: other.kind(),
                    });
                }
            };
            info!(rank, count, partner, "received ping");
        }
    }

    Ok(count)
}
