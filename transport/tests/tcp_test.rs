use std::net::SocketAddr;

use matrix_mul_transport::{Collective, Error, TcpTransport, Transport, ping_pong};
use matrix_mul_types::{Element, Message};
use tokio::net::TcpListener;

/// Binds one loopback listener per rank on an ephemeral port.
async fn listeners(size: usize) -> (Vec<TcpListener>, Vec<SocketAddr>) {
    let mut listeners = Vec::with_capacity(size);
    let mut addrs = Vec::with_capacity(size);
    for _ in 0..size {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        addrs.push(listener.local_addr().unwrap());
        listeners.push(listener);
    }
    (listeners, addrs)
}

#[tokio::test]
async fn test_tcp_group_runs_collectives() {
    let (listeners, peers) = listeners(3).await;

    let handles: Vec<_> = listeners
        .into_iter()
        .enumerate()
        .map(|(rank, listener)| {
            let peers = peers.clone();
            tokio::spawn(async move {
                let transport = TcpTransport::from_listener(rank, listener, peers).await?;

                let chunks = (rank == 0).then(|| vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
                let mut local = transport.scatter(chunks, 2, 0).await?;

                let mut shared = if rank == 0 { vec![10, 20] } else { vec![0; 2] };
                transport.broadcast(&mut shared, 0).await?;

                for (value, offset) in local.iter_mut().zip(&shared) {
                    *value += offset;
                }
                let gathered = transport.gather(&local, 0).await?;
                transport.barrier().await?;
                Ok::<_, Error>(gathered)
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    let expected: Vec<Element> = vec![11, 22, 13, 24, 15, 26];
    assert_eq!(results[0], Some(expected));
    assert_eq!(results[1], None);
    assert_eq!(results[2], None);
}

#[tokio::test]
async fn test_tcp_send_to_self_loops_back() {
    let (mut listeners, peers) = listeners(2).await;
    let second = listeners.pop().unwrap();
    let first = listeners.pop().unwrap();

    let peers_for_second = peers.clone();
    let other = tokio::spawn(async move {
        let transport = TcpTransport::from_listener(1, second, peers_for_second).await?;
        ping_pong(&transport, 4).await
    });

    let transport = TcpTransport::from_listener(0, first, peers).await.unwrap();
    transport.send(0, Message::Ping(42)).await.unwrap();
    assert_eq!(transport.receive(0).await.unwrap(), Message::Ping(42));

    assert_eq!(ping_pong(&transport, 4).await.unwrap(), 4);
    assert_eq!(other.await.unwrap().unwrap(), 4);
}

#[tokio::test]
async fn test_tcp_rank_outside_peer_list_is_rejected() {
    let (mut listeners, peers) = listeners(1).await;
    let result = TcpTransport::from_listener(3, listeners.pop().unwrap(), peers).await;
    assert!(matches!(result, Err(Error::InvalidRank { rank: 3, size: 1 })));
}
