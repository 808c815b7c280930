//! Session over TCP, where frames arrive split and merged arbitrarily.

mod common;

use std::sync::Arc;

use common::{quiet_config, wait_for_state, SimVehicle, WAIT};
use gcs_link::{ConnectionConfig, ConnectionState, LinkSession, SocketConnector};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::timeout;

#[tokio::test]
async fn tcp_chunked_stream_is_reassembled() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let session = LinkSession::new(Arc::new(SocketConnector), quiet_config());
    session
        .connect(&ConnectionConfig::tcp_client("127.0.0.1", port))
        .await
        .unwrap();
    let mut updates = session.subscribe();
    let (mut stream, _) = listener.accept().await.unwrap();
    stream.set_nodelay(true).unwrap();

    let mut vehicle = SimVehicle::new();
    let mut bytes = vec![0x00, 0x55, 0xFD];
    bytes.extend(vehicle.heartbeat(true));
    bytes.extend(vehicle.position(-338_688_000, 1_512_093_000));

    // Deliver in awkward pieces: mid-header, mid-payload, mid-checksum
    for chunk in bytes.chunks(7) {
        stream.write_all(chunk).await.unwrap();
        stream.flush().await.unwrap();
        tokio::task::yield_now().await;
    }

    let state = wait_for_state(&mut updates, |s| s.latitude != 0.0).await;
    assert!(state.armed);
    assert!((state.latitude + 33.8688).abs() < 1e-6);
    assert!((state.longitude - 151.2093).abs() < 1e-6);
    assert!((state.heading - 90.0).abs() < 1e-3);
    assert_eq!(session.stats().dispatch_errors, 0);
}

#[tokio::test]
async fn tcp_peer_close_enters_error_state() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let session = LinkSession::new(Arc::new(SocketConnector), quiet_config());
    session
        .connect(&ConnectionConfig::tcp_client("127.0.0.1", port))
        .await
        .unwrap();
    let mut states = session.subscribe_state();

    let (stream, _) = listener.accept().await.unwrap();
    drop(stream);

    timeout(WAIT, states.wait_for(|s| matches!(s, ConnectionState::Error(_))))
        .await
        .unwrap()
        .unwrap();

    // An explicit reconnect is required
    let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
    session
        .connect(&ConnectionConfig::tcp_client("127.0.0.1", port))
        .await
        .unwrap();
    assert_eq!(session.state(), ConnectionState::Connected);
    accept.await.unwrap().unwrap();

    session.disconnect().await;
}

#[tokio::test]
async fn tcp_refused_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let session = LinkSession::new(Arc::new(SocketConnector), quiet_config());
    let err = session
        .connect(&ConnectionConfig::tcp_client("127.0.0.1", port))
        .await
        .unwrap_err();
    assert!(matches!(err, gcs_link::TransportError::ConnectFailed(_)));
    assert!(matches!(session.state(), ConnectionState::Error(_)));
}
