//! UDP and TCP delivery against local listeners

use gpscot_client::{ClientConfig, CotSender, TcpSender, Transport, UdpSender, FRAME_MARKER};
use gpscot_core::{ErrorKind, MemorySink, Protocol};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio::time::timeout;

const EVENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?><event version="2.0" uid="GPS-test"/>"#;

fn expected_frame(event: &str) -> Vec<u8> {
    let mut frame = FRAME_MARKER.to_vec();
    frame.extend_from_slice(event.as_bytes());
    frame
}

#[tokio::test]
async fn test_udp_delivers_one_framed_datagram() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let mut sender = UdpSender::new(ClientConfig::new("127.0.0.1", port));
    sender.deliver(EVENT).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let (len, _) = timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
        .await
        .expect("datagram not received")
        .unwrap();

    assert_eq!(&buf[..3], &[0xBF, 0x00, 0xBF]);
    assert_eq!(&buf[..len], expected_frame(EVENT).as_slice());

    let snapshot = sender.status().metrics().snapshot();
    assert_eq!(snapshot.messages_sent, 1);
    assert_eq!(snapshot.bytes_sent, len as u64);
    assert_eq!(snapshot.errors, 0);
}

#[tokio::test]
async fn test_udp_uses_a_fresh_socket_per_event() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let mut sender = UdpSender::new(ClientConfig::new("127.0.0.1", port));
    sender.deliver(EVENT).await.unwrap();
    sender.deliver(EVENT).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let (_, first) = timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let (_, second) = timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();

    assert_ne!(first.port(), second.port());
}

#[tokio::test]
async fn test_tcp_delivers_frame_and_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });

    let sink = Arc::new(MemorySink::new());
    let mut sender = TcpSender::new(ClientConfig::new("127.0.0.1", port), sink.clone());
    sender.deliver(EVENT).await.unwrap();

    let received = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(received, expected_frame(EVENT));
    assert!(sink.is_empty());

    let metrics = sender.status().metrics();
    assert_eq!(metrics.messages_sent(), 1);
    assert_eq!(metrics.sessions_opened(), 1);
    assert!(!sender.status().is_connected());
}

#[tokio::test]
async fn test_tcp_connection_per_event() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut payloads = Vec::new();
        for _ in 0..2 {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            payloads.push(received);
        }
        payloads
    });

    let mut sender = TcpSender::new(ClientConfig::new("127.0.0.1", port), Arc::new(MemorySink::new()));
    sender.deliver(EVENT).await.unwrap();
    sender.deliver("<event uid=\"second\"/>").await.unwrap();

    let payloads = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(payloads[0], expected_frame(EVENT));
    assert_eq!(payloads[1], expected_frame("<event uid=\"second\"/>"));
    assert_eq!(sender.status().metrics().sessions_opened(), 2);
}

#[tokio::test]
async fn test_tcp_failure_is_returned_not_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let sink = Arc::new(MemorySink::new());
    let config = ClientConfig::new("127.0.0.1", port).with_connect_timeout(Duration::from_secs(2));
    let mut transport = Transport::new(Protocol::Tcp, config, &Default::default(), sink.clone()).unwrap();

    for _ in 0..2 {
        let err = transport.deliver(EVENT).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportConnect);
    }

    // Reporting is left to the caller
    assert!(sink.is_empty());
    assert_eq!(transport.status().metrics().errors(), 2);
}
