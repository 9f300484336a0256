//! Integration tests for relay endpoints and the dispatcher.

mod common;

use common::TestServer;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

struct RawRelay {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RawRelay {
    async fn connect(addr: &str) -> Self {
        let (r, w) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            reader: BufReader::new(r),
            writer: w,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for relay output")
            .unwrap();
        (n > 0).then(|| line.trim_end().to_string())
    }
}

/// Send a line and give the dispatcher a moment to route it.
async fn introduce(relay: &mut RawRelay, line: &str) {
    relay.send(line).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn introduced_relays_see_each_other() {
    let server = TestServer::spawn().await.unwrap();
    let addr = server.relay_address();
    let mut a = RawRelay::connect(&addr).await;
    let mut b = RawRelay::connect(&addr).await;
    introduce(&mut a, "NICK ant").await;
    introduce(&mut b, "NICK bee").await;

    a.send("PRIVMSG bee :buzz").await;
    assert_eq!(b.line().await.as_deref(), Some(":ant PRIVMSG bee :buzz"));

    b.send(":custom NOTICE ant :hi").await;
    assert_eq!(a.line().await.as_deref(), Some(":custom NOTICE ant :hi"));
}

#[tokio::test]
async fn unintroduced_relays_are_not_routed() {
    let server = TestServer::spawn().await.unwrap();
    let addr = server.relay_address();
    let mut quiet = RawRelay::connect(&addr).await;
    let mut talker = RawRelay::connect(&addr).await;
    introduce(&mut talker, "NICK talker").await;

    quiet.send("PRIVMSG talker :before intro").await;
    introduce(&mut talker, "PRIVMSG quiet :anyone?").await;
    introduce(&mut quiet, "NICK quiet").await;
    talker.send("PRIVMSG quiet :now?").await;

    assert_eq!(quiet.line().await.as_deref(), Some(":talker PRIVMSG quiet :now?"));
}

#[tokio::test]
async fn closing_a_relay_notifies_peers() {
    let server = TestServer::spawn().await.unwrap();
    let addr = server.relay_address();
    let mut client = RawRelay::connect(&addr).await;
    let mut link = RawRelay::connect(&addr).await;
    introduce(&mut client, "NICK walker").await;
    introduce(&mut link, "SERVER hub.test :hub").await;

    drop(client);
    let quit = link.line().await.unwrap();
    assert!(quit.starts_with(":walker QUIT"), "got {quit}");

    link.send("QUIT :maintenance").await;
    let error = link.line().await.unwrap();
    assert_eq!(error, "ERROR :Closing Link: maintenance");
    assert_eq!(link.line().await, None);
}

#[tokio::test]
async fn server_split_is_reported_to_clients() {
    let server = TestServer::spawn().await.unwrap();
    let addr = server.relay_address();
    let mut client = RawRelay::connect(&addr).await;
    let mut link = RawRelay::connect(&addr).await;
    introduce(&mut client, "NICK watcher").await;
    introduce(&mut link, "SERVER leaf.test :leaf").await;

    link.send("QUIT :split").await;
    assert_eq!(client.line().await.as_deref(), Some("SQUIT leaf.test :split"));
}
