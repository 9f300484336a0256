//! Integration tests for channel membership and message fan-out.

mod common;

use common::{TestClient, TestServer};

async fn pair(server: &TestServer, channel: &str) -> (TestClient, TestClient) {
    let mut alice = TestClient::connect_registered(&server.address(), "alice")
        .await
        .unwrap();
    let mut bob = TestClient::connect_registered(&server.address(), "bob")
        .await
        .unwrap();
    alice.join(channel).await.unwrap();
    bob.join(channel).await.unwrap();
    alice.expect("JOIN").await.unwrap();
    (alice, bob)
}

#[tokio::test]
async fn join_echoes_and_lists_names() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = TestClient::connect_registered(&server.address(), "alice")
        .await
        .unwrap();

    let replies = alice.join("#Rust").await.unwrap();
    assert!(replies[0].is_command("JOIN"));
    assert_eq!(replies[0].arg(0), Some("#Rust"));
    let names = replies.iter().find(|m| m.is_command("353")).unwrap();
    assert_eq!(names.arg(2), Some("#Rust"));
    assert_eq!(names.arg(3), Some("@alice"));
    assert_eq!(server.channel_count().await, 1);
}

#[tokio::test]
async fn channel_privmsg_skips_the_sender() {
    let server = TestServer::spawn().await.unwrap();
    let (mut alice, mut bob) = pair(&server, "#chat").await;

    alice.privmsg("#chat", "hello there").await.unwrap();
    let msg = bob.expect("PRIVMSG").await.unwrap();
    assert!(msg.prefix.as_deref().unwrap().starts_with("alice!"));
    assert_eq!(msg.arg(0), Some("#chat"));
    assert_eq!(msg.arg(1), Some("hello there"));
    alice.expect_silence().await.unwrap();
}

#[tokio::test]
async fn outsiders_cannot_send_to_channel() {
    let server = TestServer::spawn().await.unwrap();
    let (_alice, mut bob) = pair(&server, "#closed").await;
    let mut carol = TestClient::connect_registered(&server.address(), "carol")
        .await
        .unwrap();

    carol.privmsg("#closed", "let me in").await.unwrap();
    let reply = carol.recv().await.unwrap();
    assert_eq!(reply.command, "404");
    bob.expect_silence().await.unwrap();

    carol.send_raw("NOTICE #closed :quietly").await.unwrap();
    carol.expect_silence().await.unwrap();
}

#[tokio::test]
async fn private_messages_and_away() {
    let server = TestServer::spawn().await.unwrap();
    let mut alice = TestClient::connect_registered(&server.address(), "alice")
        .await
        .unwrap();
    let mut bob = TestClient::connect_registered(&server.address(), "bob")
        .await
        .unwrap();

    bob.send_raw("AWAY :gone fishing").await.unwrap();
    assert_eq!(bob.recv().await.unwrap().command, "306");

    alice.privmsg("BOB", "ping?").await.unwrap();
    let msg = bob.expect("PRIVMSG").await.unwrap();
    assert_eq!(msg.arg(1), Some("ping?"));
    let away = alice.recv().await.unwrap();
    assert_eq!(away.command, "301");
    assert_eq!(away.arg(2), Some("gone fishing"));

    alice.send_raw("NOTICE bob :no away reply").await.unwrap();
    bob.expect("NOTICE").await.unwrap();
    alice.expect_silence().await.unwrap();
}

#[tokio::test]
async fn part_notifies_members_and_destroys_empty_channels() {
    let server = TestServer::spawn().await.unwrap();
    let (mut alice, mut bob) = pair(&server, "#brief").await;

    bob.send_raw("PART #brief :later").await.unwrap();
    let part = alice.expect("PART").await.unwrap();
    assert_eq!(part.arg(1), Some("later"));
    bob.expect("PART").await.unwrap();

    bob.send_raw("PART #brief").await.unwrap();
    assert_eq!(bob.recv().await.unwrap().command, "442");

    alice.send_raw("JOIN 0").await.unwrap();
    alice.expect("PART").await.unwrap();
    assert_eq!(server.channel_count().await, 0);
}

#[tokio::test]
async fn nick_change_is_seen_once_per_peer() {
    let server = TestServer::spawn().await.unwrap();
    let (mut alice, mut bob) = pair(&server, "#one").await;
    alice.join("#two").await.unwrap();
    bob.join("#two").await.unwrap();
    alice.expect("JOIN").await.unwrap();

    alice.send_raw("NICK alicia").await.unwrap();
    let own = alice.expect("NICK").await.unwrap();
    assert_eq!(own.arg(0), Some("alicia"));
    let seen = bob.expect("NICK").await.unwrap();
    assert!(seen.prefix.as_deref().unwrap().starts_with("alice!"));
    bob.expect_silence().await.unwrap();

    bob.privmsg("alicia", "new name?").await.unwrap();
    let msg = alice.expect("PRIVMSG").await.unwrap();
    assert_eq!(msg.arg(0), Some("alicia"));
}

#[tokio::test]
async fn list_and_who() {
    let server = TestServer::spawn().await.unwrap();
    let (mut alice, _bob) = pair(&server, "#listed").await;

    alice.send_raw("LIST").await.unwrap();
    let replies = alice.recv_until(|m| m.is_command("323")).await.unwrap();
    let entry = replies.iter().find(|m| m.is_command("322")).unwrap();
    assert_eq!(entry.arg(1), Some("#listed"));
    assert_eq!(entry.arg(2), Some("2"));

    alice.send_raw("WHO #listed").await.unwrap();
    let replies = alice.recv_until(|m| m.is_command("315")).await.unwrap();
    let who: Vec<_> = replies.iter().filter(|m| m.is_command("352")).collect();
    assert_eq!(who.len(), 2);
}

#[tokio::test]
async fn long_messages_are_cut_to_fit_the_line() {
    let server = TestServer::spawn().await.unwrap();
    let (mut alice, mut bob) = pair(&server, "#long").await;
    let text = "x".repeat(480);

    alice.privmsg("bob", &text).await.unwrap();
    let direct = bob.expect("PRIVMSG").await.unwrap();
    let body = direct.arg(1).unwrap();
    assert!(body.len() < text.len() && text.starts_with(body));
    assert!(direct.to_line().unwrap().len() <= braid_proto::MAX_LINE_LEN);

    alice.privmsg("#long", &text).await.unwrap();
    let fanned = bob.expect("PRIVMSG").await.unwrap();
    assert_eq!(fanned.arg(0), Some("#long"));
    assert!(!fanned.arg(1).unwrap().is_empty());
    alice.expect_silence().await.unwrap();
}
