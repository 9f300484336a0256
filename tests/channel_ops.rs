//! Integration tests for channel operator commands: MODE, TOPIC, KICK,
//! INVITE.

mod common;

use common::{TestClient, TestServer};

async fn op_and_member(server: &TestServer, channel: &str) -> (TestClient, TestClient) {
    let mut op = TestClient::connect_registered(&server.address(), "op")
        .await
        .unwrap();
    let mut member = TestClient::connect_registered(&server.address(), "member")
        .await
        .unwrap();
    op.join(channel).await.unwrap();
    member.join(channel).await.unwrap();
    op.expect("JOIN").await.unwrap();
    (op, member)
}

#[tokio::test]
async fn only_operators_change_modes() {
    let server = TestServer::spawn().await.unwrap();
    let (mut op, mut member) = op_and_member(&server, "#modes").await;

    member.send_raw("MODE #modes +i").await.unwrap();
    assert_eq!(member.recv().await.unwrap().command, "482");

    op.send_raw("MODE #modes +kl secret 5").await.unwrap();
    let change = member.expect("MODE").await.unwrap();
    assert_eq!(change.arg(1), Some("+kl"));
    assert_eq!(change.arg(2), Some("secret"));
    assert_eq!(change.arg(3), Some("5"));
    op.expect("MODE").await.unwrap();

    member.send_raw("MODE #modes").await.unwrap();
    let modes = member.expect("324").await.unwrap();
    assert_eq!(modes.arg(1), Some("#modes"));
    assert!(modes.arg(2).unwrap().contains('k'));
}

#[tokio::test]
async fn granting_op_lets_member_set_topic() {
    let server = TestServer::spawn().await.unwrap();
    let (mut op, mut member) = op_and_member(&server, "#topics").await;

    member.send_raw("TOPIC #topics :mine now").await.unwrap();
    assert_eq!(member.recv().await.unwrap().command, "482");

    op.send_raw("MODE #topics +o member").await.unwrap();
    member.expect("MODE").await.unwrap();
    member.send_raw("TOPIC #topics :mine now").await.unwrap();
    let topic = op.expect("TOPIC").await.unwrap();
    assert_eq!(topic.arg(1), Some("mine now"));

    let mut late = TestClient::connect_registered(&server.address(), "late")
        .await
        .unwrap();
    let replies = late.join("#topics").await.unwrap();
    let rpl = replies.iter().find(|m| m.is_command("332")).unwrap();
    assert_eq!(rpl.arg(2), Some("mine now"));
    assert!(replies.iter().any(|m| m.is_command("333")));
}

#[tokio::test]
async fn kick_removes_member() {
    let server = TestServer::spawn().await.unwrap();
    let (mut op, mut member) = op_and_member(&server, "#kicks").await;

    op.send_raw("KICK #kicks member :behave").await.unwrap();
    let kick = member.expect("KICK").await.unwrap();
    assert_eq!(kick.arg(1), Some("member"));
    assert_eq!(kick.arg(2), Some("behave"));

    member.privmsg("#kicks", "still here?").await.unwrap();
    assert_eq!(member.expect("404").await.unwrap().arg(1), Some("#kicks"));

    op.send_raw("KICK #kicks member").await.unwrap();
    assert_eq!(op.expect("441").await.unwrap().arg(1), Some("member"));
}

#[tokio::test]
async fn invite_only_channel_admits_invited_users() {
    let server = TestServer::spawn().await.unwrap();
    let mut op = TestClient::connect_registered(&server.address(), "op")
        .await
        .unwrap();
    let mut guest = TestClient::connect_registered(&server.address(), "guest")
        .await
        .unwrap();
    op.join("#vip").await.unwrap();
    op.send_raw("MODE #vip +i").await.unwrap();
    op.expect("MODE").await.unwrap();

    guest.send_raw("JOIN #vip").await.unwrap();
    assert_eq!(guest.recv().await.unwrap().command, "473");

    op.send_raw("INVITE guest #vip").await.unwrap();
    assert_eq!(op.expect("341").await.unwrap().arg(1), Some("guest"));
    let invite = guest.expect("INVITE").await.unwrap();
    assert_eq!(invite.arg(1), Some("#vip"));

    let replies = guest.join("#vip").await.unwrap();
    assert!(replies[0].is_command("JOIN"));
}

#[tokio::test]
async fn bans_and_keys_gate_joins() {
    let server = TestServer::spawn().await.unwrap();
    let mut op = TestClient::connect_registered(&server.address(), "op")
        .await
        .unwrap();
    let mut troll = TestClient::connect_registered(&server.address(), "troll")
        .await
        .unwrap();
    op.join("#gate").await.unwrap();

    op.send_raw("MODE #gate +b troll").await.unwrap();
    let ban = op.expect("MODE").await.unwrap();
    assert_eq!(ban.arg(2), Some("troll!*@*"));
    troll.send_raw("JOIN #gate").await.unwrap();
    assert_eq!(troll.recv().await.unwrap().command, "474");

    op.send_raw("MODE #gate b").await.unwrap();
    let list = op.recv_until(|m| m.is_command("368")).await.unwrap();
    assert_eq!(list[0].command, "367");
    assert_eq!(list[0].arg(2), Some("troll!*@*"));

    op.send_raw("MODE #gate -b+k troll!*@* hunter2").await.unwrap();
    op.expect("MODE").await.unwrap();
    troll.send_raw("JOIN #gate").await.unwrap();
    assert_eq!(troll.recv().await.unwrap().command, "475");
    let replies = troll.join("#gate hunter2").await.unwrap();
    assert!(replies[0].is_command("JOIN"));
}
