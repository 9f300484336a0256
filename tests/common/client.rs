//! Test IRC client.
//!
//! Provides an IRC client for integration testing that can send commands
//! and assert on received responses.

use braid_proto::Message;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test IRC client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    nick: String,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str, nick: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            nick: nick.to_string(),
        })
    }

    /// Connect and register in one step.
    pub async fn connect_registered(address: &str, nick: &str) -> anyhow::Result<Self> {
        let mut client = Self::connect(address, nick).await?;
        client.register().await?;
        Ok(client)
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Send a raw IRC line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single message from the server.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive messages until the predicate matches, returning all of them.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Message>>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                break;
            }
        }
        Ok(messages)
    }

    /// Receive messages until one with `command` arrives, and return it.
    pub async fn expect(&mut self, command: &str) -> anyhow::Result<Message> {
        let mut messages = self.recv_until(|m| m.is_command(command)).await?;
        messages
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no {command} received"))
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) -> anyhow::Result<()> {
        match self.recv_timeout(Duration::from_millis(200)).await {
            Ok(msg) => anyhow::bail!("unexpected message: {msg}"),
            Err(_) => Ok(()),
        }
    }

    /// Wait for the server to close the connection.
    pub async fn expect_closed(&mut self) -> anyhow::Result<()> {
        loop {
            let mut line = String::new();
            let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
            if n == 0 {
                return Ok(());
            }
        }
    }

    /// Register with the server (NICK + USER) and wait for the end of the
    /// welcome burst.
    pub async fn register(&mut self) -> anyhow::Result<()> {
        let nick = self.nick.clone();
        self.send_raw(&format!("NICK {nick}")).await?;
        self.send_raw(&format!("USER {nick} 0 * :Test User {nick}"))
            .await?;
        let messages = self
            .recv_until(|m| m.is_command("376") || m.is_command("422"))
            .await?;
        if messages.iter().any(|m| m.is_command("001")) {
            Ok(())
        } else {
            anyhow::bail!("Registration failed: no RPL_WELCOME received")
        }
    }

    /// Join a channel and wait for the end of NAMES.
    pub async fn join(&mut self, channel: &str) -> anyhow::Result<Vec<Message>> {
        self.send_raw(&format!("JOIN {channel}")).await?;
        self.recv_until(|m| m.is_command("366")).await
    }

    pub async fn privmsg(&mut self, target: &str, text: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("PRIVMSG {target} :{text}")).await
    }

    pub async fn quit(&mut self, reason: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("QUIT :{reason}")).await
    }
}
