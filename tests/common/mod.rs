#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use kvrelay::{Config, KeyValueStore, ReplicationManager, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

pub const READ_TIMEOUT: Duration = Duration::from_secs(3);

pub struct Running {
    pub addr: SocketAddr,
    pub store: Arc<KeyValueStore>,
    pub replication: Arc<ReplicationManager>,
}

/// Start a server on an ephemeral port
pub async fn start(mut config: Config) -> Result<Running> {
    config.port = 0;
    let server = Server::bind(&config).await?;
    let port = server.local_addr()?.port();
    let running = Running {
        addr: SocketAddr::from(([127, 0, 0, 1], port)),
        store: server.store(),
        replication: server.replication(),
    };
    tokio::spawn(server.run());
    Ok(running)
}

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.context("connect")?;
        Ok(Client { stream })
    }

    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Read exactly `n` bytes
    pub async fn read_n(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        timeout(READ_TIMEOUT, self.stream.read_exact(&mut buf))
            .await
            .context("timed out reading reply")??;
        Ok(buf)
    }

    /// Send a request and expect exactly `reply` back
    pub async fn expect(&mut self, request: &[u8], reply: &[u8]) -> Result<()> {
        self.send(request).await?;
        let got = self.read_n(reply.len()).await?;
        if got != reply {
            return Err(anyhow!(
                "expected {:?}, got {:?}",
                String::from_utf8_lossy(reply),
                String::from_utf8_lossy(&got)
            ));
        }
        Ok(())
    }

    /// Read a single CRLF-terminated line, CRLF included
    pub async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        while !line.ends_with(b"\r\n") {
            line.extend(self.read_n(1).await?);
        }
        Ok(line)
    }

    /// Wait for the peer to close the connection
    pub async fn expect_eof(&mut self) -> Result<()> {
        let mut buf = [0u8; 64];
        loop {
            let n = timeout(READ_TIMEOUT, self.stream.read(&mut buf))
                .await
                .context("timed out waiting for close")??;
            if n == 0 {
                return Ok(());
            }
        }
    }
}

/// Poll `check` until it holds or the deadline passes
pub async fn eventually<F, Fut>(what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check().await {
            return Ok(());
        }
        sleep(Duration::from_millis(20)).await;
    }
    Err(anyhow!("timed out waiting for {}", what))
}
