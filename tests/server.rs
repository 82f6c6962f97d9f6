mod common;

use std::time::Duration;

use anyhow::Result;
use common::{start, Client};
use kvrelay::Config;

const REPLID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

fn leader() -> Config {
    Config {
        replication_id: REPLID.to_string(),
        ..Config::leader(0)
    }
}

#[tokio::test]
async fn ping_replies_pong() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client.expect(b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await?;
    client.expect(b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await?;
    Ok(())
}

#[tokio::test]
async fn echo_with_and_without_argument() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client
        .expect(b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n", b"$3\r\nhey\r\n")
        .await?;
    client.expect(b"*1\r\n$4\r\nECHO\r\n", b"$0\r\n\r\n").await?;
    Ok(())
}

#[tokio::test]
async fn set_then_get() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client
        .expect(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n", b"+OK\r\n")
        .await?;
    client
        .expect(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n", b"$3\r\nbar\r\n")
        .await?;
    client
        .expect(b"*2\r\n$3\r\nGET\r\n$7\r\nmissing\r\n", b"$-1\r\n")
        .await?;
    Ok(())
}

#[tokio::test]
async fn request_split_across_writes() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client.send(b"*3\r\n$3\r\nSE").await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.send(b"T\r\n$1\r\na\r\n$2\r").await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.expect(b"\nbc\r\n", b"+OK\r\n").await?;
    client
        .expect(b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n", b"$2\r\nbc\r\n")
        .await?;
    Ok(())
}

#[tokio::test]
async fn values_expire_lazily() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client
        .expect(
            b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\npx\r\n$3\r\n100\r\n",
            b"+OK\r\n",
        )
        .await?;
    client
        .expect(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n", b"$3\r\nbar\r\n")
        .await?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.store.len(), 1);

    client
        .expect(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n", b"$-1\r\n")
        .await?;
    assert!(server.store.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_integer_px_is_rejected_without_writing() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client
        .expect(
            b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\npx\r\n$4\r\nsoon\r\n",
            b"-ERR invalid expiry value\r\n",
        )
        .await?;
    client
        .expect(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n", b"$-1\r\n")
        .await?;
    Ok(())
}

#[tokio::test]
async fn command_errors_do_not_close_the_connection() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client
        .expect(b"*1\r\n$4\r\nFLUSH\r\n", b"-ERR unknown command 'FLUSH'\r\n")
        .await?;
    client
        .expect(
            b"*1\r\n$3\r\nGET\r\n",
            b"-ERR wrong number of arguments for 'get' command\r\n",
        )
        .await?;
    client.expect(b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await?;
    Ok(())
}

#[tokio::test]
async fn malformed_request_closes_the_connection() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client.send(b"*1\r\n$2\r\nPING\r\n").await?;
    let line = client.read_line().await?;
    assert!(line.starts_with(b"-ERR Protocol error"));
    client.expect_eof().await?;

    // Other connections are unaffected
    let mut other = Client::connect(server.addr).await?;
    other.expect(b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await?;
    Ok(())
}

#[tokio::test]
async fn oversized_request_is_rejected() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    client.send(b"*11\r\n").await?;
    let line = client.read_line().await?;
    assert!(line.starts_with(b"-ERR Protocol error"));
    client.expect_eof().await?;
    Ok(())
}

#[tokio::test]
async fn info_replication_on_leader() -> Result<()> {
    let server = start(leader()).await?;
    let mut client = Client::connect(server.addr).await?;

    let report = format!(
        "# Replication\r\nrole:master\r\nmaster_replid:{}\r\nmaster_repl_offset:0\r\n",
        REPLID
    );
    let reply = format!("${}\r\n{}\r\n", report.len(), report);
    client
        .expect(b"*2\r\n$4\r\nINFO\r\n$11\r\nreplication\r\n", reply.as_bytes())
        .await?;
    Ok(())
}
