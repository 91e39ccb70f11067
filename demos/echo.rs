//! Minimal echo server/client exercising the public surface end to end:
//! bind-listen-accept on one side, connect-send-recv on the other, both
//! driven from a single-threaded `tokio` runtime with no direct SRT calls.
//!
//! Grounded on `srt/examples/simple.rs`'s `clap`-driven server/client split,
//! adapted to this crate's `Acceptor`/`Socket` types in place of that
//! example's `Listener`/`Socket`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use srt_async::{Acceptor, OptionSet, Socket};

#[derive(Parser, Clone)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    #[arg(long)]
    addr: SocketAddr,
    #[arg(long)]
    server: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    srt_async::get_instance();

    if args.server {
        run_server(args.addr).await?;
    } else {
        run_client(args.addr).await?;
    }

    srt_async::shutdown();
    Ok(())
}

async fn run_server(addr: SocketAddr) -> Result<(), anyhow::Error> {
    let acceptor = Acceptor::new(OptionSet::new());
    acceptor.bind(&addr.ip().to_string(), addr.port())?;
    acceptor.listen(32)?;
    println!("listening on {addr}");

    loop {
        let (socket, peer) = acceptor.async_accept().await?;
        println!("accepted {peer}");
        let socket = Arc::new(socket);
        tokio::spawn(async move {
            let mut buf = [0u8; 1500];
            loop {
                match socket.async_read_packet(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if socket.async_write_packet(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }
}

async fn run_client(addr: SocketAddr) -> Result<(), anyhow::Error> {
    let socket = Socket::new(OptionSet::new());
    socket
        .async_connect(&addr.ip().to_string(), addr.port(), Some(Duration::from_secs(3)))
        .await?;

    let mut buf = [0u8; 13];
    for i in 0..5u8 {
        let payload = [b'p', b'i', b'n', b'g', b'-', i, 0, 0, 0, 0, 0, 0, 0];
        socket.async_write_packet(&payload).await?;
        let n = socket.async_read_packet(&mut buf).await?;
        println!("echo: {:?}", &buf[..n]);
    }

    if let Ok(stats) = socket.get_stats() {
        println!("stats: {stats:?}");
    }

    socket.close();
    Ok(())
}
