//! Entry point for `arq-over-udp`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client**
//! mode.  All protocol work is delegated to library modules; this file owns
//! only process setup (logging, argument parsing) and the application glue:
//! feeding file lines to the client, pointing the server at its output file.

use std::io::BufRead;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use arq_over_udp::client::ArqClient;
use arq_over_udp::packet::MAX_PAYLOAD;
use arq_over_udp::server::Server;
use arq_over_udp::simulator::LossSimulator;
use arq_over_udp::sink::FileSink;
use arq_over_udp::window::MAX_WINDOW;

/// Reliable line transfer over UDP (Go-Back-N ARQ).
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive a transfer and write it to a file.
    Server {
        /// UDP port to listen on.
        #[arg(short, long, default_value_t = 3333)]
        port: u16,
        /// Output file the received payload is written to.
        #[arg(short, long)]
        output: PathBuf,
        /// Probability that an inbound request is dropped (0.0..=1.0).
        #[arg(short = 'r', long, default_value_t = 0.0)]
        request_loss: f64,
        /// Probability that an outbound acknowledgment is dropped (0.0..=1.0).
        #[arg(short = 'a', long, default_value_t = 0.0)]
        answer_loss: f64,
    },
    /// Send a file line by line to a server.
    Client {
        /// Server address; loopback when omitted.
        #[arg(short, long)]
        address: Option<String>,
        /// Server UDP port.
        #[arg(short, long, default_value_t = 3333)]
        port: u16,
        /// Input file to transfer.
        #[arg(short, long)]
        file: PathBuf,
        /// Go-Back-N window size (1..=10).
        #[arg(short, long, default_value_t = 1)]
        window: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    match Cli::parse().mode {
        Mode::Server {
            port,
            output,
            request_loss,
            answer_loss,
        } => run_server(port, output, request_loss, answer_loss).await,
        Mode::Client {
            address,
            port,
            file,
            window,
        } => run_client(address.as_deref(), port, &file, window).await,
    }
}

async fn run_server(
    port: u16,
    output: PathBuf,
    request_loss: f64,
    answer_loss: f64,
) -> Result<()> {
    for (name, p) in [("request-loss", request_loss), ("answer-loss", answer_loss)] {
        if !(0.0..=1.0).contains(&p) {
            bail!("{name} probability {p} is outside 0.0..=1.0");
        }
    }

    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    let mut server = Server::bind(
        addr,
        LossSimulator::new(request_loss),
        LossSimulator::new(answer_loss),
    )
    .await
    .with_context(|| format!("cannot listen on port {port}"))?;

    let mut sink = FileSink::new(output);
    server.run(&mut sink).await?;
    Ok(())
}

async fn run_client(
    address: Option<&str>,
    port: u16,
    file: &Path,
    window: usize,
) -> Result<()> {
    if !(1..=MAX_WINDOW).contains(&window) {
        bail!("window size must be within 1..={MAX_WINDOW}");
    }

    let mut reader = std::io::BufReader::new(
        std::fs::File::open(file).with_context(|| format!("cannot open {}", file.display()))?,
    );
    log::info!("sending file {}", file.display());

    let mut client = ArqClient::connect(address, port).await?;
    client
        .open(window)
        .await
        .context("session open failed")?;

    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("cannot read {}", file.display()))?;
        if n == 0 {
            break;
        }
        // Over-long lines go out as multiple payload units.
        for unit in line.chunks(MAX_PAYLOAD) {
            client
                .send_unit(unit, window)
                .await
                .context("data transfer failed")?;
        }
    }

    client.close(window).await.context("close failed")?;
    log::info!("transfer complete");
    Ok(())
}
