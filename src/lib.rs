//! `arq-over-udp` — reliable, ordered line transfer over UDP using a
//! Go-Back-N ARQ protocol.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────┐    requests     ┌────────────────┐
//!  │ ArqClient │────────────────▶│ LossSimulator  │──▶┌─────────────┐
//!  │ (window,  │                 │ (server-side   │   │ ArqReceiver │
//!  │  ticks)   │◀────────────────│  drop filter)  │◀──│ (cumulative │
//!  └─────┬─────┘  acknowledgments└────────────────┘   │   acks)     │
//!        │                                            └──────┬──────┘
//!        │ raw UDP datagrams                                 │
//!  ┌─────▼──────┐                                     ┌──────▼──────┐
//!  │  Endpoint  │ (thin async wrapper around tokio    │TransferSink │
//!  └────────────┘  UdpSocket, peer bookkeeping)       └─────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (serialise / deserialise)
//! - [`window`]    — sender ring-buffer window state machine
//! - [`client`]    — interval-paced send driver (open / send_unit / close)
//! - [`receiver`]  — cumulative-ACK receive transform
//! - [`simulator`] — seedable loss injection for exercising recovery
//! - [`endpoint`]  — async UDP endpoint abstraction
//! - [`sink`]      — application sink the receiver delivers to
//! - [`server`]    — bind + receive/process/answer loop

pub mod client;
pub mod endpoint;
pub mod packet;
pub mod receiver;
pub mod server;
pub mod simulator;
pub mod sink;
pub mod window;
