// lib.rs
#![warn(clippy::large_futures)]

pub use anyhow::bail;
pub use std::{
    io,
    sync::atomic::{AtomicU32, Ordering},
};
pub use tokio::time::{sleep, Duration};
pub use tracing::{debug, error, info, warn};

mod config;
pub use config::*;

mod clock;
pub use clock::*;

mod request;
pub use request::*;

mod response;
pub use response::*;

mod transport;
pub use transport::*;

mod timesync;
pub use timesync::*;

mod record;
pub use record::*;

mod telemetry;
pub use telemetry::*;

mod multipart;
pub use multipart::*;

mod camera;
pub use camera::*;

mod link;
pub use link::*;

mod node;
pub use node::*;

mod drivers;
pub use drivers::*;

#[cfg(feature = "esp")]
pub mod esp;

// EOF
