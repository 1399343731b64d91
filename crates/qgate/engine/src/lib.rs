//! # qgate engine - flow-control gates for message pipelines
//!
//! A gate receives a stream of messages. Control messages (those whose
//! control field equals the configured control topic) change its [`Mode`];
//! data messages are forwarded, discarded or queued depending on that mode.
//!
//! ## Key Components
//!
//! - [`GateMachine`]: synchronous mode and queue logic
//! - [`GateQueue`]: bounded FIFO with drop-newest or keep-newest overflow
//! - [`RenegeFilter`]: removal of queued messages by a field match
//! - [`RecordStore`]: persisted mode, queue and pending expiries
//! - [`GateBuilder`] / [`GateHandle`]: one worker task per gate
//! - [`GateRegistry`]: many named gates over one shared store
//!
//! ## Example
//!
//! ```rust,no_run
//! use qgate_engine::GateBuilder;
//! use qgate_types::{GateConfig, Message, Mode};
//!
//! # async fn example() -> qgate_engine::GateResult<()> {
//! let config = GateConfig {
//!     default_mode: Mode::Queueing,
//!     ..GateConfig::default()
//! };
//! let gate = GateBuilder::new(config).spawn().await?;
//!
//! gate.dispatch(Message::new().with("payload", 1)).await?;
//! let released = gate
//!     .dispatch(Message::new().with("topic", "control").with("payload", "open"))
//!     .await?;
//! println!("{:?}", released);
//! # Ok(())
//! # }
//! ```
//!
//! [`Mode`]: qgate_types::Mode

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod builder;
mod error;
mod machine;
mod queue;
mod record;
mod registry;
mod renege;
mod router;
mod runtime;
mod timer;

pub use builder::{GateBuilder, DEFAULT_MAILBOX_CAPACITY};
pub use error::{GateError, GateResult};
pub use machine::{Classification, GateMachine, Outcome};
pub use queue::{GateQueue, Offer, Queued, Ticket};
pub use record::{ExpiryJob, GateRecord, RecordStore};
pub use registry::GateRegistry;
pub use renege::{PathSegment, RenegeFilter};
pub use router::{route, Disposition};
pub use runtime::{GateHandle, GateSnapshot};
pub use timer::{TimerHandle, TimerService, TokioTimer};
