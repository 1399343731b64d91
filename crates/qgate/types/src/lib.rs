//! Core types for the qgate flow-control gate.
//!
//! A gate sits at one position of a message pipeline and, depending on its
//! [`Mode`], passes data messages through, discards them, or buffers them for
//! later release. This crate holds the vocabulary shared by the engine, the
//! storage adapters and the host binary:
//! - [`Mode`] and [`ToggleMode`]
//! - [`Message`] and [`MessageId`]
//! - [`Command`] and the configurable [`CommandVocabulary`]
//! - [`GateStatus`], the descriptor published on the status channel
//! - [`Emission`], what a handled event sends downstream
//! - [`GateConfig`], the configuration surface of one gate instance

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod command;
mod config;
mod error;
mod message;
mod mode;
mod status;

pub use command::{Command, CommandVocabulary};
pub use config::{Capacity, FieldNames, GateConfig, PersistenceConfig};
pub use error::{TypesError, TypesResult};
pub use message::{Emission, Message, MessageId};
pub use mode::{Mode, ToggleMode};
pub use status::{GateStatus, StatusFill, StatusShape};
