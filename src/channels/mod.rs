//! Channel abstraction for message I/O.

pub mod channel;
pub mod group_log;
pub mod whatsapp;

pub use channel::Channel;
pub use group_log::{GroupLogEntry, GroupLogStore};
pub use whatsapp::{ConnectionState, WhatsAppChannel};
