//! Language server runtime that hosts several feature servers behind one
//! client connection.
//!
//! A [`Coordinator`] owns the connection and an ordered list of
//! [`ServerFacade`]s. Each facade is the handle one feature server registers
//! its handlers on; the coordinator fans incoming messages out to them and
//! folds their answers back into a single response.

pub mod config;
pub mod facade;
pub mod handler;
pub mod notification;
pub mod server;
pub mod service;
pub mod workspace;

mod test_utils;

pub use config::{InitializationOptions, RuntimeConfig};
pub use facade::ServerFacade;
pub use handler::{HandlerSlot, Routed};
pub use notification::NotificationRouter;
pub use server::{Coordinator, build_service};
pub use service::MuxService;
pub use workspace::WorkspaceFolderSet;
