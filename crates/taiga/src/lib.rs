//! Taiga project management API client.
//!
//! [`TaigaApi`] is the narrow contract the tools act on. [`TaigaClient`] is
//! the `reqwest` implementation; [`TaigaConnector`] owns the shared connection
//! pool and hands out one client per caller token.

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod retry;

pub use api::TaigaApi;
pub use client::{TaigaClient, TaigaConnector};
pub use error::TaigaError;
pub use models::{Milestone, NewTask, NewUserStory, Project, Task, UserStory};
pub use retry::RetryPolicy;
