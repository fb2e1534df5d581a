pub mod api;
pub mod gateway;
pub mod service;

pub use crate::api::{BookPage, HttpLendingApi, LendingApi, LoginResponse};
pub use crate::gateway::ApiGateway;
pub use crate::service::LibraryService;
