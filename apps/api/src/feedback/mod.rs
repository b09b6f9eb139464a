pub mod aggregate;
pub mod extraction;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod prompts;
pub mod schema;
pub mod service;
pub mod session;
pub mod validation;
