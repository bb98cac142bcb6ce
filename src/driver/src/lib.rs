//! Wire contract between the admission server and load balancer drivers.
//!
//! A driver is an external process reachable over HTTP. Every operation is a
//! `POST {driverURL}/{webhookName}` with a JSON body, bounded by the timeout the
//! driver declares for that webhook.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod invoker;
pub mod types;
pub mod webhook;
