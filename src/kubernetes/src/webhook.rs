pub mod admission;
pub mod backend_group;
pub mod backend_record;
pub mod bind;
pub mod config;
pub mod driver;
pub mod error;
pub mod load_balancer;
pub mod load_balancer_driver;
pub mod patch;
pub mod server;
pub mod validation;
