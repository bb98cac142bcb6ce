pub mod backend_group;
pub mod backend_record;
pub mod bind;
pub mod common;
pub mod error;
pub mod load_balancer;
pub mod load_balancer_driver;
