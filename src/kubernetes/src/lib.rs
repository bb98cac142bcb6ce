pub mod context;
pub mod crd;
pub mod fixture;
pub mod lister;
pub mod util;
pub mod webhook;
