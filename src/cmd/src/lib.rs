pub mod cmd;
pub mod webhook;
