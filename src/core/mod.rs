pub mod candy_machine;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod rpc;
pub mod wallet;
