// src/lib.rs
pub mod config;
pub mod connector;
pub mod nft_utils;
pub mod notify;
pub mod rewards;
pub mod rpc;
pub mod signing;
pub mod wallet;

#[cfg(test)]
mod test_support;
