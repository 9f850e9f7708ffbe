pub use self::{
    block_cache::BlockCache,
    client::{ChainClient, ChainQuery},
    grpc::Grpc,
    http::HTTP,
    rate_limiter::RateLimiter,
};

mod block_cache;
mod client;
mod grpc;
mod http;
mod rate_limiter;

#[cfg(test)]
pub(crate) mod memory;
