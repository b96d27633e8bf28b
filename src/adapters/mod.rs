//! Hardware adapter implementations
//!
//! An adapter owns the byte stream to an instrument and performs one
//! command/response exchange at a time. Instrument drivers only ever talk to
//! the [`Adapter`] trait, so they can be exercised against [`MockAdapter`]
//! without a socket.

pub mod line_adapter;
pub mod mock;

pub use line_adapter::{
    LineAdapter, LineAdapterBuilder, TcpLineAdapter, REPLY_TERMINATOR_WIDTH, WRITE_TERMINATOR,
};
pub use mock::MockAdapter;

use crate::error::AppResult;
use async_trait::async_trait;

/// One-shot command/response transport.
#[async_trait]
pub trait Adapter: Send {
    /// Send `command` and return the reply payload with its terminator removed.
    ///
    /// # Errors
    /// - `DaqError::Io` on write or read failure
    /// - `DaqError::ConnectionClosed` if the peer hangs up mid-reply
    /// - `DaqError::Timeout` if a read deadline is configured and elapses
    async fn exchange(&mut self, command: &str) -> AppResult<String>;
}

#[async_trait]
impl<A: Adapter + ?Sized> Adapter for Box<A> {
    async fn exchange(&mut self, command: &str) -> AppResult<String> {
        (**self).exchange(command).await
    }
}
