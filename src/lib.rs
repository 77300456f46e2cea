//! Dynamic SQL builder and record mapper.
//!
//! Records derive [`Record`], statements are rendered by a [`Crud`] following the
//! [`Dialect`] of the driver, and run on any [`Executor`]: a [`Database`] or one of its
//! transactions.
pub use quarry_core::*;
pub use quarry_macros::Record;
