mod convert;
mod crud;
mod database;
mod dialect;
mod error;
mod executor;
mod metadata;
mod naming;
mod options;
mod query;
mod record;
mod scan;
mod sql_context;
mod transaction;
mod util;
mod value;
mod value_group;

pub use ::anyhow::Context;
pub use convert::*;
pub use crud::*;
pub use database::*;
pub use dialect::*;
pub use error::*;
pub use executor::*;
pub use metadata::*;
pub use naming::*;
pub use options::*;
pub use query::*;
pub use record::*;
pub use scan::*;
pub use sql_context::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use value_group::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
