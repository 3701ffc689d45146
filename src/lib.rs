pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod table;

pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, PipelineResult, Stage};
pub use table::{Column, Table, Value};
