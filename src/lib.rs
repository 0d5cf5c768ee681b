pub mod compiler;
pub mod config;
pub mod dialect;
pub mod dom;
pub mod error;
pub mod eval;
pub mod pipeline;
pub mod precompile;
pub mod provider;
pub mod translator;
pub mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Command, QueryPipeline};
