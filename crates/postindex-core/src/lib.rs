#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{ContentStore, SearchEngine};
