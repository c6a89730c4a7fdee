#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod extract;
pub mod traits;
pub mod types;
