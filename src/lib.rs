pub mod config;
pub mod error;
pub mod evaluate;
pub mod monthly;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod utility;
pub mod validate;
