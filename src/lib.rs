pub mod convert;
pub mod fetch;
pub mod filter;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod registry;
