pub mod analyzers;
pub mod fetch;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod output;
pub mod record;
pub mod report;
