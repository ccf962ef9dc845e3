pub mod formatters;
pub mod logging;
