pub mod expose_formatter;
pub mod transport;
