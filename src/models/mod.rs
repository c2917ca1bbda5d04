pub mod date_key;
pub mod entry;
pub mod quota;
pub mod report;
pub mod settings;
pub mod stat;
pub mod week;
