pub mod core;
pub mod idcards;
pub mod notify;
pub mod records;
pub mod session;
pub mod tables;
