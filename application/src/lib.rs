pub mod boundary;
pub mod service;
pub mod transfer;
