//! Business logic services

pub mod address;
pub mod customer;

pub use address::AddressService;
pub use customer::CustomerService;
