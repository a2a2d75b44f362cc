pub mod allocation;
pub mod fixed_fund;
pub mod folio;
pub mod movements;
pub mod stock;
