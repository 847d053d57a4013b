pub mod handlers;
pub mod sic_lookup;
