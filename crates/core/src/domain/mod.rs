pub mod filter;
pub mod record;
