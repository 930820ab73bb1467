pub mod orders;
pub mod ws;
