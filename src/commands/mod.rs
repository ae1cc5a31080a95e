pub mod check;
pub mod ping;
