pub mod grid;
pub mod validity;
