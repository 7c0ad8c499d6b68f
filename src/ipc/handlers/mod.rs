pub mod core;
pub mod jokes;
pub mod quiz;
pub mod stats;
pub mod students;
