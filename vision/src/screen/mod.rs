pub mod arena;
pub mod levelup;
