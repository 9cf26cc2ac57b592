pub mod counter;
pub mod fallback;
pub mod youtube;
