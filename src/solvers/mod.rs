pub mod exact;
pub mod iterative;
