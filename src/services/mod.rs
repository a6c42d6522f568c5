// Services module - Business logic

pub mod approval_gate;
pub mod approval_resolution;
