//! Route handlers, one module per resource.

pub mod strikes;
pub mod subjects;
