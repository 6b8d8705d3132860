// Job Submission Bounded Context
// Registro durable de cada envío al scheduler batch

mod aggregate;

pub use aggregate::*;
