//! Lead book: the people outreach gets drafted for.

mod model;
mod repository;

pub use model::{Lead, LeadId};
pub use repository::{ImportSummary, LeadRepository};
