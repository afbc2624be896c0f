pub mod documents;
pub mod downloads;
pub mod filing;
pub mod plan;
pub mod reconcile;
pub mod report;
