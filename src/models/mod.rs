// Models module - Database entity representations

pub mod approval_request;
pub mod entity_status;
pub mod role;

pub use approval_request::{ApprovalRequest, ApprovalStatus, OperationKind};
pub use entity_status::{EntityLifecycle, EntityStatus};
pub use role::Role;
