pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod policy;
pub mod store;
pub mod workflow;

pub use directory::{InMemoryManagerDirectory, ManagerAssignment, ManagerDirectory};
pub use domain::actor::{Actor, ActorId, Role};
pub use domain::approval::{ApprovalAction, ApprovalId, ApprovalPayload, WorkflowApproval};
pub use domain::request::{
    Priority, PurchaseRequest, RequestId, RequestStatus, Requester, Stage,
};
pub use errors::{InterfaceError, WorkflowError};
pub use notify::{
    InMemoryDispatcher, NoopDispatcher, Notification, NotificationDispatcher, Recipient,
};
pub use policy::{default_threshold, FixedThresholdPolicy, ThresholdPolicy};
pub use store::{
    statuses_awaiting, CommitError, DashboardStats, InMemoryWorkflowStore, RequestQueries,
    StageFilters, StorageError, WorkflowStore,
};
pub use workflow::{NewRequest, WorkflowAction, WorkflowService};
