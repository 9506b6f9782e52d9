pub mod class;
pub mod membership;
pub mod page;
pub mod task;
pub mod user;

pub use class::{Class, ClassStatus, ClassSummary, InviteCodeResponse, NewClassRequest};
pub use membership::{
    ApprovalActionRequest, ClassRole, JoinRequest, JoinStatus, ManagedApplication, MemberInfo,
    Membership, PendingApplication, RoleChangeRequest, RoleInfo,
};
pub use page::{Page, PageParams};
pub use task::{
    NewTaskRequest, StatusUpdateRequest, SyncResult, Task, TaskOverlay, TaskStatus, TaskType,
    TaskView, UpdateTaskRequest,
};
pub use user::{NewUserRequest, User};
