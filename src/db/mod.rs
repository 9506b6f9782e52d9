pub mod classes;
pub mod memberships;
pub mod overlays;
pub mod tasks;
pub mod users;
