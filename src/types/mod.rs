mod models;
mod role;

pub use models::*;
pub use role::{EffectiveRole, MemberRole};
