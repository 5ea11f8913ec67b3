use tracing::info;

use crate::common::MembershipResult;
use crate::domains::users::models::User;
use crate::kernel::ServerDeps;

/// Create a new user
pub async fn create_user(deps: &ServerDeps) -> MembershipResult<User> {
    let user = deps.users.create_user().await?;
    info!(user_id = %user.id, "user created");
    Ok(user)
}
