use tenantgate_core::{AppError, AppResult, UserId};
use tracing::info;

use crate::state::AppState;

const DEV_SEED_SELECTOR: &str = "demo";
const DEV_SEED_NAME: &str = "Demo Organization";

/// Provisions the demo organization for `owner` unless it already exists.
pub async fn run(app_state: &AppState, owner: &str) -> AppResult<()> {
    let owner = UserId::new(owner)?;

    match app_state
        .role_admin_service
        .provision_organization(owner.clone(), DEV_SEED_SELECTOR, DEV_SEED_NAME)
        .await
    {
        Ok(organization) => {
            info!(
                organization_id = %organization.id(),
                owner = %owner,
                selector = DEV_SEED_SELECTOR,
                "seeded development organization"
            );
            Ok(())
        }
        Err(AppError::Conflict(_)) => {
            info!(selector = DEV_SEED_SELECTOR, "development organization already present");
            Ok(())
        }
        Err(error) => Err(error),
    }
}
