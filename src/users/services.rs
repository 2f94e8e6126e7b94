use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::UserError;
use crate::users::{
    dto::Pagination,
    model::{User, UserInput},
    password,
    repo::UserRepository,
};

/// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_off_thread(plain: String) -> Result<String, UserError> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| UserError::Internal(format!("hashing task failed: {e}")))??;
    Ok(hash)
}

pub async fn create_user(repo: &dyn UserRepository, mut input: UserInput) -> Result<User, UserError> {
    input.normalize();
    input.apply_defaults();
    if let Err(errors) = input.validate_for_create() {
        warn!(fields = %errors, "create rejected");
        return Err(errors.into());
    }

    if repo.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(UserError::EmailTaken(input.email));
    }

    let hash = hash_off_thread(input.take_password()).await?;
    let user = User::new(input, hash)?;
    repo.insert(&user).await?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user created");
    Ok(user)
}

pub async fn update_user(
    repo: &dyn UserRepository,
    id: Uuid,
    mut input: UserInput,
) -> Result<User, UserError> {
    input.normalize();
    if let Err(errors) = input.validate_for_update() {
        warn!(user_id = %id, fields = %errors, "update rejected");
        return Err(errors.into());
    }

    let mut user = repo.find_by_id(id).await?.ok_or(UserError::NotFound(id))?;

    if let Some(owner) = repo.find_by_email(&input.email).await? {
        if owner.id != id {
            warn!(user_id = %id, email = %input.email, "email belongs to another user");
            return Err(UserError::EmailTaken(input.email));
        }
    }

    let plain = input.take_password();
    let new_hash = if plain.is_empty() {
        None
    } else {
        debug!(user_id = %id, "re-hashing password");
        Some(hash_off_thread(plain).await?)
    };

    user.apply_update(input, new_hash)?;
    repo.update(&user).await?;

    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn get_user(repo: &dyn UserRepository, id: Uuid) -> Result<User, UserError> {
    repo.find_by_id(id).await?.ok_or(UserError::NotFound(id))
}

pub async fn list_users(repo: &dyn UserRepository, page: Pagination) -> Result<Vec<User>, UserError> {
    let page = page.clamped();
    repo.list(page.limit, page.offset).await
}

pub async fn delete_user(repo: &dyn UserRepository, id: Uuid) -> Result<(), UserError> {
    let mut user = repo.find_by_id(id).await?.ok_or(UserError::NotFound(id))?;
    user.soft_delete();
    // a concurrent delete can win between the read and the write
    if !repo.soft_delete(&user).await? {
        return Err(UserError::NotFound(id));
    }
    info!(user_id = %id, "user soft-deleted");
    Ok(())
}

/// Checks `attempt` against the stored hash of a live user.
pub async fn verify_user_password(
    repo: &dyn UserRepository,
    id: Uuid,
    attempt: String,
) -> Result<bool, UserError> {
    let user = repo.find_by_id(id).await?.ok_or(UserError::NotFound(id))?;
    let matches = tokio::task::spawn_blocking(move || user.verify_password(&attempt))
        .await
        .map_err(|e| UserError::Internal(format!("verify task failed: {e}")))??;
    debug!(user_id = %id, matches, "password checked");
    Ok(matches)
}
