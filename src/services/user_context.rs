use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{User, UserRole};
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::services::auth::AuthService;

/// The caller's identity for one request: the user row plus their declared
/// disciplines. This is the whole identity-collaborator surface the domain
/// code sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user: User,
    pub disciplines: Vec<String>,
}

impl UserContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.user.role == UserRole::Staff
    }

    pub fn is_candidate(&self) -> bool {
        self.user.role == UserRole::Candidate
    }

    pub fn is_staff_or_admin(&self) -> bool {
        self.is_staff() || self.is_admin()
    }

    /// Discipline gating for claims; a hard precondition, not advisory.
    pub fn has_discipline(&self, discipline: &str) -> bool {
        self.disciplines
            .iter()
            .any(|d| d.eq_ignore_ascii_case(discipline))
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator access required".to_string(),
            ))
        }
    }

    pub fn requires_staff(&self) -> Result<(), AppError> {
        if self.is_staff_or_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Staff access required".to_string()))
        }
    }

    pub fn requires_candidate(&self) -> Result<(), AppError> {
        if self.is_candidate() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Candidate access required".to_string()))
        }
    }

    pub fn requires_same_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.user_id() == user_id || self.is_staff_or_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have access to this resource".to_string(),
            ))
        }
    }
}

#[derive(Clone)]
pub struct UserContextService {
    user_repository: UserRepository,
    auth_service: AuthService,
}

impl UserContextService {
    pub fn new(user_repository: UserRepository, auth_service: AuthService) -> Self {
        Self {
            user_repository,
            auth_service,
        }
    }

    pub async fn extract(&self, req: &HttpRequest) -> Result<UserContext, AppError> {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = self
            .auth_service
            .verify_token(token)
            .map_err(|_| AppError::Unauthorized)?;

        let user = self
            .user_repository
            .find_by_id(claims.sub)
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::Unauthorized)?;

        let disciplines = self
            .user_repository
            .get_disciplines(user.id)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(|d| d.discipline)
            .collect();

        Ok(UserContext { user, disciplines })
    }
}
