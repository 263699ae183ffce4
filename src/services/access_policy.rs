// src/services/access_policy.rs

use sqlx::PgConnection;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{User, UserRole, UserSummary},
};

/// Até onde o papel do usuário enxerga registros de outros donos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// Papel A: o workspace inteiro.
    Workspace,
    /// Papel B: a própria equipe.
    Team(i64),
    /// Papel C (ou gestor sem equipe): só o próprio usuário.
    OnlySelf(i64),
}

impl OwnerScope {
    pub fn of(user: &User) -> Self {
        match (user.role, user.team_id) {
            (UserRole::Admin, _) => OwnerScope::Workspace,
            (UserRole::Manager, Some(team_id)) => OwnerScope::Team(team_id),
            _ => OwnerScope::OnlySelf(user.id),
        }
    }

    /// `candidate` precisa ser um usuário ativo do mesmo workspace.
    pub fn admits(&self, candidate: &UserSummary) -> bool {
        match self {
            OwnerScope::Workspace => true,
            OwnerScope::Team(team_id) => candidate.team_id == Some(*team_id),
            OwnerScope::OnlySelf(user_id) => candidate.id == *user_id,
        }
    }
}

/// Política de acesso. Sempre recebe o usuário da requisição explicitamente.
#[derive(Clone)]
pub struct AccessPolicy {
    users: UserRepository,
}

impl AccessPolicy {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Usuários que `user` pode colocar como dono ou em campos de usuário.
    pub async fn assignable_users(&self, conn: &mut PgConnection, user: &User) -> Result<Vec<UserSummary>, AppError> {
        let scope = OwnerScope::of(user);
        let team_filter = match scope {
            OwnerScope::Team(team_id) => Some(team_id),
            _ => None,
        };
        let candidates = self.users.list_active(conn, user.workspace_id, team_filter).await?;
        Ok(candidates.into_iter().filter(|c| scope.admits(c)).collect())
    }

    /// `None` = sem restrição (papel A).
    pub async fn visible_owner_ids(&self, conn: &mut PgConnection, user: &User) -> Result<Option<Vec<i64>>, AppError> {
        match OwnerScope::of(user) {
            OwnerScope::Workspace => Ok(None),
            OwnerScope::OnlySelf(user_id) => Ok(Some(vec![user_id])),
            OwnerScope::Team(_) => {
                let mut ids: Vec<i64> = self.assignable_users(conn, user).await?.into_iter().map(|u| u.id).collect();
                // O gestor enxerga o que é dele mesmo se estiver inativo na listagem
                if !ids.contains(&user.id) {
                    ids.push(user.id);
                }
                Ok(Some(ids))
            }
        }
    }

    pub async fn can_assign_owner(&self, conn: &mut PgConnection, user: &User, owner_id: i64) -> Result<bool, AppError> {
        if owner_id == user.id {
            return Ok(true);
        }
        Ok(self.assignable_users(conn, user).await?.iter().any(|u| u.id == owner_id))
    }

    pub async fn ensure_can_assign(&self, conn: &mut PgConnection, user: &User, owner_id: i64) -> Result<(), AppError> {
        if self.can_assign_owner(conn, user, owner_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden("forbidden"))
        }
    }

    pub async fn ensure_visible(&self, conn: &mut PgConnection, user: &User, owner_id: i64) -> Result<(), AppError> {
        match self.visible_owner_ids(conn, user).await? {
            Some(ids) if !ids.contains(&owner_id) => Err(AppError::Forbidden("forbidden")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, role: UserRole, team_id: Option<i64>) -> User {
        User {
            id,
            workspace_id: 1,
            team_id,
            email: format!("u{id}@crm.dev"),
            name: format!("Usuário {id}"),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn summary(id: i64, team_id: Option<i64>) -> UserSummary {
        UserSummary {
            id,
            name: format!("Usuário {id}"),
            email: format!("u{id}@crm.dev"),
            role: UserRole::Member,
            team_id,
        }
    }

    #[test]
    fn scope_follows_the_role() {
        assert_eq!(OwnerScope::of(&user(1, UserRole::Admin, None)), OwnerScope::Workspace);
        assert_eq!(OwnerScope::of(&user(2, UserRole::Manager, Some(7))), OwnerScope::Team(7));
        assert_eq!(OwnerScope::of(&user(3, UserRole::Member, Some(7))), OwnerScope::OnlySelf(3));
    }

    #[test]
    fn manager_without_team_only_sees_themself() {
        assert_eq!(OwnerScope::of(&user(2, UserRole::Manager, None)), OwnerScope::OnlySelf(2));
    }

    #[test]
    fn admits_by_scope() {
        let colleague = summary(10, Some(7));
        let outsider = summary(11, Some(8));

        assert!(OwnerScope::Workspace.admits(&outsider));
        assert!(OwnerScope::Team(7).admits(&colleague));
        assert!(!OwnerScope::Team(7).admits(&outsider));
        assert!(OwnerScope::OnlySelf(10).admits(&colleague));
        assert!(!OwnerScope::OnlySelf(10).admits(&outsider));
    }
}
