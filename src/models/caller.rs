//! Identidad del caller
//!
//! Las operaciones del motor reciben un contexto explícito de caller en vez
//! de un user id mágico: o bien un usuario final con su rol, o bien el
//! caller interno usado por los jobs en background. El caller interno no
//! lleva semántica de ownership.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rol del usuario dentro del grupo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Manager,
    Admin,
}

impl UserRole {
    /// Roles elevados: saltan la ventana temporal de check-in y la
    /// monotonicidad del odómetro (que se degrada a warning)
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => UserRole::Admin,
            "manager" => UserRole::Manager,
            _ => UserRole::Member,
        }
    }
}

/// Contexto del caller que ejecuta una operación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerContext {
    User { id: Uuid, role: UserRole },
    /// Jobs en background y mantenimiento interno
    Internal,
}

impl CallerContext {
    pub fn is_internal(&self) -> bool {
        matches!(self, CallerContext::Internal)
    }

    pub fn is_elevated(&self) -> bool {
        match self {
            CallerContext::User { role, .. } => role.is_elevated(),
            CallerContext::Internal => true,
        }
    }

    /// true si el caller es el usuario dado
    pub fn is_user(&self, user_id: &Uuid) -> bool {
        matches!(self, CallerContext::User { id, .. } if id == user_id)
    }

    /// Identidad persistida en columnas resolved_by / performed-by textuales
    pub fn label(&self) -> String {
        match self {
            CallerContext::User { id, .. } => id.to_string(),
            CallerContext::Internal => "system".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevated_roles() {
        assert!(!UserRole::Member.is_elevated());
        assert!(UserRole::Manager.is_elevated());
        assert!(UserRole::Admin.is_elevated());
    }

    #[test]
    fn test_internal_caller_label() {
        assert_eq!(CallerContext::Internal.label(), "system");
        let id = Uuid::new_v4();
        let caller = CallerContext::User { id, role: UserRole::Member };
        assert_eq!(caller.label(), id.to_string());
        assert!(caller.is_user(&id));
        assert!(!caller.is_user(&Uuid::new_v4()));
    }
}
