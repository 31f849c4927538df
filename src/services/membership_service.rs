//! Cliente del servicio de membresías
//!
//! Resuelve el porcentaje de ownership de un usuario en su grupo y las
//! restricciones de reserva del grupo. El servicio se trata como flaky:
//! timeout duro en el cliente HTTP y errores mapeados a Dependency para
//! que los callers degraden a valores por defecto.

use reqwest::Client;
use uuid::Uuid;

use crate::models::membership::{GroupRules, Membership};
use crate::utils::errors::{AppError, AppResult};

pub struct MembershipService {
    client: Client,
    base_url: String,
}

impl MembershipService {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Membresía (ownership %, rol) de un usuario en un grupo
    pub async fn get_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Membership> {
        let url = format!(
            "{}/groups/{}/members/{}",
            self.base_url, group_id, user_id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("membership service: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Dependency(format!(
                "membership service returned {} for group {} user {}",
                response.status(),
                group_id,
                user_id
            )));
        }

        let membership = response
            .json::<Membership>()
            .await
            .map_err(|e| AppError::Dependency(format!("membership decode: {}", e)))?;

        Ok(membership)
    }

    /// Restricciones de reserva del grupo. Un 404 significa "sin reglas",
    /// no un error.
    pub async fn get_group_rules(&self, group_id: Uuid) -> AppResult<GroupRules> {
        let url = format!("{}/groups/{}/rules", self.base_url, group_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("membership service: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(GroupRules::default());
        }

        if !response.status().is_success() {
            return Err(AppError::Dependency(format!(
                "membership service returned {} for group {} rules",
                response.status(),
                group_id
            )));
        }

        let rules = response
            .json::<GroupRules>()
            .await
            .map_err(|e| AppError::Dependency(format!("group rules decode: {}", e)))?;

        Ok(rules)
    }
}
