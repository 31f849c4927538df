//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use std::env;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    // Servicio externo de membresías/propiedad (porcentaje de ownership por grupo)
    pub membership_service_url: String,
    pub membership_timeout_secs: u64,
    // Canal de eventos de ciclo de vida
    pub event_channel: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            membership_service_url: env::var("MEMBERSHIP_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            membership_timeout_secs: env::var("MEMBERSHIP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("MEMBERSHIP_TIMEOUT_SECS must be a valid number"),
            event_channel: env::var("EVENT_CHANNEL")
                .unwrap_or_else(|_| "carshare:events".to_string()),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
