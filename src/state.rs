//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum y a los jobs en background.

use crate::cache::redis_client::RedisClient;
use crate::config::booking::BookingPolicy;
use crate::config::environment::EnvironmentConfig;
use crate::services::availability_service::AvailabilityService;
use crate::services::booking_service::BookingService;
use crate::services::check_service::CheckService;
use crate::services::conflict_service::ConflictService;
use crate::services::event_service::EventPublisher;
use crate::services::membership_service::MembershipService;
use crate::services::priority_service::PriorityService;
use crate::services::validation_service::ValidationService;
use crate::utils::clock::{system_clock, SharedClock};
use reqwest::Client;
use sqlx::PgPool;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub policy: BookingPolicy,
    pub redis: RedisClient,
    pub http_client: Client,
    pub clock: SharedClock,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig, redis: RedisClient) -> Self {
        // Timeout duro para llamadas HTTP salientes: el servicio de membresías
        // se trata como flaky y nunca debe bloquear el write path.
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.membership_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            pool,
            config,
            policy: BookingPolicy::default(),
            redis,
            http_client,
            clock: system_clock(),
        }
    }

    // Constructores de servicios: structs ligeros, se montan por operación

    pub fn membership_service(&self) -> MembershipService {
        MembershipService::new(
            self.http_client.clone(),
            self.config.membership_service_url.clone(),
        )
    }

    pub fn event_publisher(&self) -> EventPublisher {
        EventPublisher::new(self.redis.clone(), self.config.event_channel.clone())
    }

    pub fn availability_service(&self) -> AvailabilityService {
        AvailabilityService::new(
            self.pool.clone(),
            self.redis.clone(),
            self.policy.availability_cache_ttl_secs,
        )
    }

    pub fn validation_service(&self) -> ValidationService {
        ValidationService::new(self.pool.clone(), self.policy.clone(), self.clock.clone())
    }

    pub fn priority_service(&self) -> PriorityService {
        PriorityService::new(
            self.pool.clone(),
            self.membership_service(),
            self.clock.clone(),
        )
    }

    pub fn conflict_service(&self) -> ConflictService {
        ConflictService::new(
            self.pool.clone(),
            self.policy.clone(),
            self.membership_service(),
            self.event_publisher(),
            self.clock.clone(),
        )
    }

    pub fn booking_service(&self) -> BookingService {
        BookingService::new(
            self.pool.clone(),
            self.policy.clone(),
            self.validation_service(),
            self.priority_service(),
            self.availability_service(),
            self.conflict_service(),
            self.event_publisher(),
            self.clock.clone(),
        )
    }

    pub fn check_service(&self) -> CheckService {
        CheckService::new(
            self.pool.clone(),
            self.policy.clone(),
            self.availability_service(),
            self.event_publisher(),
            self.clock.clone(),
        )
    }
}
