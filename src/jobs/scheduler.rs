//! Scheduler de jobs periódicos
//!
//! Cada job corre en su propio task de tokio con un intervalo fijo y un
//! jitter inicial aleatorio para desalinear instancias que arrancan a la
//! vez. Antes de cada ejecución se adquiere el lock distribuido del job
//! (SET NX EX); si está ocupado, el tick se salta en silencio.

use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::state::AppState;

type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

pub fn spawn_job<F>(state: AppState, name: &'static str, interval_secs: u64, job: F)
where
    F: Fn(AppState) -> JobFuture + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let jitter = rand::thread_rng().gen_range(0..30);
        tokio::time::sleep(Duration::from_secs(jitter)).await;

        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        log::info!(
            "⏰ Job '{}' programado cada {}s (jitter inicial {}s)",
            name,
            interval_secs,
            jitter
        );

        loop {
            ticker.tick().await;
            run_once(&state, name, &job).await;
        }
    });
}

async fn run_once<F>(state: &AppState, name: &'static str, job: &F)
where
    F: Fn(AppState) -> JobFuture + Send + Sync + 'static,
{
    let lock_key = state.redis.lock_key(name);
    let acquired = state
        .redis
        .acquire_lock(&lock_key, state.policy.job_lock_ttl_secs)
        .await
        .unwrap_or(false);

    if !acquired {
        // Otra instancia lo está ejecutando: skip, no es un error
        log::debug!("⏭️ Job '{}' saltado: lock ocupado", name);
        return;
    }

    match job(state.clone()).await {
        Ok(summary) => log::info!("✅ Job '{}' completado: {}", name, summary),
        Err(e) => log::error!("❌ Job '{}' falló: {}", name, e),
    }

    state.redis.release_lock(&lock_key).await;
}
