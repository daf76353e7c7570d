//! Background worker recomputing forecasts from ZeroMQ messages.

use dotenvy::dotenv;

use genie_crm::db::establish_connection_pool;
use genie_crm::domain::types::{CompanyId, PeriodId, UserId};
use genie_crm::forecast::sync::recompute_bucket;
use genie_crm::forecast::{OpportunityChange, recompute_for_change};
use genie_crm::models::config::AppConfig;
use genie_crm::models::zmq::ZmqForecastMessage;
use genie_crm::repository::{DieselRepository, ForecastStore};
use genie_crm::services::{ServiceError, ServiceResult};

/// Handles one message and returns the number of buckets written.
fn process_forecast_message<R>(msg: ZmqForecastMessage, repo: &R) -> ServiceResult<usize>
where
    R: ForecastStore + ?Sized,
{
    match msg {
        ZmqForecastMessage::OpportunityChanged {
            company_id,
            before,
            after,
        } => {
            let company_id = CompanyId::new(company_id)?;
            let change = OpportunityChange { before, after };
            if change.before.is_none() && change.after.is_none() {
                log::warn!("Skipping empty opportunity change for company {company_id}");
                return Ok(0);
            }
            Ok(recompute_for_change(repo, company_id, &change)?.len())
        }
        ZmqForecastMessage::Recalculate {
            company_id,
            owner_id,
            period_id,
        } => {
            let company_id = CompanyId::new(company_id)?;
            let owner_id = UserId::new(owner_id)?;
            let period = repo
                .get_period_by_id(PeriodId::new(period_id)?, company_id)?
                .ok_or(ServiceError::NotFound)?;
            if repo.get_user_by_id(owner_id, company_id)?.is_none() {
                log::info!("Skipping recalculation for unknown user {owner_id}");
                return Ok(0);
            }
            Ok(recompute_bucket(repo, company_id, owner_id, &period)?.len())
        }
    }
}

fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Error loading config: {err}");
            std::process::exit(1);
        }
    };

    let Some(endpoint) = config.zmq_forecast_sub.as_deref() else {
        log::error!("zmq_forecast_sub is not configured");
        std::process::exit(1);
    };

    let context = zmq::Context::new();
    let subscriber = match context.socket(zmq::SUB) {
        Ok(socket) => socket,
        Err(e) => {
            log::error!("Cannot create zmq socket: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = subscriber
        .connect(endpoint)
        .and_then(|_| subscriber.set_subscribe(b""))
    {
        log::error!("Cannot subscribe to {endpoint}: {e}");
        std::process::exit(1);
    }

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };
    let repo = DieselRepository::new(pool);

    log::info!("Starting forecast worker on {endpoint}");

    loop {
        let msg = match subscriber.recv_bytes(0) {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("Error receiving message: {e}");
                continue;
            }
        };
        match serde_json::from_slice::<ZmqForecastMessage>(&msg) {
            Ok(parsed) => match process_forecast_message(parsed, &repo) {
                Ok(count) => log::info!("Updated {count} forecasts"),
                Err(e) => log::error!("Error processing forecast message: {e}"),
            },
            Err(e) => log::error!("Error decoding forecast message: {e}"),
        }
    }
}
