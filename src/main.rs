use actix_cors::Cors;
use actix_web::{post, web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use tripsplit::schemas::{Expense, Member};
use tripsplit::settle_trip;

/// A consistent ledger snapshot, supplied by the trip service that owns
/// storage. The engine itself reads and writes nothing.
#[derive(Deserialize)]
struct SettlementRequest {
    members: Vec<Member>,
    expenses: Vec<Expense>,
}

#[post("/trips/{trip_id}/settlement")]
async fn calculate_settlement(
    trip_id: web::Path<String>,
    json: web::Json<SettlementRequest>,
) -> HttpResponse {
    let trip_id = trip_id.into_inner();
    let request = json.into_inner();
    tracing::info!(
        %trip_id,
        members = request.members.len(),
        expenses = request.expenses.len(),
        "calculating settlement"
    );
    match settle_trip(&request.members, &request.expenses) {
        Ok(settlement) => HttpResponse::Ok().json(settlement),
        Err(err) => {
            tracing::warn!(%trip_id, error = %err, "settlement rejected");
            HttpResponse::BadRequest().body(err.to_string())
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("TRIPSPLIT_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!("Listening on {addr}");

    HttpServer::new(|| {
        App::new()
            .wrap(Cors::permissive())
            .service(calculate_settlement)
    })
    .bind(addr)?
    .run()
    .await
}
