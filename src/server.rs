use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info};
use serde::Deserialize;
use tower::limit::ConcurrencyLimitLayer;

use crate::config::SolverConfig;
use crate::data::{ScheduleOutput, SchedulingInput};
use crate::error::ScheduleError;
use crate::solver;

/// Request body: the three tables plus optional solver options.
#[derive(Debug, Clone, Deserialize)]
pub struct SolveRequest {
    #[serde(flatten)]
    pub input: SchedulingInput,
    #[serde(default)]
    pub options: SolverConfig,
}

async fn solve_handler(
    Json(request): Json<SolveRequest>,
) -> Result<Json<ScheduleOutput>, (StatusCode, String)> {
    let result = tokio::task::spawn_blocking(move || solver::solve(&request.input, &request.options))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match result {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            error!("{}", e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

fn status_for(error: &ScheduleError) -> StatusCode {
    match error {
        ScheduleError::Input(_) => StatusCode::BAD_REQUEST,
        ScheduleError::Infeasible | ScheduleError::BudgetExhausted { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScheduleError::Engine(_) | ScheduleError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// At most `max_concurrent_solves` requests are solved at once; the rest wait.
pub fn router(max_concurrent_solves: usize) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_solves.max(1)))
}

pub async fn run_server(addr: SocketAddr, max_concurrent_solves: usize) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router(max_concurrent_solves)).await
}
