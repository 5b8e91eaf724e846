//! HTTP front of the plan filter: accepts raw model output and returns the
//! repaired, validated plan document.

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpResponse, HttpServer};
use plan_filter::{FilterCfg, PlanFilter};
use shared::config::Settings;
use shared::dto::{ErrorResponse, FilterRequest, FilterResponse, PlanKind, UnparsableResponse};
use shared::error::FilterError;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
struct AppState {
    filter: PlanFilter,
}

/// Simple liveness endpoint for orchestration.
async fn health() -> &'static str {
    "OK"
}

async fn filter_plan(
    state: web::Data<AppState>,
    path: web::Path<String>,
    web::Json(req): web::Json<FilterRequest>,
) -> HttpResponse {
    let Ok(kind) = path.parse::<PlanKind>() else {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: format!("unknown plan kind: {}", path.as_str()),
        });
    };
    if let Err(msg) = req.check_bounds(OffsetDateTime::now_utc().year()) {
        warn!(%kind, %msg, "rejecting filter request");
        return HttpResponse::BadRequest().json(ErrorResponse { error: msg });
    }

    let filter = state.filter.clone();
    let FilterRequest { raw_text, month, year } = req;
    let joined = tokio::task::spawn_blocking(move || {
        let res = filter.repair_and_validate(&raw_text, month, year, kind);
        (raw_text, res)
    })
    .await;

    match joined {
        Ok((_, Ok(outcome))) => HttpResponse::Ok().json(FilterResponse {
            document: outcome.document,
            report: outcome.report,
            raw_text: outcome.raw_text,
        }),
        Ok((raw_text, Err(e))) => {
            error!(%kind, %e, "model response could not be parsed");
            let FilterError::JsonUnparsable {
                content_length,
                preview,
                line,
                column,
            } = e;
            HttpResponse::InternalServerError().json(UnparsableResponse {
                error: "JSON unparsable".into(),
                content_length,
                preview,
                line,
                column,
                raw_text,
            })
        }
        Err(e) => {
            error!(%kind, %e, "filter task failed");
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "filter task failed".into(),
            })
        }
    }
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/plans/{kind}/filter", web::post().to(filter_plan));
}

fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }
    origins.iter().fold(
        Cors::default()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::CONTENT_TYPE])
            .max_age(3600),
        |cors, origin| cors.allowed_origin(origin),
    )
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let settings = Settings::new().map_err(|e| {
        error!(%e, "failed to load settings");
        e
    })?;
    let cfg = FilterCfg::from(&settings);
    info!(
        dump_dir = ?cfg.debug_dump_dir,
        filter_version = %cfg.filter_version,
        "filter configured"
    );

    let origins = settings.cors_origins();
    if origins.is_empty() {
        warn!("CORS_ORIGINS not set; allowing any origin");
    }

    let state = AppState {
        filter: PlanFilter::new(cfg),
    };
    let bind_addr = format!("{}:{}", settings.http_bind, settings.http_port);
    info!(%bind_addr, "starting plan-filter");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors(&origins))
            .configure(routes)
    })
    .bind(bind_addr)?
    .run()
    .await?;
    Ok(())
}
