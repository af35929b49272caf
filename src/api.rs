//! REST API for the truck packing service.
//!
//! Axum router with permissive CORS and request tracing. The truck type and the
//! packing tolerances come from the process configuration; requests only carry
//! the order.

use std::sync::OnceLock;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig};
use crate::model::{CatalogItem, OrderLine, OrientationConstraint, TruckSpec, ValidationError};
use crate::optimizer::{PackEvent, PackingResult, pack_with_config, pack_with_progress};
use crate::report::{LoadPlanEntry, PackingSummary, TruckSummary};

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>truck-packer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// One order line as sent by clients.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "reference": "PLT-030",
        "name": "Euro pallet",
        "weight": 450.0,
        "length": 1.2,
        "width": 0.8,
        "height": 1.5,
        "quantity": 6,
        "stackable": true,
        "max_stack_levels": 2
    })
)]
pub struct OrderLineRequest {
    pub reference: String,
    #[serde(default)]
    pub name: Option<String>,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub quantity: u32,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    #[schema(nullable = true)]
    pub max_stack_levels: Option<u32>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub orientation_constraint: Option<OrientationConstraint>,
}

impl OrderLineRequest {
    fn into_order_line(self) -> Result<OrderLine, ValidationError> {
        let mut item = CatalogItem::new(self.reference, self.weight, (self.length, self.width, self.height))?
            .with_orientation(self.orientation_constraint.unwrap_or_default());
        if let Some(name) = self.name {
            item = item.with_name(name);
        }
        if self.stackable {
            item = item.with_stacking(self.max_stack_levels)?;
        }
        OrderLine::new(item, self.quantity)
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            {
                "reference": "PLT-030",
                "weight": 450.0,
                "length": 1.2,
                "width": 0.8,
                "height": 1.5,
                "quantity": 6,
                "stackable": true
            },
            {
                "reference": "PNL-001",
                "weight": 60.0,
                "length": 2.4,
                "width": 1.2,
                "height": 0.1,
                "quantity": 4,
                "orientation_constraint": "width"
            }
        ]
    })
)]
pub struct PackRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    lines: Vec<OrderLine>,
}

impl ValidatedPackRequest {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn unit_count(&self) -> usize {
        self.lines.iter().map(|l| l.quantity as usize).sum()
    }
}

#[derive(Debug)]
struct InvalidOrderLine {
    index: usize,
    reference: String,
    source: ValidationError,
}

impl PackRequest {
    fn into_validated(self) -> Result<ValidatedPackRequest, InvalidOrderLine> {
        let lines = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let reference = line.reference.clone();
                line.into_order_line().map_err(|source| InvalidOrderLine {
                    index,
                    reference,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedPackRequest { lines })
    }
}

/// Response with all trucks of the load plan.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub trucks: Vec<PackedTruck>,
    pub skipped: Vec<SkippedItem>,
    pub is_complete: bool,
    pub summary: PackingSummary,
}

/// Single truck with its placed units.
///
/// # Fields
/// * `id` - Truck number (1-based)
/// * `total_weight` - Total weight of all units in the truck
/// * `items` - Placed units in loading order
#[derive(Serialize, ToSchema)]
pub struct PackedTruck {
    pub id: usize,
    pub total_weight: f64,
    pub items: Vec<PlacedItemResult>,
    pub summary: TruckSummary,
}

/// Single placed unit in the response.
///
/// # Fields
/// * `pos` - Anchor (x, y, z) in the truck
/// * `dims` - Oriented extents along (length, width, height) of the truck
/// * `relaxed` - Placed ignoring its orientation constraint
#[derive(Serialize, ToSchema)]
pub struct PlacedItemResult {
    pub unit_id: usize,
    pub reference: String,
    pub name: Option<String>,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub pos: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([1.2, 0.8, 1.5]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub stack_level: u32,
    pub relaxed: bool,
    /// Visualization colour as `#rrggbb`.
    pub color: String,
}

#[derive(Serialize, ToSchema)]
pub struct SkippedItem {
    pub unit_id: usize,
    pub reference: String,
    pub weight: f64,
    #[schema(value_type = [f64; 3], example = json!([14.0, 3.0, 3.0]))]
    pub dims: (f64, f64, f64),
    pub reason_code: String,
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    payload.into_validated().map_err(|invalid| {
        validation_error(format!(
            "Item {} ('{}'): {}",
            invalid.index + 1,
            invalid.reference,
            invalid.source
        ))
    })
}

fn color_hex(color: u32) -> String {
    format!("#{:06x}", color)
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult.
    pub fn from_packing_result(result: PackingResult) -> Self {
        let summary = PackingSummary::from_result(&result);
        let is_complete = result.is_complete();
        let PackingResult { trucks, skipped } = result;

        Self {
            trucks: trucks
                .iter()
                .enumerate()
                .map(|(i, truck)| PackedTruck {
                    id: i + 1,
                    total_weight: truck.total_weight(),
                    items: truck
                        .placed()
                        .iter()
                        .map(|p| PlacedItemResult {
                            unit_id: p.unit.unit_id,
                            reference: p.unit.item.reference.clone(),
                            name: p.unit.item.name.clone(),
                            pos: p.position.as_tuple(),
                            dims: p.orientation.as_tuple(),
                            weight: p.unit.item.weight,
                            stack_level: p.stack_level,
                            relaxed: p.relaxed,
                            color: color_hex(p.unit.color),
                        })
                        .collect(),
                    summary: TruckSummary::from_truck(truck),
                })
                .collect(),
            skipped: skipped
                .into_iter()
                .map(|entry| SkippedItem {
                    unit_id: entry.unit.unit_id,
                    weight: entry.unit.item.weight,
                    dims: entry.unit.item.dims(),
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                    reference: entry.unit.item.reference,
                })
                .collect(),
            is_complete,
            summary,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_truck, handle_health),
    components(
        schemas(
            PackRequest,
            OrderLineRequest,
            OrientationConstraint,
            PackResponse,
            PackedTruck,
            PlacedItemResult,
            SkippedItem,
            TruckSummary,
            LoadPlanEntry,
            PackingSummary,
            PackEvent,
            TruckSpec,
            HealthResponse,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for truck load planning"))
)]
struct ApiDoc;

fn router(optimizer_config: OptimizerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { optimizer_config };

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/truck", get(handle_truck))
        .route("/health", get(handle_health))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the API server and serves until it terminates.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
) -> std::io::Result<()> {
    let truck = optimizer_config.truck_spec();
    let app = router(optimizer_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!(
        length = truck.length,
        width = truck.width,
        height = truck.height,
        max_weight = truck.max_weight,
        "Truck type"
    );
    info!("Endpoints: POST /pack, POST /pack_stream, GET /truck, GET /health, GET /docs");

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Distributes the order over as few trucks as the heuristic finds.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Load plan for the order", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid order line",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        lines = request.line_count(),
        units = request.unit_count(),
        "New pack request"
    );
    let result = pack_with_config(
        &request.lines,
        state.optimizer_config.truck_spec(),
        state.optimizer_config.packing_config(),
    );
    info!(
        trucks = result.truck_count(),
        skipped = result.skipped_count(),
        "Pack request finished"
    );

    let response = PackResponse::from_packing_result(result);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams `PackEvent`s as Server-Sent Events while the engine runs on a blocking task.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid order line",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let truck = state.optimizer_config.truck_spec();
    let packing_config = state.optimizer_config.packing_config();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let mut receiver_open = true;
        pack_with_progress(&request.lines, truck, packing_config, |evt| {
            if !receiver_open {
                return;
            }
            if let Ok(json) = serde_json::to_string(evt) {
                if tx.blocking_send(json).is_err() {
                    debug!("Stream receiver closed; discarding remaining events");
                    receiver_open = false;
                }
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /truck: the configured truck type.
#[utoipa::path(
    get,
    path = "/truck",
    responses((status = 200, description = "Configured truck type", body = TruckSpec)),
    tag = "packing"
)]
async fn handle_truck(State(state): State<ApiState>) -> Json<TruckSpec> {
    Json(state.optimizer_config.truck_spec())
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = HealthResponse)),
    tag = "packing"
)]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
