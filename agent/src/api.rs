//! Local API Server

use crate::config::Family;
use crate::store::{CdnSnapshot, DnsSnapshot, PingSnapshot, PortsSnapshot, ProtocolSnapshot, Report};
use crate::{AgentError, AgentState};
use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use netscope_common::DnsRecord;
use netscope_decision::{
    ArchitectureBuilder, ArchitecturePlan, ConfigTemplate, Recommendation, RecommendationEngine,
    TemplateGenerator,
};
use netscope_probe::network::ConnectionInfo;
use netscope_probe::{
    cdn, dns, location, ports, CdnTester, DnsAnalyzer, LocationTester, NetworkScan,
    NetworkScanner, PortScanner, ProtocolTester,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type ApiResult<T> = Result<Json<T>, AgentError>;

/// Build the API router
pub fn build_router(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/settings", get(get_settings).post(set_settings))
        // Test families
        .route("/api/network/scan", post(network_scan))
        .route("/api/network/info", get(network_info))
        .route("/api/ping/test", post(ping_test))
        .route("/api/dns/benchmark", post(dns_benchmark))
        .route("/api/dns/custom", post(dns_custom))
        .route("/api/cdn/test", post(cdn_test))
        .route("/api/protocol/benchmark", post(protocol_benchmark))
        .route("/api/ports/scan", post(ports_scan))
        // Generators
        .route("/api/recommendations", get(recommendations))
        .route("/api/architecture", get(architecture))
        .route("/api/config", get(config_template))
        // Reports
        .route("/api/report", get(report))
        .route("/api/report/export", get(report_export))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Lenient JSON body: missing or malformed bodies read as defaults
fn body_or_default<T: for<'de> Deserialize<'de> + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsBody {
    restricted_mode: bool,
}

async fn get_settings(State(state): State<Arc<AgentState>>) -> Json<SettingsBody> {
    Json(SettingsBody {
        restricted_mode: state.restricted(),
    })
}

async fn set_settings(State(state): State<Arc<AgentState>>, body: Bytes) -> Json<SettingsBody> {
    let requested: SettingsBody = body_or_default(&body);
    state.set_restricted(requested.restricted_mode);
    tracing::info!(restricted = requested.restricted_mode, "restricted mode updated");
    get_settings(State(state)).await
}

// ==================== Test families ====================

async fn network_scan(State(state): State<Arc<AgentState>>) -> ApiResult<NetworkScan> {
    let scanner = NetworkScanner::new(state.config.settings(Family::Network, state.restricted()));
    let scan = scanner.full_scan().await;
    state.store.update(|s| s.network = Some(scan.clone()));
    Ok(Json(scan))
}

async fn network_info(State(state): State<Arc<AgentState>>) -> ApiResult<ConnectionInfo> {
    let scanner = NetworkScanner::new(state.config.settings(Family::Network, state.restricted()));
    Ok(Json(scanner.connection_info().await))
}

async fn ping_test(State(state): State<Arc<AgentState>>) -> ApiResult<PingSnapshot> {
    let tester = LocationTester::new(state.config.settings(Family::Location, state.restricted()));
    let results = tester.test_all(Vec::new()).await;
    let snapshot = PingSnapshot {
        region_summary: location::region_summary(&results),
        best_locations: location::best_locations(&results, 5),
        results,
    };
    state.store.update(|s| s.ping = Some(snapshot.clone()));
    Ok(Json(snapshot))
}

async fn dns_benchmark(State(state): State<Arc<AgentState>>) -> ApiResult<DnsSnapshot> {
    let analyzer = DnsAnalyzer::new(state.config.settings(Family::Dns, state.restricted()));
    let results = analyzer.benchmark_all(Vec::new()).await;
    let snapshot = DnsSnapshot {
        best_dns: dns::best_dns(&results, 3),
        results,
    };
    state.store.update(|s| s.dns = Some(snapshot.clone()));
    Ok(Json(snapshot))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CustomDnsBody {
    name: String,
    ip: String,
}

async fn dns_custom(State(state): State<Arc<AgentState>>, body: Bytes) -> ApiResult<DnsRecord> {
    let request: CustomDnsBody = body_or_default(&body);
    let analyzer = DnsAnalyzer::new(state.config.settings(Family::Dns, state.restricted()));
    let record = analyzer.benchmark_custom(&request.name, &request.ip).await?;
    Ok(Json(record))
}

async fn cdn_test(State(state): State<Arc<AgentState>>) -> ApiResult<CdnSnapshot> {
    let tester = CdnTester::new(state.config.settings(Family::Cdn, state.restricted()))?;
    let results = tester.test_all(Vec::new()).await;
    let snapshot = CdnSnapshot {
        best_cdn: cdn::best_cdn(&results, 3),
        results,
    };
    state.store.update(|s| s.cdn = Some(snapshot.clone()));
    Ok(Json(snapshot))
}

async fn protocol_benchmark(State(state): State<Arc<AgentState>>) -> ApiResult<ProtocolSnapshot> {
    let tester = ProtocolTester::new(state.config.settings(Family::Protocol, state.restricted()))?;
    let snapshot = ProtocolSnapshot {
        results: tester.benchmark_all(Vec::new()).await,
    };
    state.store.update(|s| s.protocol = Some(snapshot.clone()));
    Ok(Json(snapshot))
}

async fn ports_scan(State(state): State<Arc<AgentState>>) -> ApiResult<PortsSnapshot> {
    let scanner = PortScanner::new(state.config.settings(Family::Ports, state.restricted()));
    let results = scanner
        .scan_all(Some(&state.config.port_target), Vec::new())
        .await;
    let snapshot = PortsSnapshot {
        reachable: ports::reachable_ports(&results),
        results,
    };
    state.store.update(|s| s.ports = Some(snapshot.clone()));
    Ok(Json(snapshot))
}

// ==================== Generators ====================

#[derive(Debug, Serialize)]
struct RecommendationsResponse {
    recommendations: Vec<Recommendation>,
}

async fn recommendations(State(state): State<Arc<AgentState>>) -> Json<RecommendationsResponse> {
    let input = state.store.decision_input();
    let recommendations = RecommendationEngine::new().generate(&input);
    state
        .store
        .update(|s| s.recommendations = Some(recommendations.clone()));
    Json(RecommendationsResponse { recommendations })
}

async fn architecture(State(state): State<Arc<AgentState>>) -> Json<ArchitecturePlan> {
    let input = state.store.decision_input();
    let plan = ArchitectureBuilder::new().build(&input);
    state.store.update(|s| s.architecture = Some(plan.clone()));
    Json(plan)
}

async fn config_template(State(state): State<Arc<AgentState>>) -> Json<ConfigTemplate> {
    let input = state.store.decision_input();
    let plan = state.store.architecture();
    let template = TemplateGenerator::new().generate(&input, plan.as_ref());
    state.store.update(|s| s.config = Some(template.clone()));
    Json(template)
}

// ==================== Reports ====================

async fn report(State(state): State<Arc<AgentState>>) -> Json<Report> {
    Json(state.store.report())
}

async fn report_export(State(state): State<Arc<AgentState>>) -> Result<Response, AgentError> {
    let body = serde_json::to_string_pretty(&state.store.report())?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=network_report.json",
            ),
        ],
        body,
    )
        .into_response())
}
