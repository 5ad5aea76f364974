use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::any,
    Json, Router,
};
use embedded_hal::digital::{ErrorType, OutputPin};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use gpio_control_common::{
    query_value, wait_for_association, Association, BootstrapError, ErrorResponse,
    GpioController, NetworkConfig, PinId, RuntimeConfig, SetPinResponse, NOT_FOUND_BODY,
    PARAM_PIN, PARAM_STATE, ROUTE_GPIO, ROUTE_INDEX, ROUTE_IP, ROUTE_STATUS,
};

const DEFAULT_HOST_HTTP_PORT: u16 = 8080;
const DEFAULT_DEVICE_IP: &str = "127.0.0.1";
const UNASSIGNED_ADDRESS: &str = "0.0.0.0";
const INDEX_HTML: &str = include_str!("../web/index.html");

/// Stand-in for a GPIO output; remembers its level and logs every write.
#[derive(Debug)]
struct SimulatedLine {
    pin: u8,
    high: bool,
}

impl SimulatedLine {
    fn new(pin: PinId) -> Self {
        Self {
            pin: pin.number(),
            high: false,
        }
    }
}

impl ErrorType for SimulatedLine {
    type Error = Infallible;
}

impl OutputPin for SimulatedLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        info!(pin = self.pin, "simulated GPIO driven LOW");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        info!(pin = self.pin, "simulated GPIO driven HIGH");
        Ok(())
    }
}

/// Station link that reports association after a configurable number of polls.
struct SimulatedLink {
    polls_needed: Option<u32>,
    polls: u32,
    address: String,
}

impl Association for SimulatedLink {
    fn begin(&mut self, network: &NetworkConfig) -> Result<(), BootstrapError> {
        info!("joining `{}` (simulated)", network.wifi_ssid);
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        let up = self
            .polls_needed
            .is_some_and(|needed| self.polls >= needed);
        self.polls = self.polls.saturating_add(1);
        up
    }

    fn address(&self) -> Option<String> {
        Some(self.address.clone())
    }
}

#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<GpioController<SimulatedLine>>>,
    link: Arc<Mutex<SimulatedLink>>,
}

impl AppState {
    fn new(link: SimulatedLink) -> anyhow::Result<Self> {
        let controller = GpioController::new(
            SimulatedLine::new(PinId::Gpio14),
            SimulatedLine::new(PinId::Gpio33),
        )
        .context("failed to initialize simulated GPIO outputs")?;

        Ok(Self {
            controller: Arc::new(Mutex::new(controller)),
            link: Arc::new(Mutex::new(link)),
        })
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("GPIO control simulator starting");

    let runtime = load_runtime_config();
    if !runtime.network.has_station_credentials() {
        warn!("WIFI_SSID is empty or a placeholder; association will be refused");
    }

    let link = SimulatedLink {
        polls_needed: runtime
            .network
            .has_station_credentials()
            .then(|| env_parse("SIM_ASSOCIATION_POLLS").unwrap_or(0)),
        polls: 0,
        address: std::env::var("GPIO_DEVICE_IP").unwrap_or_else(|_| DEFAULT_DEVICE_IP.into()),
    };

    let network = runtime.network.clone();
    let policy = runtime.bootstrap.clone();
    let (link, outcome) = tokio::task::spawn_blocking(move || {
        let mut link = link;
        let outcome = wait_for_association(&mut link, &network, &policy, std::thread::sleep);
        (link, outcome)
    })
    .await
    .context("association task failed")?;

    let waited = match outcome {
        Ok(waited) => waited,
        Err(err) => {
            error!("failed to connect to WiFi: {err}");
            warn!("restarting in {} ms", runtime.bootstrap.restart_delay_ms);
            tokio::time::sleep(Duration::from_millis(runtime.bootstrap.restart_delay_ms)).await;
            return Err(anyhow!(err).context("network bootstrap failed; restart required"));
        }
    };

    let device_ip = link
        .address()
        .ok_or_else(|| anyhow!("associated but no address assigned"))?;
    info!("wifi connected after {waited} polls, IP address {device_ip}");

    let app = router(AppState::new(link)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind GPIO server at {addr}"))?;

    info!("control panel listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn load_runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        network: NetworkConfig {
            wifi_ssid: std::env::var("WIFI_SSID").unwrap_or_else(|_| "simulator".to_string()),
            wifi_pass: std::env::var("WIFI_PASS").unwrap_or_default(),
        },
        http_port: env_parse("GPIO_HTTP_PORT").unwrap_or(DEFAULT_HOST_HTTP_PORT),
        ..RuntimeConfig::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Every route answers any method, like the device's handler table.
fn router(state: AppState) -> Router {
    Router::new()
        .route(ROUTE_INDEX, any(handle_index))
        .route(ROUTE_GPIO, any(handle_set_gpio))
        .route(ROUTE_STATUS, any(handle_get_status))
        .route(ROUTE_IP, any(handle_get_ip))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn handle_set_gpio(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    let pin = query_value(&query, PARAM_PIN);
    let value = query_value(&query, PARAM_STATE);

    let result = state
        .controller
        .lock()
        .await
        .apply_query(pin.as_deref(), value.as_deref());

    match result {
        Ok(report) => {
            info!(
                pin = report.pin.number(),
                on = report.on,
                "pin state updated"
            );
            Json(SetPinResponse::from(report)).into_response()
        }
        Err(err) => {
            warn!("rejected gpio request `{query}`: {err}");
            error_response(err.status_code(), err.reason())
        }
    }
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.controller.lock().await.status();
    Json(status)
}

async fn handle_get_ip(State(state): State<AppState>) -> impl IntoResponse {
    state
        .link
        .lock()
        .await
        .address()
        .unwrap_or_else(|| UNASSIGNED_ADDRESS.to_string())
}

async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

fn error_response(status_code: u16, message: &'static str) -> Response {
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(ErrorResponse::new(message))).into_response()
}
