use core::convert::TryInto;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

use anyhow::{anyhow, Context};
use embedded_svc::{
    http::Method,
    io::Write,
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::gpio::{Output, OutputPin, PinDriver};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{gpio::AnyOutputPin, prelude::Peripherals},
    http::server::{Configuration as HttpConfiguration, EspHttpServer},
    log::EspLogger,
    nvs::EspDefaultNvsPartition,
    wifi::EspWifi,
};
use log::{error, info, warn};
use serde::Serialize;

use gpio_control_common::{
    query_param, wait_for_association, Association, BootstrapError, BootstrapPolicy,
    ErrorResponse, GpioController, NetworkConfig, PinId, RuntimeConfig, SetPinResponse,
    CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, NOT_FOUND_BODY, PARAM_PIN,
    PARAM_STATE, ROUTE_GPIO, ROUTE_INDEX, ROUTE_IP, ROUTE_STATUS,
};

const INDEX_HTML: &str = include_str!("../web/index.html");
const HTTP_STACK_SIZE: usize = 8 * 1024;
const MAX_URI_HANDLERS: usize = 32;
const UNASSIGNED_ADDRESS: &str = "0.0.0.0";
const ROUTED_METHODS: [Method; 5] = [
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Delete,
    Method::Head,
];

type OutputLine = PinDriver<'static, AnyOutputPin, Output>;
type SharedController = Arc<Mutex<GpioController<OutputLine>>>;
type SharedLink = Arc<Mutex<StationLink>>;

struct StationLink {
    wifi: EspWifi<'static>,
}

impl Association for StationLink {
    fn begin(&mut self, network: &NetworkConfig) -> Result<(), BootstrapError> {
        let auth_method = if network.wifi_pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        let conf = Configuration::Client(ClientConfiguration {
            ssid: network
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| BootstrapError::Link("wifi ssid too long".to_string()))?,
            password: network
                .wifi_pass
                .as_str()
                .try_into()
                .map_err(|_| BootstrapError::Link("wifi password too long".to_string()))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&conf).map_err(link_error)?;
        self.wifi.start().map_err(link_error)?;
        self.wifi.connect().map_err(link_error)?;
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn address(&self) -> Option<String> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip.to_string())
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("=================================");
    info!("ESP32-S3-MINI-1 GPIO Control");
    info!("=================================");

    let runtime = load_runtime_config();
    let Peripherals { modem, pins, .. } = Peripherals::take()?;

    let controller = GpioController::new(
        PinDriver::output(pins.gpio14.downgrade_output())?,
        PinDriver::output(pins.gpio33.downgrade_output())?,
    )
    .context("failed to initialize GPIO outputs")?;
    for pin in PinId::ALL {
        info!("GPIO{} configured as output (OFF)", pin.number());
    }

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut link = StationLink {
        wifi: EspWifi::new(modem, sys_loop, Some(nvs_partition))?,
    };

    let address = match associate(&mut link, &runtime) {
        Ok(address) => address,
        Err(err) => restart_after_failure(&runtime.bootstrap, &err),
    };

    let link = Arc::new(Mutex::new(link));
    let server = create_http_server(
        Arc::new(Mutex::new(controller)),
        link.clone(),
        runtime.http_port,
    )?;
    info!("web server started");
    info!("control panel at http://{address}");

    // Keep services alive for the program lifetime.
    let _wifi = link;
    let _server = server;

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

fn load_runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        network: NetworkConfig {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or_default().to_string(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or_default().to_string(),
        },
        ..RuntimeConfig::default()
    }
}

fn associate(link: &mut StationLink, runtime: &RuntimeConfig) -> anyhow::Result<String> {
    if !runtime.network.has_station_credentials() {
        return Err(anyhow!(
            "wifi credentials missing; build with WIFI_SSID and WIFI_PASS set"
        ));
    }

    info!("connecting to WiFi SSID `{}`", runtime.network.wifi_ssid);
    let max_attempts = runtime.bootstrap.max_attempts;
    let mut polls = 0;
    let waited = wait_for_association(link, &runtime.network, &runtime.bootstrap, |interval| {
        polls += 1;
        info!("waiting for association ({polls}/{max_attempts})");
        thread::sleep(interval);
    })?;

    let address = link
        .address()
        .ok_or_else(|| anyhow!("associated but no IPv4 address assigned"))?;
    info!("wifi connected after {waited} polls");
    info!("IP address: {address}");
    match station_rssi() {
        Some(rssi) => info!("signal strength (RSSI): {rssi} dBm"),
        None => warn!("signal strength unavailable"),
    }

    Ok(address)
}

fn restart_after_failure(policy: &BootstrapPolicy, err: &anyhow::Error) -> ! {
    error!("failed to connect to WiFi: {err:#}");
    warn!("check the WiFi credentials baked into this build");
    warn!("restarting in {} ms", policy.restart_delay_ms);
    thread::sleep(Duration::from_millis(policy.restart_delay_ms));
    unsafe { esp_idf_svc::sys::esp_restart() }
}

fn create_http_server(
    controller: SharedController,
    link: SharedLink,
    port: u16,
) -> anyhow::Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        http_port: port,
        stack_size: HTTP_STACK_SIZE,
        max_uri_handlers: MAX_URI_HANDLERS,
        uri_match_wildcard: true,
        ..Default::default()
    };

    let mut server = EspHttpServer::new(&conf)?;

    // Routes answer every method; httpd matches on (uri, method) pairs.
    for method in ROUTED_METHODS {
        server.fn_handler::<anyhow::Error, _>(ROUTE_INDEX, method, |req| {
            req.into_response(200, Some("OK"), &[("Content-Type", CONTENT_TYPE_HTML)])?
                .write_all(INDEX_HTML.as_bytes())?;
            Ok(())
        })?;

        let gpio_controller = controller.clone();
        server.fn_handler(ROUTE_GPIO, method, move |req| {
            let uri = req.uri().to_string();
            let pin = query_param(&uri, PARAM_PIN);
            let state = query_param(&uri, PARAM_STATE);

            let result = lock(&gpio_controller).apply_query(pin.as_deref(), state.as_deref());
            match result {
                Ok(report) => {
                    info!(
                        "GPIO{} -> {}",
                        report.pin.number(),
                        if report.on { "ON" } else { "OFF" }
                    );
                    write_json(req, 200, &SetPinResponse::from(report))
                }
                Err(err) => {
                    warn!("rejected `{uri}`: {err}");
                    write_json(req, err.status_code(), &ErrorResponse::new(err.reason()))
                }
            }
        })?;

        let status_controller = controller.clone();
        server.fn_handler(ROUTE_STATUS, method, move |req| {
            let status = lock(&status_controller).status();
            write_json(req, 200, &status)
        })?;

        let ip_link = link.clone();
        server.fn_handler(ROUTE_IP, method, move |req| {
            let address = lock(&ip_link)
                .address()
                .unwrap_or_else(|| UNASSIGNED_ADDRESS.to_string());
            write_text(req, 200, &address)
        })?;
    }

    // Registered last: httpd tries handlers in registration order.
    for method in ROUTED_METHODS {
        server.fn_handler("/*", method, |req| write_text(req, 404, NOT_FOUND_BODY))?;
    }

    Ok(server)
}

fn write_json<T: Serialize>(
    req: esp_idf_svc::http::server::Request<
        &mut esp_idf_svc::http::server::EspHttpConnection<'_>,
    >,
    status_code: u16,
    payload: &T,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec(payload)?;
    req.into_response(status_code, None, &[("Content-Type", CONTENT_TYPE_JSON)])?
        .write_all(&body)?;
    Ok(())
}

fn write_text(
    req: esp_idf_svc::http::server::Request<
        &mut esp_idf_svc::http::server::EspHttpConnection<'_>,
    >,
    status_code: u16,
    body: &str,
) -> anyhow::Result<()> {
    req.into_response(status_code, None, &[("Content-Type", CONTENT_TYPE_TEXT)])?
        .write_all(body.as_bytes())?;
    Ok(())
}

fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn link_error(err: esp_idf_svc::sys::EspError) -> BootstrapError {
    BootstrapError::Link(err.to_string())
}

fn station_rssi() -> Option<i8> {
    let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
    (rc == esp_idf_svc::sys::ESP_OK).then_some(ap_info.rssi)
}
