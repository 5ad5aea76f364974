pub const ROUTE_INDEX: &str = "/";
pub const ROUTE_GPIO: &str = "/gpio";
pub const ROUTE_STATUS: &str = "/status";
pub const ROUTE_IP: &str = "/ip";

pub const PARAM_PIN: &str = "pin";
pub const PARAM_STATE: &str = "state";

pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

pub const NOT_FOUND_BODY: &str = "404: Not Found";
