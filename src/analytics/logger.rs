use std::sync::LazyLock;

use crate::analytics::constants::ANALYTICS_LOGGER_NAME;
use crate::logger::Logger;

pub static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new(ANALYTICS_LOGGER_NAME));
