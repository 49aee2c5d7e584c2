//! Logging surface for driver scripts.
//!
//! Drivers get `log_info`, `log_warn` and `log_error` functions that forward
//! into the host's `log` facade, capped per tick so a chatty driver cannot
//! flood the output. The cap resets when the owning creation advances its
//! tick.

use std::sync::atomic::{AtomicU32, Ordering};

use rhai::{Dynamic, Engine};

/// Maximum number of script log messages allowed per tick.
const MAX_LOGS_PER_TICK: u32 = 100;

static LOG_COUNT: AtomicU32 = AtomicU32::new(0);
static WARNED_LIMIT: AtomicU32 = AtomicU32::new(0);

/// Log level for script messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Reset the per-tick log counter. Called when the owning creation advances
/// its tick.
pub fn reset_tick_log_count() {
    LOG_COUNT.store(0, Ordering::Relaxed);
    WARNED_LIMIT.store(0, Ordering::Relaxed);
}

/// Check if another message fits under this tick's cap.
fn can_log() -> bool {
    let count = LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MAX_LOGS_PER_TICK {
        // Only warn once per tick about exceeding the limit.
        if WARNED_LIMIT.swap(1, Ordering::Relaxed) == 0 {
            log::warn!(
                "script log limit exceeded ({} messages/tick), further logs dropped",
                MAX_LOGS_PER_TICK
            );
        }
        false
    } else {
        true
    }
}

/// Log a message from a script, respecting the per-tick limit.
pub fn script_log(level: LogLevel, message: &str) {
    if !can_log() {
        return;
    }
    match level {
        LogLevel::Info => log::info!(target: "script", "{}", message),
        LogLevel::Warn => log::warn!(target: "script", "{}", message),
        LogLevel::Error => log::error!(target: "script", "{}", message),
    }
}

/// Register the script logging functions on an engine.
pub fn register(engine: &mut Engine) {
    engine
        .register_fn("log_info", |value: Dynamic| {
            script_log(LogLevel::Info, &stringify_dynamic(&value));
        })
        .register_fn("log_warn", |value: Dynamic| {
            script_log(LogLevel::Warn, &stringify_dynamic(&value));
        })
        .register_fn("log_error", |value: Dynamic| {
            script_log(LogLevel::Error, &stringify_dynamic(&value));
        });
}

/// Convert a Rhai Dynamic value to a string safely. Never panics.
pub fn stringify_dynamic(value: &Dynamic) -> String {
    if let Ok(s) = value.clone().into_string() {
        return s;
    }

    if value.is_array() {
        if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
            let parts: Vec<String> = arr.iter().map(stringify_dynamic).collect();
            return parts.join(" ");
        }
    }

    if value.is_map() {
        if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, stringify_dynamic(v)))
                .collect();
            return format!("{{{}}}", parts.join(", "));
        }
    }

    if let Ok(i) = value.as_int() {
        return i.to_string();
    }
    if let Ok(f) = value.as_float() {
        return format!("{}", f);
    }
    if let Ok(b) = value.as_bool() {
        return b.to_string();
    }
    if value.is_unit() {
        return "()".to_string();
    }

    format!("{:?}", value)
}
