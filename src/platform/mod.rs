//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Input mapping and queuing
//! - Host clock and calendar date

pub mod input;

pub use input::{HeldInput, InputQueue, KeyMap};

/// Today's local date as ISO `YYYY-MM-DD`
#[cfg(target_arch = "wasm32")]
pub fn today_iso() -> String {
    let date = js_sys::Date::new_0();
    format!(
        "{:04}-{:02}-{:02}",
        date.get_full_year(),
        date.get_month() + 1,
        date.get_date()
    )
}

/// Today's UTC date as ISO `YYYY-MM-DD`
#[cfg(not(target_arch = "wasm32"))]
pub fn today_iso() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    crate::progress::iso_from_days((secs / 86_400) as i64)
}

/// Host monotonic time in milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_is_iso() {
        let today = today_iso();
        assert_eq!(today.len(), 10);
        assert!(crate::progress::days_from_iso(&today).is_some());
    }

    #[test]
    fn test_now_is_monotonic() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
