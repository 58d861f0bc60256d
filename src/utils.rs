use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use std::future::Future;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

/// Run `fut` on the tokio runtime and hand its output to `on_done` on the
/// GTK main context.
pub fn run_async_to_main<T, Fut, F>(fut: Fut, on_done: F)
where
    T: Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    F: FnOnce(T) + 'static,
{
    let handle = RUNTIME.spawn(fut);
    glib::MainContext::default().spawn_local(async move {
        match handle.await {
            Ok(res) => on_done(res),
            Err(e) => log::error!("background task failed: {e}"),
        }
    });
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Short age label for the contact list.
pub fn relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let age = now.signed_duration_since(then);
    let mins = age.num_minutes();
    if mins < 1 {
        "just now".into()
    } else if mins < 60 {
        format!("{mins}m")
    } else if age.num_hours() < 24 {
        format!("{}h", age.num_hours())
    } else if age.num_days() < 7 {
        format!("{}d", age.num_days())
    } else {
        then.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

/// `HH:MM` in local time for message bubbles.
pub fn clock_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => t.with_timezone(&Local).format("%H:%M").to_string(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-10T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn normalizes_scheme_less_urls() {
        assert_eq!(normalize_url(" hooks.example.com/messages "), "https://hooks.example.com/messages");
        assert_eq!(normalize_url("http://localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_url("  "), "");
    }

    #[test]
    fn relative_time_buckets() {
        assert_eq!(relative_time("2024-05-10T11:59:30Z", now()), "just now");
        assert_eq!(relative_time("2024-05-10T11:15:00Z", now()), "45m");
        assert_eq!(relative_time("2024-05-10T07:00:00Z", now()), "5h");
        assert_eq!(relative_time("2024-05-07T12:00:00Z", now()), "3d");
        assert_eq!(relative_time("garbage", now()), "garbage");
    }

    #[test]
    fn old_messages_show_a_date() {
        let label = relative_time("2024-04-01T12:00:00Z", now());
        assert!(label.starts_with("2024-04-0"), "{label}");
    }

    #[test]
    fn clock_time_is_empty_for_bad_input() {
        assert_eq!(clock_time("not a time"), "");
        assert_eq!(clock_time("2024-05-10T11:15:00Z").len(), 5);
    }
}
