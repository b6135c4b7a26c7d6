//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Keys searched, in order, for the store DSN.
pub const STORE_URL_KEYS: [&str; 3] = ["SUPABASE_DB_URL", "DATABASE_URL", "DB_URL"];

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        // Load .env if present; fall back to the crate root for `cargo run` from elsewhere.
        if dotenv::dotenv().is_err() {
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Common bootstrap for binaries:
///   * initialize dotenv/env once
///   * log whether a store DSN is available
pub fn bootstrap_cli(bin_name: &str) {
    init_env();

    if STORE_URL_KEYS.iter().any(|k| env_opt(k).is_some()) {
        info!(target = "bootstrap", bin = bin_name, "store DSN detected");
    } else {
        warn!(
            target = "bootstrap",
            bin = bin_name,
            "no store DSN configured (SUPABASE_DB_URL / DATABASE_URL / DB_URL)"
        );
    }
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Store DSN: first of `STORE_URL_KEYS` that is set. Missing credentials are fatal.
pub fn db_url() -> anyhow::Result<String> {
    init_env();
    for k in STORE_URL_KEYS {
        if let Some(v) = env_opt(k) {
            return Ok(v);
        }
    }
    Err(anyhow::anyhow!(
        "no database URL env vars set (tried {:?})",
        STORE_URL_KEYS
    ))
}

/// Same as `db_url()` but auto-swaps Supabase transaction pooler 6543 -> 5432 (session pooler)
/// to avoid prepared-statement/timeout issues. Safe no-op for non-Supabase URLs.
pub fn db_url_prefer_session() -> anyhow::Result<String> {
    let raw = db_url()?;
    if env_flag("DISABLE_SESSION_SWAP", false) {
        Ok(raw)
    } else {
        Ok(prefer_session_mode(&raw))
    }
}

/// Queue DSN. The job table may live in a separate database; defaults to the store.
pub fn queue_db_url() -> anyhow::Result<String> {
    match env_opt("QUEUE_DATABASE_URL") {
        Some(v) => Ok(prefer_session_mode(&v)),
        None => db_url_prefer_session(),
    }
}

/// If the URL looks like Supabase's transaction pooler (port 6543),
/// prefer the session pooler (5432).
pub fn prefer_session_mode(url: &str) -> String {
    if url.contains("pooler.supabase.com:6543") {
        warn!("detected Supabase transaction pooler (:6543); switching to :5432 (session)");
        url.replace("pooler.supabase.com:6543", "pooler.supabase.com:5432")
    } else {
        url.to_string()
    }
}

fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("KEY") || k.contains("TOKEN")
    {
        return "***".to_string();
    }

    let val_trim = val.trim();

    // Always redact postgres DSNs even if the key isn't obviously sensitive.
    if let Ok(mut u) = url::Url::parse(val_trim) {
        let scheme = u.scheme().to_ascii_lowercase();
        if scheme == "postgres" || scheme == "postgresql" {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }

    val_trim.to_string()
}

/// Validate required keys and log a consolidated, redacted snapshot of configuration.
/// `required` groups are alternatives: each group needs at least one key set.
pub fn preflight_check(title: &str, required: &[&[&str]], also_log: &[&str]) -> anyhow::Result<()> {
    init_env();
    let missing: Vec<String> = required
        .iter()
        .filter(|group| group.iter().all(|k| env_opt(k).is_none()))
        .map(|group| group.join("|"))
        .collect();
    let snapshot: Vec<(String, String)> = also_log
        .iter()
        .map(|&k| (k.to_string(), redact_value(k, &env_opt(k).unwrap_or_default())))
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    if !missing.is_empty() {
        return Err(anyhow::anyhow!("missing required env: {:?}", missing));
    }
    Ok(())
}
