//! Store key namespaces
//!
//! Canonical records (`app_{id}`) and change stamps (`app_lastchanged_{id}`)
//! share the `app_` prefix, so an app id starting with `lastchanged_` would
//! alias another app's stamp. Play Store package ids never take that form in
//! practice; the layout is kept so existing stores stay readable.

/// WatchConfig document
pub const CONFIG: &str = "config";

/// Namespaces written by the TTL cache. Clearing these only drops memoised
/// source responses; canonical records and the watch set are untouched.
pub const CACHE_PREFIXES: [&str; 4] = ["gdata_", "appbrain_", "apkpure_url:", "apkpure_detail:"];

/// Canonical (last persisted) record for an app
pub fn app_record(app_id: &str) -> String {
    format!("app_{}", app_id)
}

/// Timestamp of the last detected version change for an app
pub fn last_changed(app_id: &str) -> String {
    format!("app_lastchanged_{}", app_id)
}

/// Memoised result of the whole resolution chain
pub fn resolved(app_id: &str) -> String {
    format!("gdata_{}", app_id)
}

/// Memoised raw AppBrain response
pub fn appbrain(app_id: &str) -> String {
    format!("appbrain_{}", app_id)
}

/// Memoised APKPure search page
pub fn apkpure_search(app_id: &str) -> String {
    format!("apkpure_url:{}", app_id)
}

/// Memoised APKPure details page
pub fn apkpure_detail(app_id: &str) -> String {
    format!("apkpure_detail:{}", app_id)
}
