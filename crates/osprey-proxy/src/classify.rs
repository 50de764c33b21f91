//! Request classification for the caching proxy.

/// Resource classes, each served by its own caching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    /// Application shell assets: cache-first with network refill.
    Shell,
    /// Top-level document loads: network-first with cached-shell fallback,
    /// so the app remains launchable offline.
    Navigation,
    /// Map tile imagery: stale-while-revalidate.
    Tile,
    /// Not interceptable: forwarded without touching any cache.
    Bypass,
}

/// Whether a URL uses a scheme the proxy can actually fetch. Non-network
/// protocols bypass interception entirely.
pub fn is_retrievable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Classify one intercepted request.
pub fn classify(method: &str, path: &str, accept: Option<&str>, tile_prefix: &str) -> ResourceClass {
    if !method.eq_ignore_ascii_case("GET") {
        return ResourceClass::Bypass;
    }
    if path.starts_with(tile_prefix) {
        return ResourceClass::Tile;
    }
    let wants_document = accept.is_some_and(|a| a.contains("text/html"));
    if wants_document || path == "/" || path.ends_with("/index.html") {
        return ResourceClass::Navigation;
    }
    ResourceClass::Shell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_win_over_everything() {
        assert_eq!(classify("GET", "/tiles/12/1205/1539.png", None, "/tiles/"), ResourceClass::Tile);
    }

    #[test]
    fn document_loads_are_navigations() {
        assert_eq!(classify("GET", "/", None, "/tiles/"), ResourceClass::Navigation);
        assert_eq!(
            classify("GET", "/app", Some("text/html,application/xhtml+xml"), "/tiles/"),
            ResourceClass::Navigation
        );
    }

    #[test]
    fn assets_default_to_shell() {
        assert_eq!(classify("GET", "/assets/index.js", None, "/tiles/"), ResourceClass::Shell);
        assert_eq!(
            classify("GET", "/manifest.webmanifest", Some("*/*"), "/tiles/"),
            ResourceClass::Shell
        );
    }

    #[test]
    fn mutating_methods_bypass_the_cache() {
        assert_eq!(classify("POST", "/api/activate", None, "/tiles/"), ResourceClass::Bypass);
    }

    #[test]
    fn non_network_schemes_are_not_retrievable() {
        assert!(is_retrievable("https://tile.openstreetmap.org/1/2/3.png"));
        assert!(is_retrievable("http://127.0.0.1:5173/index.html"));
        assert!(!is_retrievable("chrome-extension://abcdef/script.js"));
        assert!(!is_retrievable("data:image/png;base64,AAAA"));
        assert!(!is_retrievable("file:///etc/hosts"));
    }
}
