/// Source name constants to ensure consistency across the codebase.
/// These are the names used in config `[sources] enabled`, logs, metrics and the `source` field.
pub const BROOKLYN_PAPER_API: &str = "brooklyn_paper";
pub const BROOKLYN_LIBRARY_API: &str = "brooklyn_library";
pub const EVENTBRITE_MUSIC_API: &str = "eventbrite_music";
pub const WAGMAG_API: &str = "wagmag";
pub const NYC_SAMPLE_API: &str = "nyc_sample";

// Fixed target URLs, one per adapter
pub const BROOKLYN_PAPER_URL: &str = "https://events.brooklynpaper.com";
pub const BROOKLYN_LIBRARY_URL: &str = "https://www.bklynlibrary.org/event-series";
pub const EVENTBRITE_MUSIC_URL: &str = "https://www.eventbrite.com/b/ny--brooklyn/music";
pub const WAGMAG_URL: &str = "https://wagmag.org";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

// Prospect Heights, Brooklyn
pub const REFERENCE_NAME: &str = "Prospect Heights";
pub const REFERENCE_LAT: f64 = 40.6782;
pub const REFERENCE_LNG: f64 = -73.9712;

pub const EARTH_RADIUS_MILES: f64 = 3959.0;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_CACHE_PATH: &str = "events_cache.json";
pub const DEFAULT_PORT: u16 = 5001;

/// Get all registered source names, in registration (first-seen) order
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![
        BROOKLYN_PAPER_API,
        BROOKLYN_LIBRARY_API,
        EVENTBRITE_MUSIC_API,
        WAGMAG_API,
        NYC_SAMPLE_API,
    ]
}

/// Built-in neighborhood table used when config does not override it.
pub fn default_neighborhoods() -> Vec<(&'static str, f64, f64)> {
    vec![
        ("prospect park", 40.6627, -73.9700),
        ("williamsburg", 40.7081, -73.9571),
        ("park slope", 40.6782, -73.9840),
        ("prospect heights", 40.6782, -73.9712),
        ("brooklyn museum", 40.6712, -73.9642),
        ("brooklyn children's museum", 40.6694, -73.9479),
        ("brooklyn bridge park", 40.6981, -73.9969),
        ("red hook", 40.6773, -74.0106),
        ("flatbush", 40.6529, -73.9497),
        ("gowanus", 40.6779, -73.9897),
        ("fort greene", 40.6915, -73.9759),
        ("crown heights", 40.6697, -73.9442),
        ("dumbo", 40.7033, -73.9878),
        ("carroll gardens", 40.6795, -73.9996),
        ("boerum hill", 40.6865, -73.9807),
        ("central library", 40.6722, -73.9683),
        ("bargemusic", 40.7036, -73.9954),
    ]
}
