use once_cell::sync::Lazy;
use regex::Regex;

/// Points a profile needs before it may register an organization
pub const DEFAULT_MIN_POINTS_TO_CREATE: f64 = 50.0;

/// Longest allowed organization key
pub const ORGANIZATION_KEY_MAX_LEN: usize = 6;

/// Longest allowed organization display name
pub const ORGANIZATION_NAME_MAX_LEN: usize = 50;

/// Default session cookie name
pub const DEFAULT_SESSION_COOKIE: &str = "judge_session";

/// Default login lifetime (two weeks)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1_209_600;

/// Header carrying a session token for non-browser clients
pub const SESSION_HEADER: &str = "x-judge-session";

/// Path of the login page unauthenticated requests are sent to
pub const LOGIN_PATH: &str = "/accounts/login";

/// Organization keys are letters and digits only
pub static RE_ORGANIZATION_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+$").expect("Invalid regex pattern for organization key")
});

/// Usernames accepted by `add-user`
pub static RE_USERNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]{1,30}$").expect("Invalid regex pattern for username")
});
