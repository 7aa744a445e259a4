//! Authentication: refresh token lifecycle, per-request bearer filter,
//! and client fingerprint extraction.

pub mod device;
mod errors;
mod extractors;
pub mod filter;
mod refresh;

pub use device::{extract_client_ip, extract_device_info};
pub use errors::AuthError;
pub use extractors::{ClientMeta, CurrentUser};
pub use filter::{AuthContext, authenticate_request};
pub use refresh::{REFRESH_TOKEN_DURATION_SECS, RefreshTokenError, RefreshTokenManager};
