//! Cookie sessions, the auth middleware, and the account endpoints.

mod cookie;
mod log_in;
mod middleware;
mod register_user;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::{LogInData, LogInState, post_log_in, post_log_out};
pub use middleware::{AuthState, auth_guard};
pub use register_user::{RegisterForm, RegistrationState, get_current_user, register_user};
