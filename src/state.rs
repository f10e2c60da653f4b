use std::sync::Arc;

use crate::db::{DbPool, OrmConn};
use crate::middleware::auth::AuthKeys;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub auth: Arc<AuthKeys>,
}
