use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    services::email_service::Mailer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, orm, mailer }
    }
}
