//! The single explicit application context threaded through every axum
//! handler via `State`. No global mutable singletons anywhere in this
//! crate — every shared resource is constructed once in `run()` and
//! carried here.

use std::sync::Arc;

use sqlx::AnyPool;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::nsi::NsiClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: AnyPool,
    pub nsi: Arc<NsiClient>,
    pub dispatcher: Dispatcher,
}
