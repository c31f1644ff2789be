pub mod api;
pub mod api_doc;
pub mod server;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::controller::Controller;

pub use server::run_server;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<Controller>>,
}
