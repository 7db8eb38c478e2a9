//! The application's navigation state as an explicit value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which screen is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Clients,
    Client(Uuid),
    Reports,
    Resources,
    /// Standalone signing page for one request.
    Sign(Uuid),
}

impl View {
    /// Parse a URL fragment such as `#/sign/<id>`. Anything unrecognised
    /// lands on the dashboard.
    pub fn from_hash(hash: &str) -> Self {
        let path = hash.trim_start_matches('#').trim_matches('/');
        let mut parts = path.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("clients"), None, None) => View::Clients,
            (Some("clients"), Some(id), None) => id.parse().map_or(View::Clients, View::Client),
            (Some("reports"), None, None) => View::Reports,
            (Some("resources"), None, None) => View::Resources,
            (Some("sign"), Some(id), None) => id.parse().map_or(View::Dashboard, View::Sign),
            _ => View::Dashboard,
        }
    }

    pub fn to_hash(&self) -> String {
        match self {
            View::Dashboard => "#/".to_string(),
            View::Clients => "#/clients".to_string(),
            View::Client(id) => format!("#/clients/{id}"),
            View::Reports => "#/reports".to_string(),
            View::Resources => "#/resources".to_string(),
            View::Sign(id) => format!("#/sign/{id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub selected_client: Option<Uuid>,
    pub view: View,
}

impl UiState {
    pub fn select_client(&mut self, id: Uuid) {
        self.selected_client = Some(id);
        self.view = View::Client(id);
    }

    /// Forget a client that no longer exists.
    pub fn client_deleted(&mut self, id: Uuid) {
        if self.selected_client == Some(id) {
            self.selected_client = None;
        }
        if self.view == View::Client(id) {
            self.view = View::Clients;
        }
    }
}
