//! Liveness and readiness state
//!
//! The service has two moving parts that can fail independently: the loaded
//! classifier and the directory holding the history file. The server is
//! ready only once a model is loaded and neither part is unhealthy.

use crate::history::HistoryStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Parts of the service tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Predictor,
    HistoryStore,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Predictor => "predictor",
            Component::HistoryStore => "history_store",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, with a warning
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        !matches!(self, ComponentStatus::Unhealthy)
    }

    /// Worst status of a set; healthy when empty
    pub fn worst<'a>(statuses: impl IntoIterator<Item = &'a ComponentStatus>) -> ComponentStatus {
        statuses
            .into_iter()
            .copied()
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Latest known state of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub components: BTreeMap<Component, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<Component, ComponentHealth>,
    model_version: Option<String>,
}

/// Shared, cloneable health state
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a component. The predictor starts unhealthy until a model is loaded.
    pub async fn register(&self, component: Component) {
        let initial = match component {
            Component::Predictor => ComponentHealth::unhealthy("Model not loaded yet"),
            Component::HistoryStore => ComponentHealth::healthy(),
        };
        self.update(component, initial).await;
    }

    pub async fn update(&self, component: Component, health: ComponentHealth) {
        self.state.write().await.components.insert(component, health);
    }

    pub async fn set_healthy(&self, component: Component) {
        self.update(component, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.update(component, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.update(component, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the loaded model; the predictor becomes healthy
    pub async fn model_loaded(&self, version: &str) {
        let mut state = self.state.write().await;
        state.model_version = Some(version.to_string());
        state
            .components
            .insert(Component::Predictor, ComponentHealth::healthy());
    }

    /// Check the history directory accepts writes and record the result
    pub async fn check_history_store(&self, store: &HistoryStore) -> ComponentStatus {
        let health = match store.check_writable() {
            Ok(()) => ComponentHealth::healthy(),
            Err(e) => ComponentHealth::unhealthy(format!(
                "{} is not writable: {}",
                store.path().display(),
                e
            )),
        };
        let status = health.status;
        self.update(Component::HistoryStore, health).await;
        status
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: ComponentStatus::worst(state.components.values().map(|h| &h.status)),
            model_version: state.model_version.clone(),
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        let reason = if state.model_version.is_none() {
            Some("Model not loaded yet".to_string())
        } else {
            state
                .components
                .iter()
                .find(|(_, h)| !h.status.is_operational())
                .map(|(component, h)| match &h.message {
                    Some(message) => format!("{} unhealthy: {}", component, message),
                    None => format!("{} unhealthy", component),
                })
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_status() {
        use ComponentStatus::*;
        assert_eq!(ComponentStatus::worst(&[]), Healthy);
        assert_eq!(ComponentStatus::worst(&[Healthy, Degraded]), Degraded);
        assert_eq!(ComponentStatus::worst(&[Degraded, Unhealthy, Healthy]), Unhealthy);
    }

    #[tokio::test]
    async fn test_predictor_starts_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register(Component::Predictor).await;
        registry.register(Component::HistoryStore).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[&Component::HistoryStore].status,
            ComponentStatus::Healthy
        );
        assert!(health.model_version.is_none());
    }

    #[tokio::test]
    async fn test_model_loaded_makes_service_ready() {
        let registry = HealthRegistry::new();
        registry.register(Component::Predictor).await;
        registry.register(Component::HistoryStore).await;
        assert!(!registry.readiness().await.ready);

        registry.model_loaded("2024.1").await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.model_version.as_deref(), Some("2024.1"));
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_degraded_store_stays_ready() {
        let registry = HealthRegistry::new();
        registry.model_loaded("v1").await;
        registry
            .set_degraded(Component::HistoryStore, "Slow disk")
            .await;

        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_unhealthy_store_names_the_reason() {
        let registry = HealthRegistry::new();
        registry.model_loaded("v1").await;
        registry
            .set_unhealthy(Component::HistoryStore, "Permission denied")
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("history_store unhealthy: Permission denied")
        );
    }

    #[tokio::test]
    async fn test_writable_history_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = HealthRegistry::new();
        let store = HistoryStore::new(dir.path().join("history.csv"));

        let status = registry.check_history_store(&store).await;
        assert_eq!(status, ComponentStatus::Healthy);
        assert_eq!(
            registry.health().await.components[&Component::HistoryStore].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_unwritable_history_store() {
        let dir = tempfile::TempDir::new().unwrap();
        // A regular file where the history directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let registry = HealthRegistry::new();
        registry.model_loaded("v1").await;
        let store = HistoryStore::new(blocker.join("history.csv"));

        let status = registry.check_history_store(&store).await;
        assert_eq!(status, ComponentStatus::Unhealthy);
        assert!(!registry.readiness().await.ready);
    }

    #[test]
    fn test_component_keys_serialize_as_names() {
        let mut components = BTreeMap::new();
        components.insert(Component::HistoryStore, ComponentHealth::healthy());
        let json = serde_json::to_value(&components).unwrap();
        assert!(json["history_store"].is_object());
    }
}
