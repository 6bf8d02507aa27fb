use std::sync::Arc;

use poem::{Endpoint, EndpointExt, Route, middleware::Tracing};
use poem_openapi::OpenApiService;
use tracing::info;

use crate::{
    application::{
        handlers::dispatch_engine::DispatchEngine,
        services::{auth_gate::AuthGate, registry::SenderRegistry},
        usecases::{
            manage_senders::ManageSendersUseCase, query_history::QueryHistoryUseCase,
            resolve_recipient::ResolveRecipientUseCase, send_message::SendMessageUseCase,
        },
    },
    domain::{
        models::AuthRule,
        repositories::{HistoryRepository, SenderConfigStore},
    },
    infrastructure::messaging::ProviderClient,
    presentation::http::{
        endpoints::{
            health::HealthEndpoints,
            histories::HistoriesEndpoints,
            messages::MessagesEndpoints,
            root::ApiState,
            senders::SendersEndpoints,
        },
        security::AuthGateMiddleware,
    },
};

/// Everything the gateway needs from the outside.
pub struct Components {
    pub store: Arc<dyn SenderConfigStore>,
    pub history: Arc<dyn HistoryRepository>,
    pub client: ProviderClient,
    pub auth_rules: Vec<AuthRule>,
    pub queue_capacity: usize,
}

/// A running gateway: registry loaded, dispatch loop and config watcher
/// spawned.
pub struct Gateway {
    engine: Arc<DispatchEngine>,
    state: Arc<ApiState>,
    gate: Arc<AuthGate>,
}

impl Gateway {
    pub async fn start(components: Components) -> Self {
        let Components {
            store,
            history,
            client,
            auth_rules,
            queue_capacity,
        } = components;

        let registry = Arc::new(SenderRegistry::new(store.clone(), client));
        registry.reconcile().await;

        let (engine, worker) = DispatchEngine::new(registry.clone(), history.clone(), queue_capacity);
        worker.spawn(engine.clone());
        engine.watch_config_changes(store.subscribe());

        let state = Arc::new(ApiState {
            send_message_usecase: Arc::new(SendMessageUseCase::new(engine.clone())),
            resolve_recipient_usecase: Arc::new(ResolveRecipientUseCase::new(registry)),
            manage_senders_usecase: Arc::new(ManageSendersUseCase::new(store)),
            query_history_usecase: Arc::new(QueryHistoryUseCase::new(history)),
        });

        let gate = Arc::new(AuthGate::new(auth_rules));
        if gate.is_open() {
            info!("no auth rules configured, mutating endpoints are open");
        }

        Self {
            engine,
            state,
            gate,
        }
    }

    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// `/v1` API behind the auth gate plus Swagger UI at `/docs`.
    pub fn app(&self, server_url: &str) -> impl Endpoint + use<> {
        let api_service = OpenApiService::new(
            (
                HealthEndpoints,
                MessagesEndpoints::new(self.state.clone()),
                SendersEndpoints::new(self.state.clone()),
                HistoriesEndpoints::new(self.state.clone()),
            ),
            "Messenger API",
            env!("CARGO_PKG_VERSION"),
        )
        .server(format!("{server_url}/v1"));
        let ui = api_service.swagger_ui();

        Route::new()
            .nest("/v1", api_service.with(AuthGateMiddleware::new(self.gate.clone())))
            .nest("/docs", ui)
            .with(Tracing)
    }

    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
    }
}
