//! Routing benchmarks.
//!
//! Commands are scanned in registration order, so the worst case is a command
//! owned by the last registered server.

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lsp_mux::{Coordinator, RuntimeConfig};
use lsp_mux_core::ClientSink;
use lsp_mux_core::protocol::identity::{
    GetSsoTokenProgress, SsoTokenChangedParams, StsCredentialChangedParams,
};
use lsp_mux_core::protocol::{NotificationParams, PartialInitializeResult};
use serde_json::{Value, json};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tower_lsp_server::ls_types::{ExecuteCommandParams, InitializeParams, MessageType};

struct NullSink;

#[async_trait]
impl ClientSink for NullSink {
    async fn log_message(&self, _kind: MessageType, _message: String) {}
    async fn telemetry_event(&self, _event: Value) {}
    async fn show_notification(&self, _params: NotificationParams) {}
    async fn sso_token_changed(&self, _params: SsoTokenChangedParams) {}
    async fn sts_credential_changed(&self, _params: StsCredentialChangedParams) {}
    async fn sso_token_progress(&self, _progress: GetSsoTokenProgress) {}
}

fn coordinator_with(servers: usize) -> Coordinator {
    let mut coordinator = Coordinator::new(Arc::new(NullSink), RuntimeConfig::default());

    for index in 0..servers {
        let facade = coordinator.add_server();
        let result: PartialInitializeResult = serde_json::from_value(json!({
            "serverInfo": {"name": format!("Server {index}")},
            "capabilities": {
                "executeCommandProvider": {"commands": [format!("server{index}.run")]}
            },
            "awsServerCapabilities": {
                "configurationProvider": {"sections": [format!("aws.server{index}")]}
            }
        }))
        .unwrap_or_default();

        facade.on_initialize(move |_, _| {
            let result = result.clone();
            async move { Ok(result) }
        });
        facade.on_execute_command(|params, _| async move { Ok(Some(json!(params.command))) });
    }

    coordinator
}

fn init_params() -> InitializeParams {
    InitializeParams {
        initialization_options: Some(json!({"aws": {}})),
        ..Default::default()
    }
}

fn bench_initialize(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("initialize");

    for servers in [1, 5, 20] {
        let coordinator = coordinator_with(servers);
        group.bench_with_input(
            BenchmarkId::from_parameter(servers),
            &coordinator,
            |b, coordinator| {
                b.iter(|| {
                    rt.block_on(async {
                        black_box(
                            coordinator
                                .initialize_servers(init_params(), CancellationToken::new())
                                .await,
                        )
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_dispatch_command(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch_command");

    for servers in [1, 5, 20] {
        let coordinator = coordinator_with(servers);
        rt.block_on(coordinator.initialize_servers(init_params(), CancellationToken::new()))
            .unwrap();

        let params: ExecuteCommandParams =
            serde_json::from_value(json!({"command": format!("server{}.run", servers - 1)}))
                .unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(servers),
            &params,
            |b, params| {
                b.iter(|| {
                    rt.block_on(coordinator.dispatch_command(
                        black_box(params.clone()),
                        CancellationToken::new(),
                    ))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_initialize, bench_dispatch_command);
criterion_main!(benches);
