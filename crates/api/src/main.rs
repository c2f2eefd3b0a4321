use veriflow_infra::PipelineConfig;

#[tokio::main]
async fn main() {
    veriflow_observability::init();

    let config = PipelineConfig::from_env();
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let (app, workers) = veriflow_api::app::build_app(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind listen address");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();

    for worker in workers {
        worker.shutdown();
    }
}
