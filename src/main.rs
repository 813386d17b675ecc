//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;

use wishco_portal_backend::{config::AppState, handlers, middleware::auth::auth_guard};

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // Rotas do portal (protegidas pelo middleware)
    let portal_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/items", get(handlers::catalog::list_items))
        .route(
            "/selection",
            get(handlers::selection::get_selection).delete(handlers::selection::clear_selection),
        )
        .route("/selection/{code}", put(handlers::selection::upsert_line))
        .route("/requests", post(handlers::requests::submit))
        .route("/requests/recent", get(handlers::requests::recent))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(handlers::health::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", portal_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
