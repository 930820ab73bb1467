// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{InMemoryStore, InventoryLedger, InventoryRepository, MenuCatalog, MenuRepository, OrderRepository, OrderStore},
    services::{
        auth::AuthService,
        connection_registry::ConnectionRegistry,
        event_dispatch::EventDispatcher,
        order_service::{OrderService, ReservationScope},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String, max_connections: u32 },
    // Só para desenvolvimento: tudo some quando o processo termina
    Memory { seed_file: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub backend: StoreBackend,
    pub reservation_scope: ReservationScope,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let port = match env::var("PORT") {
            Ok(p) => p.parse().with_context(|| format!("PORT inválida: '{p}'"))?,
            Err(_) => 6300,
        };

        let reservation_scope = match env::var("RESERVATION_SCOPE") {
            Ok(s) => s.parse()?,
            Err(_) => ReservationScope::default(),
        };

        let backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory {
                seed_file: env::var("SEED_FILE").ok().map(PathBuf::from),
            },
            Ok("postgres") | Err(_) => StoreBackend::Postgres {
                database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
                max_connections: match env::var("DB_MAX_CONNECTIONS") {
                    Ok(n) => n.parse().with_context(|| format!("DB_MAX_CONNECTIONS inválido: '{n}'"))?,
                    Err(_) => 5,
                },
            },
            Ok(other) => anyhow::bail!("STORE_BACKEND inválido: '{}' (use postgres ou memory)", other),
        };

        Ok(Self { port, jwt_secret, backend, reservation_scope })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub order_service: OrderService,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: EventDispatcher,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let (orders, menu, ledger): (Arc<dyn OrderStore>, Arc<dyn MenuCatalog>, Arc<dyn InventoryLedger>) =
            match &config.backend {
                StoreBackend::Postgres { database_url, max_connections } => {
                    let db_pool = PgPoolOptions::new()
                        .max_connections(*max_connections)
                        .acquire_timeout(Duration::from_secs(3))
                        .connect(database_url)
                        .await
                        .context("Falha ao conectar ao banco de dados")?;

                    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                    sqlx::migrate!()
                        .run(&db_pool)
                        .await
                        .context("Falha ao rodar as migrações do banco de dados")?;

                    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                    let orders: Arc<dyn OrderStore> = Arc::new(OrderRepository::new(db_pool.clone()));
                    let menu: Arc<dyn MenuCatalog> = Arc::new(MenuRepository::new(db_pool.clone()));
                    let ledger: Arc<dyn InventoryLedger> = Arc::new(InventoryRepository::new(db_pool));
                    (orders, menu, ledger)
                }
                StoreBackend::Memory { seed_file } => {
                    tracing::warn!("⚠️ Usando armazenamento em memória: os dados não são persistidos");
                    let store = Arc::new(InMemoryStore::new());
                    if let Some(path) = seed_file {
                        store
                            .seed_from_file(path)
                            .await
                            .with_context(|| format!("Falha ao carregar seed de {}", path.display()))?;
                    }
                    let orders: Arc<dyn OrderStore> = store.clone();
                    let menu: Arc<dyn MenuCatalog> = store.clone();
                    let ledger: Arc<dyn InventoryLedger> = store;
                    (orders, menu, ledger)
                }
            };

        tracing::info!(scope = ?config.reservation_scope, "Escopo de reserva de estoque");

        Ok(Self::from_parts(&config.jwt_secret, orders, menu, ledger, config.reservation_scope))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        jwt_secret: &str,
        orders: Arc<dyn OrderStore>,
        menu: Arc<dyn MenuCatalog>,
        ledger: Arc<dyn InventoryLedger>,
        scope: ReservationScope,
    ) -> Self {
        let order_service = OrderService::new(orders, menu, ledger, scope);
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = EventDispatcher::new(order_service.clone(), registry.clone());

        Self {
            auth_service: AuthService::new(jwt_secret),
            order_service,
            registry,
            dispatcher,
        }
    }
}
