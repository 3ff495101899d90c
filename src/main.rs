use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::Instant,
};
use tokio::sync::{broadcast, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crafting_server::config::ServerConfig;
use crafting_server::crafting::{CraftingEvent, CraftingRegistry, CraftingSystem};
use crafting_server::data::ItemRegistry;
use crafting_server::db::Database;
use crafting_server::error::CraftError;
use crafting_server::player::Player;
use crafting_server::protocol::{
    AvailabilityQuery, ClaimResponse, CraftRequest, CreatePlayerRequest, ErrorResponse, ItemView,
    PlayerRequest, PlayerView, RecipeAvailability, RecipeQuery, RecipeView, StationView,
};

// ============================================================================
// App State
// ============================================================================

/// Everything that changes while the server runs, behind one lock
struct World {
    system: CraftingSystem,
    players: HashMap<String, Player>,
}

#[derive(Clone)]
struct AppState {
    world: Arc<Mutex<World>>,
    events: broadcast::Sender<CraftingEvent>,
    db: Arc<Database>,
    config: Arc<ServerConfig>,
}

impl AppState {
    async fn new(config: ServerConfig) -> Result<Self, sqlx::Error> {
        let mut items = ItemRegistry::new();
        if let Err(e) = items.load_from_directory(&config.data_dir) {
            error!("Failed to load items: {}", e);
        }
        let items = Arc::new(items);

        let mut recipes = CraftingRegistry::new();
        if let Err(e) = recipes.load_from_directory(&config.data_dir) {
            error!("Failed to load recipes: {}", e);
        }
        let recipes = Arc::new(recipes);

        let db = Database::new(&config.database_url).await?;
        let (events, _) = broadcast::channel(256);

        let mut world = World {
            system: CraftingSystem::new(recipes, items.clone()),
            players: HashMap::new(),
        };

        for station_id in &config.stations {
            world.system.add_station(station_id);
        }
        // Saved stations come back even if the config no longer lists them,
        // so nothing left in an output slot is lost
        if let Some(snapshot) = db.load_world().await? {
            world.system.restore(&snapshot);
        }
        wire_stations(&mut world.system, &events);

        for player in db.load_players(items).await? {
            world.players.insert(player.id.clone(), player);
        }
        info!("Loaded {} players", world.players.len());

        Ok(Self {
            world: Arc::new(Mutex::new(world)),
            events,
            db: Arc::new(db),
            config: Arc::new(config),
        })
    }
}

/// Forward every station's events to the broadcast channel
fn wire_stations(system: &mut CraftingSystem, events: &broadcast::Sender<CraftingEvent>) {
    let station_ids: Vec<String> = system.stations().map(|s| s.id().to_string()).collect();
    for station_id in &station_ids {
        let Some(station) = system.station_mut(station_id) else {
            continue;
        };
        let tx = events.clone();
        station.subscribe(move |event: &CraftingEvent| {
            // No receivers just means nobody is watching
            let _ = tx.send(event.clone());
        });
    }
    info!("Placed {} crafting station(s)", station_ids.len());
}

// ============================================================================
// Errors
// ============================================================================

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, message: impl ToString) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse::new(message)))
}

fn player_not_found(player_id: &str) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::NOT_FOUND, format!("unknown player: {}", player_id))
}

fn station_not_found(station_id: &str) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::NOT_FOUND, format!("unknown station: {}", station_id))
}

fn craft_error(e: CraftError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        CraftError::UnknownRecipe(_) => StatusCode::NOT_FOUND,
        CraftError::NotCrafter { .. } => StatusCode::FORBIDDEN,
        CraftError::LedgerInconsistent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::CONFLICT,
    };
    api_error(status, e)
}

// ============================================================================
// HTTP Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let world = state.world.lock().await;
    Json(serde_json::json!({
        "status": "ok",
        "clock": world.system.clock().now(),
        "stations": world.system.stations().count(),
        "players": world.players.len(),
    }))
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Json<Vec<RecipeView>> {
    let world = state.world.lock().await;
    let items = world.system.items();
    let recipes = world.system.recipes();
    let views = match query.category {
        Some(category) => recipes
            .by_category(category)
            .into_iter()
            .map(|recipe| RecipeView::new(recipe, items))
            .collect(),
        None => recipes.all().map(|recipe| RecipeView::new(recipe, items)).collect(),
    };
    Json(views)
}

async fn list_items(State(state): State<AppState>) -> Json<Vec<ItemView>> {
    let world = state.world.lock().await;
    let mut items: Vec<ItemView> = world.system.items().all().map(ItemView::from).collect();
    items.sort_by(|a, b| a.id.cmp(&b.id));
    Json(items)
}

async fn create_player(
    State(state): State<AppState>,
    Json(req): Json<CreatePlayerRequest>,
) -> ApiResult<PlayerView> {
    let name = req.name.trim();
    if name.is_empty() || name.len() > 32 {
        return Err(api_error(StatusCode::BAD_REQUEST, "name must be 1-32 characters"));
    }

    let id = Uuid::new_v4().to_string();
    let player = {
        let mut world = state.world.lock().await;
        let mut player = Player::new(
            &id,
            name,
            world.system.items().clone(),
            state.config.starting_level,
        );
        for item in &state.config.starter_items {
            let leftover = player.inventory.add_item(&item.item_id, item.count);
            if leftover > 0 {
                warn!("Starter item {} did not fit ({} left over)", item.item_id, leftover);
            }
        }
        world.players.insert(id.clone(), player.clone());
        player
    };

    // The world lock is released; the next autosave covers a failure here
    if let Err(e) = state.db.save_player(&player).await {
        warn!("Failed to save new player {}: {}", name, e);
    }
    info!("Created player {} ({})", name, id);

    Ok(Json(PlayerView::from(&player)))
}

async fn get_player(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> ApiResult<PlayerView> {
    let world = state.world.lock().await;
    world
        .players
        .get(&player_id)
        .map(|p| Json(PlayerView::from(p)))
        .ok_or_else(|| player_not_found(&player_id))
}

async fn get_station(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> ApiResult<StationView> {
    let mut world = state.world.lock().await;
    let items = world.system.items().clone();
    let observed = world.system.is_observed(&station_id);
    let station = world
        .system
        .station_mut(&station_id)
        .ok_or_else(|| station_not_found(&station_id))?;
    station.poll();
    Ok(Json(StationView::new(station, &items, observed)))
}

/// Every recipe with whether the given player could start it here right now
async fn station_recipes(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Vec<RecipeAvailability>> {
    let mut world = state.world.lock().await;
    let world = &mut *world;
    let player = world
        .players
        .get(&query.player_id)
        .ok_or_else(|| player_not_found(&query.player_id))?;

    let items = world.system.items().clone();
    let station = world
        .system
        .station_mut(&station_id)
        .ok_or_else(|| station_not_found(&station_id))?;
    station.poll();

    Ok(Json(
        station
            .availability(player)
            .into_iter()
            .map(|(recipe, check)| RecipeAvailability::new(recipe, check, &items))
            .collect(),
    ))
}

async fn open_station(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> ApiResult<StationView> {
    let mut world = state.world.lock().await;
    let items = world.system.items().clone();
    let station = world
        .system
        .open(&station_id)
        .ok_or_else(|| station_not_found(&station_id))?;
    station.poll();
    Ok(Json(StationView::new(station, &items, true)))
}

async fn close_station(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> ApiResult<StationView> {
    let mut world = state.world.lock().await;
    if world.system.station(&station_id).is_none() {
        return Err(station_not_found(&station_id));
    }
    world.system.close(&station_id);
    let observed = world.system.is_observed(&station_id);
    world
        .system
        .station(&station_id)
        .map(|station| Json(StationView::new(station, world.system.items(), observed)))
        .ok_or_else(|| station_not_found(&station_id))
}

async fn start_craft(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
    Json(req): Json<CraftRequest>,
) -> ApiResult<StationView> {
    let mut world = state.world.lock().await;
    let world = &mut *world;
    let player = world
        .players
        .get_mut(&req.player_id)
        .ok_or_else(|| player_not_found(&req.player_id))?;

    let items = world.system.items().clone();
    let observed = world.system.is_observed(&station_id);
    let station = world
        .system
        .station_mut(&station_id)
        .ok_or_else(|| station_not_found(&station_id))?;
    station.poll();
    station.start_craft(&req.recipe_id, player).map_err(craft_error)?;
    info!("{} started {} at {}", player.name, req.recipe_id, station_id);

    Ok(Json(StationView::new(station, &items, observed)))
}

async fn cancel_craft(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<StationView> {
    let mut world = state.world.lock().await;
    let world = &mut *world;
    let player = world
        .players
        .get_mut(&req.player_id)
        .ok_or_else(|| player_not_found(&req.player_id))?;

    let items = world.system.items().clone();
    let observed = world.system.is_observed(&station_id);
    let station = world
        .system
        .station_mut(&station_id)
        .ok_or_else(|| station_not_found(&station_id))?;
    station.poll();
    station.cancel(player).map_err(craft_error)?;
    info!("{} cancelled the craft at {}", player.name, station_id);

    Ok(Json(StationView::new(station, &items, observed)))
}

async fn claim_output(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> ApiResult<ClaimResponse> {
    let mut world = state.world.lock().await;
    let world = &mut *world;
    let player = world
        .players
        .get_mut(&req.player_id)
        .ok_or_else(|| player_not_found(&req.player_id))?;

    let items = world.system.items().clone();
    let observed = world.system.is_observed(&station_id);
    let station = world
        .system
        .station_mut(&station_id)
        .ok_or_else(|| station_not_found(&station_id))?;
    station.poll();
    let claimed = station.claim_output(player);
    debug!("{} claimed {} from {}", player.name, claimed, station_id);

    Ok(Json(ClaimResponse {
        claimed,
        station: StationView::new(station, &items, observed),
        player: PlayerView::from(&*player),
    }))
}

// ============================================================================
// WebSocket Handler
// ============================================================================

async fn events_handler(
    ws: WebSocketUpgrade,
    Path(station_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if state.world.lock().await.system.station(&station_id).is_none() {
        return station_not_found(&station_id).into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, station_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, station_id: String) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before opening so nothing fired by the first poll is missed
    let mut events = state.events.subscribe();

    let initial = {
        let mut world = state.world.lock().await;
        let world = &mut *world;
        let items = world.system.items().clone();
        // Stations are never removed, so this only fails for a bad upgrade
        let Some(station) = world.system.open(&station_id) else {
            return;
        };
        station.poll();
        StationView::new(station, &items, true)
    };
    info!("Viewer attached to station {}", station_id);

    if let Ok(json) = serde_json::to_string(&initial) {
        if sender.send(Message::Text(json)).await.is_err() {
            close_viewer(&state, &station_id).await;
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.station_id() == station_id => {
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Viewer of {} lagged, skipped {} events", station_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    close_viewer(&state, &station_id).await;
    info!("Viewer detached from station {}", station_id);
}

async fn close_viewer(state: &AppState, station_id: &str) {
    state.world.lock().await.system.close(station_id);
}

// ============================================================================
// Saving
// ============================================================================

async fn save_all(state: &AppState) {
    let (snapshot, players) = {
        let mut world = state.world.lock().await;
        world.system.poll_all();
        (
            world.system.capture(),
            world.players.values().cloned().collect::<Vec<_>>(),
        )
    };

    if let Err(e) = state.db.save_all(&snapshot, &players).await {
        error!("Failed to save world: {}", e);
        return;
    }

    info!(
        "Saved {} station(s) and {} player(s) to database",
        snapshot.stations.len(),
        players.len()
    );
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down, saving world");
    save_all(&state).await;
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crafting_server=info".parse().unwrap()),
        )
        .init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}, using defaults", e);
            ServerConfig::default()
        }
    };

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return;
        }
    };

    // Spawn crafting tick loop
    let tick_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_state.config.tick_interval());
        let mut last = Instant::now();
        loop {
            interval.tick().await;
            let now = Instant::now();
            tick_state.world.lock().await.system.tick(now - last);
            last = now;
        }
    });

    // Spawn auto-save loop
    let save_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(save_state.config.autosave_interval());
        // The first tick fires immediately; nothing has changed yet
        interval.tick().await;
        loop {
            interval.tick().await;
            save_all(&save_state).await;
        }
    });

    let addr = state.config.bind_addr;

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Catalogs
        .route("/api/recipes", get(list_recipes))
        .route("/api/items", get(list_items))
        // Players
        .route("/api/players", post(create_player))
        .route("/api/players/:id", get(get_player))
        // Stations
        .route("/api/stations/:id", get(get_station))
        .route("/api/stations/:id/recipes", get(station_recipes))
        .route("/api/stations/:id/open", post(open_station))
        .route("/api/stations/:id/close", post(close_station))
        .route("/api/stations/:id/craft", post(start_craft))
        .route("/api/stations/:id/cancel", post(cancel_craft))
        .route("/api/stations/:id/claim", post(claim_output))
        .route("/api/stations/:id/events", get(events_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state.clone());

    info!("Crafting server listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(state))
        .await
    {
        error!("Server error: {}", e);
    }
}
