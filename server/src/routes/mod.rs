use minesweeper_common::models::{
    BoardView, CellView, ClickRequest, CreateGameRequest, ErrorResponse,
};
use rocket::{
    Catcher, Request, Responder, Route, State, catch, catchers, delete,
    futures::StreamExt,
    get,
    http::{Header, Status},
    post,
    response::status,
    routes,
    serde::json::Json,
};
use rocket_ws::{Channel, Message, WebSocket};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::AuthenticatedUser,
    data::{BoardId, CellId},
    error::{ApiError, ValidationError},
    events::EventHub,
    logic::GameService,
    rate_limit::{ClientIp, RateLimiter},
};

pub fn routes() -> Vec<Route> {
    routes![
        create_game,
        get_game,
        active_games,
        delete_game,
        game_cells,
        reveal_cell,
        click,
        game_events,
    ]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, default_catcher]
}

#[post("/game", data = "<input>")]
#[instrument(level = "trace", skip_all, fields(client_ip = %client_ip.0, user = %user.0))]
pub async fn create_game(
    input: Json<CreateGameRequest>,
    service: &State<GameService>,
    hub: &State<EventHub>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
    user: AuthenticatedUser,
) -> Result<status::Created<Json<BoardView>>, ApiError> {
    info!(
        "Game creation request from {}: '{}' with {} mines",
        client_ip.0, input.name, input.mines_count
    );

    // rejected requests do not spend the client's quota
    service.validate_new_board(&input.name, input.mines_count)?;

    if !rate_limiter.check(client_ip.0) {
        warn!("Rate limit exceeded for client {}", client_ip.0);
        return Err(ApiError::RateLimited);
    }

    let outcome = service
        .create_board(&input.name, input.mines_count)
        .await?;
    hub.dispatch(&outcome.events).await;

    let board = outcome.value;
    info!("Successfully created game {} for client {}", board.id, client_ip.0);
    Ok(status::Created::new(format!("/game/{}", board.id)).body(Json(board)))
}

#[get("/game/active")]
#[instrument(level = "trace", skip_all)]
pub async fn active_games(
    service: &State<GameService>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<BoardView>>, ApiError> {
    Ok(Json(service.list_active_boards().await?))
}

#[get("/game/<id>")]
#[instrument(level = "trace", skip(service, _user))]
pub async fn get_game(
    id: BoardId,
    service: &State<GameService>,
    _user: AuthenticatedUser,
) -> Result<Json<BoardView>, ApiError> {
    Ok(Json(service.get_board(id).await?))
}

#[delete("/game/<id>")]
#[instrument(level = "trace", skip(service, hub, _user))]
pub async fn delete_game(
    id: BoardId,
    service: &State<GameService>,
    hub: &State<EventHub>,
    _user: AuthenticatedUser,
) -> Result<Status, ApiError> {
    let outcome = service.delete_board(id).await?;
    hub.dispatch(&outcome.events).await;
    Ok(Status::Ok)
}

#[get("/game/<id>/cells")]
#[instrument(level = "trace", skip(service, _user))]
pub async fn game_cells(
    id: BoardId,
    service: &State<GameService>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<CellView>>, ApiError> {
    Ok(Json(service.list_cells(id).await?))
}

#[post("/game/<id>/reveal/<cell_id>")]
#[instrument(level = "trace", skip(service, hub, _user))]
pub async fn reveal_cell(
    id: BoardId,
    cell_id: CellId,
    service: &State<GameService>,
    hub: &State<EventHub>,
    _user: AuthenticatedUser,
) -> Result<Json<CellView>, ApiError> {
    let outcome = service.reveal_cell_by_id(id, cell_id).await?;
    hub.dispatch(&outcome.events).await;
    Ok(Json(outcome.value))
}

#[post("/game/<id>/click", data = "<input>")]
#[instrument(level = "trace", skip(service, hub, input, _user), fields(x = input.x, y = input.y))]
pub async fn click(
    id: BoardId,
    input: Json<ClickRequest>,
    service: &State<GameService>,
    hub: &State<EventHub>,
    _user: AuthenticatedUser,
) -> Result<Json<CellView>, ApiError> {
    debug!("Click in game {} at ({}, {})", id, input.x, input.y);

    if input.game_id != id {
        warn!(
            "Game id in path ({}) and body ({}) do not match",
            id, input.game_id
        );
        return Err(ValidationError::GameIdMismatch {
            path: id,
            body: input.game_id,
        }
        .into());
    }

    let outcome = service
        .reveal_cell_by_coordinates(id, input.x, input.y)
        .await?;
    hub.dispatch(&outcome.events).await;
    Ok(Json(outcome.value))
}

#[get("/game/<id>/events")]
#[instrument(level = "trace", skip(ws, service, hub, _user))]
pub async fn game_events(
    ws: WebSocket,
    id: BoardId,
    service: &State<GameService>,
    hub: &State<EventHub>,
    _user: AuthenticatedUser,
) -> Result<Channel<'static>, ApiError> {
    service.get_board(id).await?;
    info!("WebSocket connection established for game {}", id);

    let hub = hub.inner().clone();
    Ok(ws.channel(move |stream| {
        Box::pin(async move {
            let (write, mut read) = stream.split();
            let stream_id = hub.subscribe(id, write).await;

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Close(_)) => {
                        info!(
                            "WebSocket connection closed for game {} (stream: {})",
                            id, stream_id
                        );
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Ok(_) => {
                        debug!("Ignoring client message in game {}", id);
                    }
                    Err(e) => {
                        error!(
                            "WebSocket error in game {} (stream: {}): {}",
                            id, stream_id, e
                        );
                        break;
                    }
                }
            }

            hub.unsubscribe(id, &stream_id).await;
            Ok(())
        })
    }))
}

#[derive(Responder)]
#[response(status = 401)]
pub struct Unauthorized {
    body: Json<ErrorResponse>,
    challenge: Header<'static>,
}

#[catch(401)]
pub fn unauthorized() -> Unauthorized {
    Unauthorized {
        body: Json(ErrorResponse {
            error: "authentication required".to_string(),
        }),
        challenge: Header::new("WWW-Authenticate", r#"Basic realm="minesweeper""#),
    }
}

#[catch(default)]
pub fn default_catcher(code: Status, req: &Request<'_>) -> status::Custom<Json<ErrorResponse>> {
    debug!("{} {} answered with {}", req.method(), req.uri(), code);
    let error = code.reason().unwrap_or("request failed").to_lowercase();
    status::Custom(code, Json(ErrorResponse { error }))
}
