//! Request driver
//!
//! Reads one JSON request from stdin and writes one JSON response to stdout.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use remotefile::{
    init_logging, RemoteFileClient, RemoteFileDataSource, RemoteFileError, RemoteFileModel,
    RemoteFileResource,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Lookup,
}

#[derive(Debug, Deserialize)]
struct Request {
    action: Action,
    #[serde(default)]
    model: RemoteFileModel,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Response {
    /// `null` after delete, or after read when the file is gone
    Model(Option<RemoteFileModel>),
    Error(RemoteFileError),
}

async fn dispatch(
    request: Request,
    client: RemoteFileClient,
) -> Result<Option<RemoteFileModel>, RemoteFileError> {
    let resource = RemoteFileResource::new(client.clone());

    match request.action {
        Action::Create => resource.create(request.model).await.map(Some),
        Action::Update => resource.update(request.model).await.map(Some),
        Action::Read => resource.read(request.model).await,
        Action::Delete => resource.delete(&request.model).await.map(|_| None),
        Action::Import => {
            let id = request
                .id
                .ok_or_else(|| RemoteFileError::config("invalid import id", "id is required"))?;
            RemoteFileResource::import(&id).map(Some)
        }
        Action::Lookup => RemoteFileDataSource::new(client)
            .read(request.model)
            .await
            .map(Some),
    }
}

async fn run() -> Result<Option<RemoteFileModel>, RemoteFileError> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| RemoteFileError::io("stdin read failed", "-", e))?;

    let request: Request = serde_json::from_str(&input)
        .map_err(|e| RemoteFileError::config("invalid request", e))?;
    info!("Handling {:?} for {:?}", request.action, request.model);

    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        info!("Interrupted, cancelling");
    };

    dispatch_until(request, RemoteFileClient::new(), interrupt).await
}

/// Run `request`, cancelling it when `interrupt` resolves.
///
/// The interrupt only fires the token; dispatch still runs to completion so an
/// open session gets closed.
async fn dispatch_until<I>(
    request: Request,
    client: RemoteFileClient,
    interrupt: I,
) -> Result<Option<RemoteFileModel>, RemoteFileError>
where
    I: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let client = client.with_cancellation(token.clone());

    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            interrupt.await;
            token.cancel();
        })
    };

    let result = dispatch(request, client).await;
    watcher.abort();
    result
}

#[tokio::main]
async fn main() {
    init_logging();

    let (response, code) = match run().await {
        Ok(model) => (Response::Model(model), 0),
        Err(e) => {
            error!("Request failed: {}", e);
            (Response::Error(e), 1)
        }
    };

    if let Err(e) = write_response(&mut tokio::io::stdout(), &response).await {
        error!("Failed to write response: {}", e);
        std::process::exit(2);
    }
    std::process::exit(code);
}

/// Write `response` as one JSON line and flush it
async fn write_response<W>(out: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await
}
