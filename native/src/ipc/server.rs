// IPC server over a Unix socket with a length-prefixed JSON protocol.

use super::protocol::{RadioRequest, RadioRequestType, RadioResponse, RadioResponseType};
use log::{debug, error, info, warn};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Turns one decoded request into its response.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: RadioRequest) -> impl Future<Output = RadioResponse> + Send;
}

type Receivers = (
    mpsc::UnboundedReceiver<RadioResponse>,
    mpsc::UnboundedReceiver<()>,
);

/// Serves one client at a time. Notifications queued while no client is
/// connected are dropped.
pub struct IpcServer {
    socket_path: PathBuf,
    notification_tx: mpsc::UnboundedSender<RadioResponse>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    receivers: Mutex<Option<Receivers>>,
}

enum ClientExit {
    Disconnected,
    Shutdown,
}

impl IpcServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        Self {
            socket_path: socket_path.into(),
            notification_tx,
            shutdown_tx,
            receivers: Mutex::new(Some((notification_rx, shutdown_rx))),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sender usable from any thread to push unsolicited notifications.
    pub fn notifier(&self) -> mpsc::UnboundedSender<RadioResponse> {
        self.notification_tx.clone()
    }

    pub fn queue_notification(&self, notification: RadioResponse) {
        let _ = self.notification_tx.send(notification);
    }

    /// Ask the serve loop to notify the client and return.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the socket, replacing a stale one left by a previous run.
    /// Must be called from within a tokio runtime.
    pub fn bind(&self) -> io::Result<UnixListener> {
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => debug!("[IPC] Removed stale socket {:?}", self.socket_path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        info!("[IPC] Listening on {:?}", self.socket_path);
        Ok(listener)
    }

    /// Accept clients until shutdown is requested, either through
    /// [`IpcServer::request_shutdown`] or a `Shutdown` request.
    pub async fn serve<H: RequestHandler>(
        &self,
        listener: UnixListener,
        handler: Arc<H>,
    ) -> io::Result<()> {
        let (mut notifications, mut shutdown) = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| io::Error::other("IPC server is already serving"))?;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted?;
                    info!("[IPC] Client connected");
                    match handle_client(stream, &handler, &mut notifications, &mut shutdown).await {
                        Ok(ClientExit::Disconnected) => info!("[IPC] Client disconnected"),
                        Ok(ClientExit::Shutdown) => break,
                        Err(e) => warn!("[IPC] Client session ended: {}", e),
                    }
                }

                Some(dropped) = notifications.recv() => {
                    debug!("[IPC] No client connected, dropping {:?}", dropped.response);
                }

                _ = shutdown.recv() => break,
            }
        }

        info!("[IPC] Server stopped");
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            debug!("[IPC] Could not remove socket: {}", e);
        }
        Ok(())
    }
}

async fn handle_client<H: RequestHandler>(
    stream: UnixStream,
    handler: &Arc<H>,
    notifications: &mut mpsc::UnboundedReceiver<RadioResponse>,
    shutdown: &mut mpsc::UnboundedReceiver<()>,
) -> io::Result<ClientExit> {
    let (mut reader, mut writer) = stream.into_split();

    // Frames are read on their own task so a notification never interrupts
    // a partially read request.
    let (frame_tx, mut frame_rx) = mpsc::channel::<io::Result<Vec<u8>>>(8);
    let read_task = tokio::spawn(async move {
        loop {
            let frame = read_frame(&mut reader).await;
            let failed = frame.is_err();
            if frame_tx.send(frame).await.is_err() || failed {
                break;
            }
        }
    });

    // Requests that may wait on the engine run here; the loop keeps serving
    // other requests and the shutdown signal meanwhile.
    let mut waiting: JoinSet<RadioResponse> = JoinSet::new();

    let exit = loop {
        tokio::select! {
            frame = frame_rx.recv() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        break Ok(ClientExit::Disconnected);
                    }
                    Some(Err(e)) => break Err(e),
                    None => break Ok(ClientExit::Disconnected),
                };

                let request = match RadioRequest::from_bytes(&frame) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!("[IPC] Malformed request: {}", e);
                        let reply = RadioResponse::notification(RadioResponseType::Error {
                            message: format!("Malformed request: {}", e),
                        });
                        if let Err(e) = write_frame(&mut writer, &reply).await {
                            break Err(e);
                        }
                        continue;
                    }
                };

                debug!("[IPC] Request: {:?}", request);
                if request.request.may_wait() {
                    let handler = Arc::clone(handler);
                    waiting.spawn(async move { handler.handle(request).await });
                    continue;
                }

                let closing = matches!(request.request, RadioRequestType::Shutdown);
                let response = handler.handle(request).await;
                if let Err(e) = write_frame(&mut writer, &response).await {
                    error!("[IPC] Write error: {}", e);
                    break Err(e);
                }
                if closing {
                    info!("[IPC] Shutdown requested by client");
                    break Ok(ClientExit::Shutdown);
                }
            }

            Some(finished) = waiting.join_next(), if !waiting.is_empty() => {
                let response = match finished {
                    Ok(response) => response,
                    Err(e) => {
                        error!("[IPC] Request task failed: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write_frame(&mut writer, &response).await {
                    error!("[IPC] Write error: {}", e);
                    break Err(e);
                }
            }

            Some(notification) = notifications.recv() => {
                if let Err(e) = write_frame(&mut writer, &notification).await {
                    error!("[IPC] Notification write error: {}", e);
                    break Err(e);
                }
            }

            _ = shutdown.recv() => {
                info!("[IPC] Shutdown signal received, notifying client");
                let notice = RadioResponse::notification(RadioResponseType::Shutdown);
                if let Err(e) = write_frame(&mut writer, &notice).await {
                    warn!("[IPC] Failed to send Shutdown notification: {}", e);
                }
                break Ok(ClientExit::Shutdown);
            }
        }
    };

    read_task.abort();
    waiting.abort_all();
    exit
}

/// Read one length-prefixed frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &RadioResponse,
) -> io::Result<()> {
    let payload = msg.to_bytes().map_err(io::Error::other)?;
    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    debug!("[IPC] Sent {} bytes", payload.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    struct Echo;

    impl RequestHandler for Echo {
        async fn handle(&self, request: RadioRequest) -> RadioResponse {
            let response = match request.request {
                RadioRequestType::SendMessage { text } => RadioResponseType::Message { text },
                _ => RadioResponseType::Success,
            };
            RadioResponse::response(request.message_id, response)
        }
    }

    async fn send(stream: &mut UnixStream, request: &RadioRequest) {
        let payload = request.to_bytes().unwrap();
        stream
            .write_all(&(payload.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(&payload).await.unwrap();
    }

    async fn recv(stream: &mut UnixStream) -> RadioResponse {
        RadioResponse::from_bytes(&read_frame(stream).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn serves_requests_and_notifications_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let server = IpcServer::new(dir.path().join("control.sock"));
        let listener = server.bind().unwrap();
        let notifier = server.notifier();

        let client = async {
            let mut stream = UnixStream::connect(server.socket_path()).await.unwrap();

            send(
                &mut stream,
                &RadioRequest::request(
                    1,
                    RadioRequestType::SendMessage {
                        text: "hi".to_string(),
                    },
                ),
            )
            .await;
            let reply = recv(&mut stream).await;
            assert_eq!(reply.message_id, Some(1));
            assert_eq!(
                reply.response,
                RadioResponseType::Message {
                    text: "hi".to_string()
                }
            );

            notifier
                .send(RadioResponse::notification(RadioResponseType::Error {
                    message: "boom".to_string(),
                }))
                .unwrap();
            let notice = recv(&mut stream).await;
            assert_eq!(notice.message_id, None);
            assert_eq!(
                notice.response,
                RadioResponseType::Error {
                    message: "boom".to_string()
                }
            );

            send(&mut stream, &RadioRequest::request(2, RadioRequestType::Shutdown)).await;
            assert_eq!(recv(&mut stream).await.response, RadioResponseType::Success);
        };

        let (served, _) = tokio::join!(server.serve(listener, Arc::new(Echo)), client);
        served.unwrap();
        assert!(!dir.path().join("control.sock").exists());
    }

    /// Holds `ReceiveMessage` until a `Stop` arrives, like a receive waiting
    /// on an engine that never writes.
    struct GatedReceive {
        stopped: Notify,
    }

    impl RequestHandler for GatedReceive {
        async fn handle(&self, request: RadioRequest) -> RadioResponse {
            let response = match request.request {
                RadioRequestType::ReceiveMessage => {
                    self.stopped.notified().await;
                    RadioResponseType::Error {
                        message: "Channel unavailable".to_string(),
                    }
                }
                RadioRequestType::Stop => {
                    self.stopped.notify_one();
                    RadioResponseType::Success
                }
                _ => RadioResponseType::Success,
            };
            RadioResponse::response(request.message_id, response)
        }
    }

    #[tokio::test]
    async fn pending_receive_does_not_block_stop_or_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let server = IpcServer::new(dir.path().join("control.sock"));
        let listener = server.bind().unwrap();
        let handler = Arc::new(GatedReceive {
            stopped: Notify::new(),
        });

        let client = async {
            let mut stream = UnixStream::connect(server.socket_path()).await.unwrap();

            send(&mut stream, &RadioRequest::request(1, RadioRequestType::ReceiveMessage)).await;
            send(&mut stream, &RadioRequest::request(2, RadioRequestType::Stop)).await;

            let first = timeout(Duration::from_secs(5), recv(&mut stream)).await.unwrap();
            let second = timeout(Duration::from_secs(5), recv(&mut stream)).await.unwrap();
            let mut ids = vec![first.message_id, second.message_id];
            ids.sort();
            assert_eq!(ids, vec![Some(1), Some(2)]);

            // A receive that never completes must not hold back shutdown.
            send(&mut stream, &RadioRequest::request(3, RadioRequestType::ReceiveMessage)).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            server.request_shutdown();
            let notice = timeout(Duration::from_secs(5), recv(&mut stream)).await.unwrap();
            assert_eq!(notice.message_id, None);
            assert_eq!(notice.response, RadioResponseType::Shutdown);
        };

        let (served, _) = tokio::join!(
            timeout(Duration::from_secs(10), server.serve(listener, handler)),
            client
        );
        served.unwrap().unwrap();
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let mut input: &[u8] = &((MAX_MESSAGE_SIZE as u32 + 1).to_le_bytes());
        let err = read_frame(&mut input).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
