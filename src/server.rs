//! Modbus TCP listener serving a memory map
//!
//! One task per client. Requests of a client are handled in order. Register
//! handlers may block on configuration locks, so each request runs on the
//! blocking thread pool.

use anyhow::{ensure, Context, Result};
use rmodbus::ModbusProto;
use std::{io, net::SocketAddr, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
};

use blackbox_protocol::{process_frame, MemoryMap};

const MBAP_HEADER_LEN: usize = 7;
/// Unit id plus the largest PDU
const MAX_MBAP_LENGTH: usize = 254;

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind Modbus TCP listener to {addr}"))?;
    log::info!("Modbus TCP listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept clients until `shutdown` fires or its sender is dropped
pub async fn serve(
    listener: TcpListener,
    memory_map: Arc<MemoryMap>,
    unit_id: u8,
    shutdown: flume::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted.context("Failed to accept Modbus client")?;
                log::info!("Modbus client {peer} connected");
                let memory_map = memory_map.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_client(stream, memory_map, unit_id).await {
                        log::warn!("Modbus client {peer}: {err:#}");
                    }
                    log::info!("Modbus client {peer} disconnected");
                });
            }
            _ = shutdown.recv_async() => {
                log::info!("Modbus TCP listener shutting down");
                return Ok(());
            }
        }
    }
}

/// Serve MBAP-framed requests until the peer closes the connection
pub async fn handle_client<S>(
    mut stream: S,
    memory_map: Arc<MemoryMap>,
    unit_id: u8,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; MBAP_HEADER_LEN];
    loop {
        match stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let length = usize::from(u16::from_be_bytes([header[4], header[5]]));
        ensure!(
            (2..=MAX_MBAP_LENGTH).contains(&length),
            "invalid MBAP length {length}"
        );
        let mut frame = header.to_vec();
        frame.resize(MBAP_HEADER_LEN - 1 + length, 0);
        stream.read_exact(&mut frame[MBAP_HEADER_LEN..]).await?;

        let map = memory_map.clone();
        let (frame, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = process_frame(&map, unit_id, ModbusProto::TcpUdp, &frame);
            (frame, outcome)
        })
        .await
        .context("Modbus request handler panicked")?;

        match outcome {
            Ok(Some(response)) => stream.write_all(&response).await?,
            Ok(None) => {}
            Err(err) => log::warn!("Dropping Modbus request {frame:02x?}: {err:#}"),
        }
    }
}
