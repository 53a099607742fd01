//! Sniffer runtime
//!
//! Two tasks joined by the frame queue:
//! - reader: `FrameReader` over the byte source, pushes `RawFrame`s
//! - processor: `Correlator` (or the hex dump), writes to the output sink
//!
//! Cancelling the token stops both. When the reader stops on its own
//! (end of stream or I/O error) the queue closes and the processor exits
//! after draining it.

use rtu_sniff::{
    classify, ClassifierMode, Correlator, FrameKind, FrameReader, Outcome, RawFrame, SnifferStats,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::SnifferConfig;
use crate::error::{Result, ServiceError};
use crate::queue::{frame_queue, FrameReceiver, FrameSender};

/// What the processor does with each frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Correlate and print the target register value
    #[default]
    Sniff,
    /// Print every frame as hex, no filtering or decoding
    Dump,
}

/// Open the configured serial port and sniff until cancelled or the port fails
pub async fn run(config: SnifferConfig, mode: RunMode, token: CancellationToken) -> Result<()> {
    let port = crate::transport::open_serial(&config)?;
    run_with_source(port, &config, mode, tokio::io::stdout(), token).await
}

/// Run the pipeline over any byte source and output sink
pub async fn run_with_source<R, W>(
    source: R,
    config: &SnifferConfig,
    mode: RunMode,
    mut out: W,
    token: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let reader = FrameReader::new(source, config.frame_gap());
    info!(
        "Sniffing {} at {} baud, frame gap {} µs, target register {}, {:?} classifier",
        config.port,
        config.baud_rate,
        reader.silence().as_micros(),
        config.target_register,
        config.classifier
    );

    let (tx, mut rx) = frame_queue(&config.queue);
    let reader_handle = spawn_reader(reader, tx, token.clone());

    let processed = match mode {
        RunMode::Sniff => {
            let correlator = Correlator::new(config.target_register).with_mode(config.classifier);
            run_processor(&mut rx, correlator, &mut out, &token)
                .await
                .map(|stats| log_stats(&stats, rx.dropped()))
        },
        RunMode::Dump => run_dump(&mut rx, config.classifier, &mut out, &token)
            .await
            .map(|frames| info!("Dumped {} frames ({} dropped by queue)", frames, rx.dropped())),
    };

    // Unblocks a reader waiting on a full queue if the processor failed
    drop(rx);
    token.cancel();

    let read = reader_handle
        .await
        .map_err(|e| ServiceError::Io(std::io::Error::other(e)))?;

    processed?;
    read.map(|frames| debug!("Reader stopped after {} frames", frames))
}

/// Spawn the reader task
///
/// Returns the number of frames read.
pub fn spawn_reader<R>(
    mut reader: FrameReader<R>,
    tx: FrameSender,
    token: CancellationToken,
) -> JoinHandle<Result<u64>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut frames = 0u64;

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("Reader task received cancellation signal, shutting down");
                    break;
                }
                next = reader.next_frame() => match next {
                    Ok(Some(frame)) => {
                        frames += 1;
                        trace!(length = frame.len(), "Frame assembled: [{}]", frame);
                        if tx.send(frame).await.is_err() {
                            debug!("Frame queue closed, reader stopping");
                            break;
                        }
                    },
                    Ok(None) => {
                        info!("Byte source closed");
                        break;
                    },
                    Err(e) => {
                        error!("Serial read failed: {}", e);
                        return Err(ServiceError::Io(e));
                    },
                },
            }
        }

        Ok(frames)
    })
}

/// Correlate frames and write each emitted value on its own line
pub async fn run_processor<W>(
    rx: &mut FrameReceiver,
    mut correlator: Correlator,
    out: &mut W,
    token: &CancellationToken,
) -> Result<SnifferStats>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            () = token.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        match correlator.process(&frame) {
            Outcome::Emitted(register) => {
                out.write_all(format!("{}\n", register).as_bytes()).await?;
                out.flush().await?;
            },
            Outcome::Pending(_) | Outcome::OutOfRange { .. } | Outcome::Dropped(_) => {},
        }
    }

    Ok(correlator.stats())
}

/// Write every frame as a hex dump line; returns the number of frames
pub async fn run_dump<W>(
    rx: &mut FrameReceiver,
    mode: ClassifierMode,
    out: &mut W,
    token: &CancellationToken,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut frames = 0u64;

    loop {
        let frame = tokio::select! {
            () = token.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        frames += 1;
        let line = format_dump_line(&frame, classify(&frame, mode));
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }

    Ok(frames)
}

/// One monitor line:
/// `type = Request    slave id = 01     fcode = 03     CRC = 95 cb    data = 00-01-00-02`
pub fn format_dump_line(frame: &RawFrame, kind: FrameKind) -> String {
    let byte = |b: Option<u8>| b.map(|b| hex::encode([b])).unwrap_or_default();
    let join = |data: &[u8], sep: &str| {
        data.iter()
            .map(|b| hex::encode([*b]))
            .collect::<Vec<_>>()
            .join(sep)
    };

    format!(
        "type = {:<8}   slave id = {}     fcode = {}     CRC = {}    data = {}",
        kind,
        byte(frame.slave_id()),
        byte(frame.function_code()),
        join(frame.crc_bytes(), " "),
        join(frame.data(), "-"),
    )
}

fn log_stats(stats: &SnifferStats, queue_dropped: u64) {
    info!(
        "Frames: {} total, {} too short, {} CRC failures; requests: {} ({} malformed); responses: {} ({} exceptions, {} without request, {} mismatched, {} undecodable)",
        stats.frames,
        stats.short_frames,
        stats.crc_failures,
        stats.requests,
        stats.malformed_requests,
        stats.responses,
        stats.exceptions,
        stats.orphan_responses,
        stats.mismatched_responses,
        stats.decode_failures
    );
    info!(
        "Values emitted: {}; frames dropped by queue: {}",
        stats.emitted, queue_dropped
    );
}
