use clap::Parser;
use proxy_tunnel::client::{Args, ProxyConnector, TcpConnector};
use proxy_tunnel::CancellationToken;
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Setup tracing subscriber for logs (stdout 는 터널 데이터용)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args = Args::parse();

    info!("Starting HTTP CONNECT tunnel client");
    info!(
        "Proxy: {}, Destination: {}, Connection timeout: {}s",
        args.proxy, args.destination, args.connection_timeout
    );

    let headers = match args.header_map() {
        Ok(headers) => headers,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let connector = match ProxyConnector::with_headers(
        &args.proxy,
        TcpConnector::with_timeout(args.connection_timeout),
        headers,
    ) {
        Ok(connector) => connector,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-C 로 연결 시도를 취소
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT, shutting down...");
            trigger.cancel();
        }
    });

    let tunnel = match connector
        .connect_with_cancel(&args.destination, &cancel)
        .await
    {
        Ok(tunnel) => tunnel,
        Err(e) => {
            error!("{} (errno {})", e, e.errno());
            return ExitCode::FAILURE;
        }
    };

    info!("Tunnel to {} ready, relaying stdin/stdout", args.destination);

    let (mut reader, mut writer) = tokio::io::split(tunnel);
    let upload = async {
        let mut stdin = tokio::io::stdin();
        let n = tokio::io::copy(&mut stdin, &mut writer).await?;
        writer.shutdown().await?;
        Ok::<u64, std::io::Error>(n)
    };
    let download = async {
        let mut stdout = tokio::io::stdout();
        let n = tokio::io::copy(&mut reader, &mut stdout).await?;
        stdout.flush().await?;
        Ok::<u64, std::io::Error>(n)
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => Ok(()),
        res = async { tokio::try_join!(upload, download) } => res.map(|(sent, received)| {
            info!("Transferred {} bytes up, {} bytes down", sent, received);
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Relay error: {}", e);
            ExitCode::FAILURE
        }
    }
}
