mod file_io;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use shared::packet::{Operation, Protocol};
use shared::socket::Endpoint;
use shared::{session, TransferError};

/// Reliable file-transfer client: uploads to and downloads from an
/// `ftp-server` over UDP.
#[derive(Parser, Debug)]
#[command(name = "ftp-client", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a local file to the server.
    Upload {
        file: PathBuf,
        /// Server address to connect to.
        #[arg(long)]
        to: SocketAddr,
        /// Name to store the file under; defaults to the local file's name.
        #[arg(long = "as")]
        remote_name: Option<String>,
        #[arg(long, default_value = "go-back-n")]
        protocol: Protocol,
    },
    /// Fetch a file the server holds.
    Download {
        remote_name: String,
        /// Server address to connect to.
        #[arg(long)]
        from: SocketAddr,
        /// Directory the downloaded file is written into.
        #[arg(long, default_value = ".")]
        into: PathBuf,
        #[arg(long, default_value = "go-back-n")]
        protocol: Protocol,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    shared::logging::init();
    let args = Args::parse();

    let result = match args.command {
        Command::Upload { file, to, remote_name, protocol } => {
            run_upload(file, to, remote_name, protocol).await
        }
        Command::Download { remote_name, from, into, protocol } => {
            run_download(remote_name, from, into, protocol).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "transfer failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_upload(
    file: PathBuf,
    server: SocketAddr,
    remote_name: Option<String>,
    protocol: Protocol,
) -> Result<(), TransferError> {
    let remote_name = remote_name.unwrap_or_else(|| {
        file.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string()
    });
    let (mut source, _) = file_io::FileSource::open(&file).await?;
    let endpoint = Endpoint::bind("0.0.0.0:0".parse::<SocketAddr>().unwrap()).await?;
    let (session_addr, _) =
        session::initiate(&endpoint, server, Operation::Upload, protocol, &remote_name).await?;
    shared::engine::run_sender(&endpoint, session_addr, protocol, &mut source).await?;
    tracing::info!(file = %file.display(), remote_name, "upload complete");
    Ok(())
}

async fn run_download(
    remote_name: String,
    server: SocketAddr,
    into: PathBuf,
    protocol: Protocol,
) -> Result<(), TransferError> {
    let endpoint = Endpoint::bind("0.0.0.0:0".parse::<SocketAddr>().unwrap()).await?;
    let (session_addr, file_size) =
        session::initiate(&endpoint, server, Operation::Download, protocol, &remote_name).await?;
    let dest = into.join(&remote_name);
    let mut sink = file_io::FileSink::create(&dest).await?;
    shared::engine::run_receiver(&endpoint, session_addr, protocol, &mut sink).await?;
    tracing::info!(remote_name, bytes = file_size, dest = %dest.display(), "download complete");
    Ok(())
}
