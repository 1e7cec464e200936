mod dispatcher;
mod file_io;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Reliable file-transfer server: accepts UPLOAD/DOWNLOAD sessions over UDP.
#[derive(Parser, Debug)]
#[command(name = "ftp-server", version)]
struct Args {
    /// Address to listen on for incoming SYNs.
    #[arg(long, default_value = "0.0.0.0:9999")]
    bind: SocketAddr,

    /// Directory files are uploaded into and downloaded from.
    #[arg(long, default_value = "./storage")]
    storage_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    shared::logging::init();
    let args = Args::parse();

    match dispatcher::run(args.bind, args.storage_dir).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited");
            ExitCode::FAILURE
        }
    }
}
