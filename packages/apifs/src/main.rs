use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use apifs_api::ReqwestClient;
use apifs_filesystem::ApiFs;

mod fuse;

/// Mount HTTP APIs as a filesystem.
///
/// Directories encode URLs; read `clone` in a directory to allocate a
/// connection, write a request specification to `<id>.ctl`, then read the
/// response from `<id>.body`.
#[derive(Parser, Debug)]
#[command(name = "apifs")]
#[command(version, about, long_about = None)]
struct Args {
    /// Mount point for the filesystem.
    #[arg(long)]
    mountpoint: PathBuf,
}

fn main() {
    env_logger::init();

    // A missing --mountpoint makes clap exit with status 2.
    let args = Args::parse();

    let client = match ReqwestClient::with_default_timeout() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let fs = ApiFs::new(Arc::new(client));

    if let Err(e) = fuse::mount(fs, &args.mountpoint) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
