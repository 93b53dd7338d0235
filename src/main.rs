use std::process;

use clap::Parser;
use konggate::cmd::App;
use log::error;

#[tokio::main]
async fn main() {
    let app = App::parse();
    match app.run().await {
        Ok(()) => {}
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
