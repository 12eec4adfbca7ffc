#[tokio::main]
async fn main() {
    if let Err(error) = crm_desk_lib::run().await {
        eprintln!("{}", crm_desk_lib::errors::to_client_error(error));
        std::process::exit(1);
    }
}
