#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    resource_api_lib::run().await
}
