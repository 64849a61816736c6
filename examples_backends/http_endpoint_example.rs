use tracing::{error, info, warn};
use loghub_shipper::context::LogContext;
use loghub_shipper::init::init_tracing_from_env;

/// Ships events to the endpoint in `LOGHUB_ENDPOINT`, e.g.
///
/// ```text
/// LOGHUB_ENDPOINT=http://localhost:8080/api/logs \
/// LOGHUB_API_KEY=dev-key \
/// LOGHUB_APPLICATION=orders \
/// cargo run --example http_endpoint
/// ```
#[tokio::main]
async fn main() {
    let pipeline = match init_tracing_from_env() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    {
        let _scope = LogContext::scoped([("traceId", "4bf92f3577b34da6"), ("tenant", "acme")]);
        info!(order_id = "ORD-1", "order received");
        warn!(attempt = 2, "payment provider slow, retrying");
        error!(card = "4111-1111-1111-1111", "payment declined for john.doe@example.com");
    }

    pipeline.shutdown().await;
    println!("{:?}", pipeline.stats());
}
