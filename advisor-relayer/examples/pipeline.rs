use advisor_relayer::config::{Config, ProfileInput};
use advisor_relayer::service::RelayerService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = Config::sample();
    cfg.profiles.push(ProfileInput::new("retiree", 40_000, 900_000, 20, 2));

    let report = RelayerService::new(&cfg)?.run().await?;
    for profile in &report.profiles {
        if let Some(result) = profile.result {
            println!(
                "[advisor-relayer] {} -> product={} score={}",
                profile.label, result.product_id, result.match_score
            );
        }
    }
    println!(
        "[advisor-relayer] applied={} rejected={} oracle fulfilled={}",
        report.callbacks_applied, report.callbacks_rejected, report.worker.fulfilled
    );
    Ok(())
}
