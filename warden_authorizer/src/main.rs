use clap::Parser;
use color_eyre::eyre::WrapErr;
use tokio::io::BufReader;
use warden_authorizer::{Authorizer, Cli, LogContext, PolicyEngine, PolicyStrategy};

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let log = LogContext::new(cli.service_name.as_str(), &cli.log_level);

    let strategy = match &cli.policy_file {
        Some(path) => {
            let raw = std::fs::read(path)
                .wrap_err_with(|| format!("unable to read policy file {}", path.display()))?;
            serde_json::from_slice::<PolicyStrategy>(&raw)
                .wrap_err_with(|| format!("invalid policy file {}", path.display()))?
        }
        None => PolicyStrategy::default(),
    };

    let authorizer =
        Authorizer::from_config(cli.authorizer_config())?.with_engine(PolicyEngine::new(strategy));

    let stdin = BufReader::new(tokio::io::stdin());
    authorizer.serve(&log, stdin, tokio::io::stdout()).await?;

    Ok(())
}
