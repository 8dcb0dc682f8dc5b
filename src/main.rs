use std::io::Write as _;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    strapi_preview::logging::init().context("init logging")?;

    let cli = strapi_preview::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = strapi_preview::config::Config::from_env().context("load config")?;

    match cli.command {
        strapi_preview::cli::Command::Serve(args) => {
            strapi_preview::server::serve(args.addr, config)
                .await
                .context("serve")?;
        }
        strapi_preview::cli::Command::Render(args) => {
            let page = strapi_preview::pages::run(&args, &config)
                .await
                .context("render")?;
            if let strapi_preview::pages::Page::NotFound(_) = page {
                tracing::warn!(page = ?args.page, slug = ?args.slug, "entry not found");
            }
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(page.html().as_bytes())
                .context("write page to stdout")?;
        }
    }

    Ok(())
}
