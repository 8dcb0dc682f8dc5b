use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::strapi::ContentStatus;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the rendered site and the preview endpoints.
    Serve(ServeArgs),
    /// Render a single page to stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageKind {
    Index,
    Article,
    About,
    Category,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Content type to render.
    #[arg(value_enum)]
    pub page: PageKind,

    /// Entry slug (required for `article` and `category`).
    #[arg(long)]
    pub slug: Option<String>,

    /// Explicit content status (overrides `--draft`).
    #[arg(long, value_enum)]
    pub status: Option<ContentStatus>,

    /// Locale code forwarded to the CMS.
    #[arg(long)]
    pub locale: Option<String>,

    /// Render as if preview mode were enabled.
    #[arg(long)]
    pub draft: bool,
}
