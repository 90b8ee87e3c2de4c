pub mod aggregate;
pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contrast;
pub mod datastore;
pub mod datetime;
pub mod filter;
pub mod format;
pub mod icon;
pub mod profile;
pub mod render;
pub mod schedule;
pub mod task;
pub mod trend;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tempo CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.temporc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let now = Utc::now();
  let owner = cfg.user();
  let store =
    datastore::DataStore::open(
      &data_dir, &owner, now
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg)?;
  let command = match cli.command {
    | Some(command) => command,
    | None => {
      let name = cfg
        .get("default.command")
        .unwrap_or_else(|| {
          "tasks".to_string()
        });
      debug!(command = %name, "no explicit command, using default");
      cli::Command::from_default_name(
        &name
      )?
    }
  };

  commands::dispatch(
    &store, &cfg, &renderer, command,
    now
  )?;

  info!("done");
  Ok(())
}
