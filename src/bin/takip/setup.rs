use std::cell::LazyCell;
use std::path::PathBuf;
use std::sync::Arc;

use snafu::{prelude::*, Whatever};
use takip::adapter::config::{self, Configuration};
use takip::adapter::probe::ReachabilityProbe;
use takip::adapter::repository::{FileStore, FolderRemote, SystemClock};
use takip::client::app::Intervals;
use takip::client::Client;
use takip::domain::tracker::{NetworkSignal, Tracker};
use takip::utils::xdg::{AppDirs, XdgError};

use crate::cli::Arguments;

const APP_NAME: &str = "takip";

pub fn bootstrap(args: &Arguments) -> Result<Client, Whatever> {
    let dirs = LazyCell::new(|| AppDirs::new(APP_NAME));

    let configuration = match &args.config {
        Some(path) => config::load_with_path(path),
        None => config::load_with_xdg(app_dirs(&dirs)?),
    }
    .whatever_context("Could not load configuration")?;

    let data = match &configuration.storage.data {
        Some(data) => data.clone(),
        None => app_dirs(&dirs)?.state_dir(),
    };
    let remote_root = match &configuration.remote.root {
        Some(root) => root.clone(),
        None => app_dirs(&dirs)?
            .remote_dir()
            .whatever_context("Could not prepare the default remote folder")?,
    };
    tracing::debug!(data = %data.display(), remote = %remote_root.display(), "Resolved storage");

    Ok(wire(&configuration, data, remote_root))
}

fn app_dirs<F>(dirs: &LazyCell<Result<AppDirs, XdgError>, F>) -> Result<&AppDirs, Whatever>
where
    F: FnOnce() -> Result<AppDirs, XdgError>,
{
    LazyCell::force(dirs)
        .as_ref()
        .map_err(XdgError::clone)
        .whatever_context("Could not use XDG base directories")
}

fn wire(configuration: &Configuration, data: PathBuf, remote_root: PathBuf) -> Client {
    let store = Arc::new(FileStore::new(data));
    let remote = Arc::new(FolderRemote::new(remote_root));
    let network = NetworkSignal::new(false);
    let tracker = Tracker::new(
        configuration.user.id.clone(),
        store,
        Arc::clone(&remote) as _,
        network.clone(),
        Arc::new(SystemClock),
    );
    let probe = ReachabilityProbe::new(remote, network);

    let intervals = Intervals {
        frame: configuration.timer.frame(),
        break_tick: configuration.timer.break_tick(),
        probe: configuration.sync.probe_interval(),
    };
    Client::new(Arc::new(tracker), probe, intervals)
}
