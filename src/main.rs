use log::{error, info};

use study_groups::integration::{self, db};
use study_groups::state::AppState;

fn main() -> integration::Result<()> {
    let config = integration::Config::env()?;
    integration::init_logger()?;

    let pool = db::init(&config.pg)?;
    db::bootstrap(&pool)?;

    let state = AppState::new(pool);

    match state.group_service.find_all() {
        Ok(groups) => info!(
            "started in {:?} env with {} stored group(s)",
            config.env,
            groups.len()
        ),
        Err(e) => error!("could not load groups: {e}"),
    }

    Ok(())
}
