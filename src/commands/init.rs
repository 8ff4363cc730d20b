use crate::output::UserOutput;
use turbine::{FarmOutcome, FarmState, ProjectManager};

pub fn run_init_farm(manager: &ProjectManager, force: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let farm = manager.farm();
    let settings = manager.settings();

    let outcome = if force && farm.state() == FarmState::Present {
        if !out.confirm("Delete the farm scaffold and rebuild it?", false) {
            return Err(turbine::Error::Aborted.into());
        }
        let reset = out.confirm(
            "Also reset the project registry? Existing projects will no longer be tracked.",
            false,
        );
        farm.recreate(reset)?
    } else {
        out.status("Preparing farm...");
        farm.ensure()?
    };

    let farm_dir = manager.workspace().farm_dir();
    match outcome {
        FarmOutcome::Created => out.success(&format!(
            "Farm created at {} on network {} ({}.0.0/16)",
            farm_dir.display(),
            settings.network.name,
            settings.network.subnet_prefix
        )),
        FarmOutcome::Updated => out.success(&format!("Farm files refreshed in {}", farm_dir.display())),
    }
    out.status(&format!("Start it with: {}/start.sh", farm_dir.display()));
    Ok(())
}
