mod create;
mod delete;
mod init;
mod lifecycle;
mod list;

pub use create::{run_create_project, CreateArgs};
pub use delete::{run_delete_all, run_delete_farm, run_delete_project};
pub use init::run_init_farm;
pub use lifecycle::{run_start_project, run_stop_project};
pub use list::run_list_projects;
