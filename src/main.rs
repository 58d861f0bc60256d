mod api;
mod app;
mod error;
mod inbox;
mod storage;
mod sync;
mod ui;
mod utils;
mod view;

use adw::prelude::*;
use adw::Application;

fn main() -> glib::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Application::builder()
        .application_id("com.example.InboxGtk")
        .build();
    app.connect_activate(|app| {
        crate::app::build_ui(app);
    });
    app.run()
}
