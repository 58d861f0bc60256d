pub mod chat_view;
pub mod main_window;
pub mod setup;
pub mod sidebar;

use adw::prelude::*;
use gtk4 as gtk;

/// Destructive confirmation; `on_confirm` runs only when the operator agrees.
pub fn confirm<F: Fn() + 'static>(
    parent: &impl IsA<gtk::Window>,
    heading: &str,
    body: &str,
    action_label: &str,
    on_confirm: F,
) {
    let dialog = adw::MessageDialog::new(Some(parent), Some(heading), Some(body));
    dialog.add_responses(&[("cancel", "Cancel"), ("confirm", action_label)]);
    dialog.set_response_appearance("confirm", adw::ResponseAppearance::Destructive);
    dialog.set_default_response(Some("cancel"));
    dialog.set_close_response("cancel");
    dialog.connect_response(None, move |_, response| {
        if response == "confirm" {
            on_confirm();
        }
    });
    dialog.present();
}
