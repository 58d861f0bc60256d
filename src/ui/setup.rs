use crate::app::AppConfig;
use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use std::rc::Rc;

pub fn show_setup_window(app: &Application) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Inbox Setup")
        .default_width(460)
        .default_height(300)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Connect to a webhook"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let defaults = AppConfig::load();

    let endpoint_entry = gtk::Entry::new();
    endpoint_entry.set_placeholder_text(Some("Endpoint URL (e.g. https://hook.example.com/api/webhook?logs=true)"));
    endpoint_entry.set_text(&defaults.endpoint_url);
    endpoint_entry.set_hexpand(true);

    let field_entry = gtk::Entry::new();
    field_entry.set_placeholder_text(Some("Response field holding the messages"));
    field_entry.set_text(&defaults.messages_field);

    let interval_row = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    let interval_label = gtk::Label::new(Some("Poll every (seconds)"));
    interval_label.set_hexpand(true);
    interval_label.set_halign(gtk::Align::Start);
    let interval_spin = gtk::SpinButton::with_range(1.0, 3600.0, 1.0);
    interval_spin.set_value(f64::from(defaults.poll_interval()));
    interval_row.append(&interval_label);
    interval_row.append(&interval_spin);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&endpoint_entry);
    form.append(&field_entry);
    form.append(&interval_row);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let connect_btn = gtk::Button::with_label("Connect");
    connect_btn.add_css_class("suggested-action");
    connect_btn.set_halign(gtk::Align::End);
    root.append(&connect_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    header.set_title_widget(Some(&gtk::Label::new(Some("Inbox"))));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let endpoint_entry = endpoint_entry.clone();
        let field_entry = field_entry.clone();
        let interval_spin = interval_spin.clone();
        move || {
            let url = crate::utils::normalize_url(&endpoint_entry.text());
            if url.is_empty() || url::Url::parse(&url).is_err() {
                overlay.add_toast(adw::Toast::new("Please enter a valid endpoint URL."));
                return;
            }
            let field = field_entry.text().trim().to_string();
            let config = AppConfig {
                endpoint_url: url,
                messages_field: if field.is_empty() { defaults.messages_field.clone() } else { field },
                poll_interval_secs: interval_spin.value_as_int().max(1) as u32,
                ..defaults.clone()
            };
            let client = match crate::api::client::ApiClient::new(&config) {
                Ok(client) => client,
                Err(e) => {
                    overlay.add_toast(adw::Toast::new(&format!("Invalid endpoint: {e}")));
                    return;
                }
            };

            status.set_label("Checking endpoint…");

            let status_label = status.clone();
            let app = app.clone();
            let window = window.clone();
            let overlay = overlay.clone();
            crate::utils::run_async_to_main(async move { client.ping().await }, move |res| {
                let message = match res {
                    Ok(code) if (200..300).contains(&code) => "Connected".to_string(),
                    Ok(code) => format!("Saved (endpoint answered HTTP {code})"),
                    Err(e) => {
                        log::warn!("endpoint check failed: {e}");
                        "Saved (endpoint unreachable)".to_string()
                    }
                };
                log::info!("endpoint check for {}: {message}", config.endpoint_url);
                status_label.set_label(&message);
                // Save regardless; the sync loop tolerates an endpoint that's down.
                if let Err(e) = config.save() {
                    overlay.add_toast(adw::Toast::new(&format!("Failed to save settings: {}", e)));
                }
                crate::ui::main_window::show_main_window(&app, config);
                window.close();
            });
        }
    };

    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        connect_btn.connect_clicked(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        endpoint_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        field_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}
