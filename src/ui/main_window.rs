use crate::api::client::ApiClient;
use crate::app::AppConfig;
use crate::inbox::Inbox;
use crate::storage::Store;
use crate::sync::{in_foreground, SyncLoop};
use crate::ui::chat_view::ChatView;
use crate::ui::sidebar::Sidebar;
use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use gtk4::gio;
use std::cell::RefCell;
use std::rc::Rc;

pub fn show_main_window(app: &Application, config: AppConfig) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Inbox")
        .default_width(960)
        .default_height(640)
        .build();

    let overlay = adw::ToastOverlay::new();

    let sidebar = Rc::new(Sidebar::new());
    let chat = Rc::new(ChatView::new());
    let split = gtk::Paned::builder()
        .orientation(gtk::Orientation::Horizontal)
        .start_child(&sidebar.widget())
        .end_child(&chat.widget())
        .resize_start_child(false)
        .shrink_start_child(false)
        .position(320)
        .build();
    overlay.set_child(Some(&split));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some("Inbox"));
    header.set_title_widget(Some(&title));

    let menu = gio::Menu::new();
    menu.append(Some("Clear all messages"), Some("win.clear-all"));
    let more_btn = gtk::MenuButton::builder()
        .icon_name("view-more-symbolic")
        .tooltip_text("More options")
        .menu_model(&menu)
        .build();
    header.pack_end(&more_btn);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));
    window.present();

    let store = match Store::open_default() {
        Ok(store) => store,
        Err(e) => {
            log::error!("could not open message store: {e}");
            overlay.add_toast(adw::Toast::new(&format!("Could not open message store: {e}")));
            return;
        }
    };

    let inbox = Rc::new(RefCell::new(Inbox::new(store.clone())));
    inbox.borrow_mut().refresh();

    let render: Rc<dyn Fn()> = {
        let inbox = inbox.clone();
        let sidebar = sidebar.clone();
        let chat = chat.clone();
        Rc::new(move || {
            let inbox = inbox.borrow();
            sidebar.render(&inbox.view);
            chat.render(&inbox.view);
        })
    };
    render();

    {
        let inbox = inbox.clone();
        let render = render.clone();
        sidebar.connect_search_changed(move |query| {
            inbox.borrow_mut().view.set_query(&query);
            render();
        });
    }
    {
        let inbox = inbox.clone();
        let render = render.clone();
        sidebar.connect_contact_activated(move |sender| {
            inbox.borrow_mut().view.select(&sender);
            render();
        });
    }
    {
        let inbox = inbox.clone();
        let render = render.clone();
        let overlay = overlay.clone();
        chat.connect_send(move |entry| {
            let res = inbox.borrow_mut().send_reply(&entry.text());
            match res {
                Ok(Some(_)) => {
                    entry.set_text("");
                    render();
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("could not store reply: {e}");
                    overlay.add_toast(adw::Toast::new("Could not save the reply."));
                }
            }
        });
    }
    {
        let inbox = inbox.clone();
        let render = render.clone();
        let overlay = overlay.clone();
        let window = window.clone();
        chat.connect_delete(move || {
            let Some(sender) = inbox.borrow().view.selected().map(str::to_string) else {
                return;
            };
            let inbox = inbox.clone();
            let render = render.clone();
            let overlay = overlay.clone();
            let body = format!("All messages with {sender} will be removed from this device.");
            crate::ui::confirm(&window, "Delete conversation?", &body, "Delete", move || {
                let res = inbox.borrow_mut().delete_conversation(&sender);
                if let Err(e) = res {
                    log::warn!("could not delete conversation: {e}");
                    overlay.add_toast(adw::Toast::new("Could not delete the conversation."));
                }
                render();
            });
        });
    }
    {
        let clear_action = gio::SimpleAction::new("clear-all", None);
        let inbox = inbox.clone();
        let render = render.clone();
        let overlay = overlay.clone();
        let window_for_dialog = window.clone();
        clear_action.connect_activate(move |_, _| {
            let inbox = inbox.clone();
            let render = render.clone();
            let overlay = overlay.clone();
            crate::ui::confirm(
                &window_for_dialog,
                "Clear all messages?",
                "Every stored conversation will be removed from this device.",
                "Clear",
                move || {
                    let res = inbox.borrow_mut().clear_all();
                    if let Err(e) = res {
                        log::warn!("could not clear messages: {e}");
                        overlay.add_toast(adw::Toast::new("Could not clear messages."));
                    }
                    render();
                },
            );
        });
        window.add_action(&clear_action);
    }

    let client = match ApiClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("sync disabled: {e}");
            sidebar.set_status(&format!("Sync disabled: {e}"));
            return;
        }
    };
    let sync = SyncLoop::new(client, store);

    let tick: Rc<dyn Fn() -> glib::ControlFlow> = {
        let window = window.downgrade();
        let inbox = inbox.clone();
        let sidebar = sidebar.clone();
        Rc::new(move || {
            let Some(window) = window.upgrade() else {
                return glib::ControlFlow::Break;
            };
            let foreground = in_foreground(window.is_visible(), window.is_suspended());
            let Some(cycle) = sync.begin(foreground) else {
                return glib::ControlFlow::Continue;
            };
            let inbox = inbox.clone();
            let sidebar = sidebar.clone();
            let render = render.clone();
            crate::utils::run_async_to_main(cycle, move |res| match res {
                Ok(outcome) => {
                    if outcome.changed() {
                        inbox.borrow_mut().refresh();
                        render();
                    }
                    sidebar.set_status(&format!("Synced {}", chrono::Local::now().format("%H:%M:%S")));
                }
                Err(e) => sidebar.set_status(&format!("Sync failed: {e}")),
            });
            glib::ControlFlow::Continue
        })
    };
    tick();
    glib::timeout_add_seconds_local(config.poll_interval(), move || tick());
}
