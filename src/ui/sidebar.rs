use crate::view::{LoadState, ViewState};
use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Sidebar {
    root: gtk::Box,
    search: gtk::SearchEntry,
    list: gtk::ListBox,
    placeholder: gtk::Label,
    status: gtk::Label,
    // Sender of each row, by row index.
    senders: Rc<RefCell<Vec<String>>>,
}

impl Sidebar {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(300);

        let search = gtk::SearchEntry::new();
        search.set_placeholder_text(Some("Search contacts…"));
        root.append(&search);

        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::Single);
        list.add_css_class("navigation-sidebar");
        let placeholder = gtk::Label::new(Some("Loading…"));
        placeholder.add_css_class("dim-label");
        placeholder.set_margin_top(16);
        list.set_placeholder(Some(&placeholder));

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .child(&list)
            .build();
        root.append(&scroller);

        let status = gtk::Label::new(None);
        status.add_css_class("dim-label");
        status.add_css_class("caption");
        status.set_halign(gtk::Align::Start);
        root.append(&status);

        Self {
            root,
            search,
            list,
            placeholder,
            status,
            senders: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_status(&self, text: &str) {
        self.status.set_label(text);
    }

    pub fn connect_search_changed<F: Fn(String) + 'static>(&self, f: F) {
        self.search.connect_search_changed(move |entry| f(entry.text().to_string()));
    }

    pub fn connect_contact_activated<F: Fn(String) + 'static>(&self, f: F) {
        let senders = self.senders.clone();
        self.list.connect_row_activated(move |_, row| {
            let sender = usize::try_from(row.index())
                .ok()
                .and_then(|idx| senders.borrow().get(idx).cloned());
            if let Some(sender) = sender {
                f(sender);
            }
        });
    }

    pub fn render(&self, view: &ViewState) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        self.placeholder.set_label(match view.load_state() {
            LoadState::Loading => "Loading…",
            LoadState::Empty => "No messages yet",
            LoadState::Ready => "No matching contacts",
        });

        let now = chrono::Utc::now();
        let contacts = view.filtered_contacts();
        let mut senders = self.senders.borrow_mut();
        senders.clear();
        for contact in contacts {
            let row = gtk::ListBoxRow::new();
            let body = gtk::Box::new(gtk::Orientation::Horizontal, 8);
            body.set_margin_top(8);
            body.set_margin_bottom(8);
            body.set_margin_start(8);
            body.set_margin_end(8);

            let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
            text.set_hexpand(true);
            let name = gtk::Label::new(Some(&contact.name));
            name.add_css_class("heading");
            name.set_halign(gtk::Align::Start);
            let preview = gtk::Label::new(Some(&contact.last_message));
            preview.add_css_class("dim-label");
            preview.set_halign(gtk::Align::Start);
            preview.set_ellipsize(gtk::pango::EllipsizeMode::End);
            preview.set_max_width_chars(28);
            text.append(&name);
            text.append(&preview);

            let when = gtk::Label::new(Some(&crate::utils::relative_time(&contact.last_time, now)));
            when.add_css_class("caption");
            when.set_valign(gtk::Align::Start);

            body.append(&text);
            body.append(&when);
            row.set_child(Some(&body));
            self.list.append(&row);

            if view.selected() == Some(contact.sender.as_str()) {
                self.list.select_row(Some(&row));
            }
            senders.push(contact.sender.clone());
        }
    }
}
